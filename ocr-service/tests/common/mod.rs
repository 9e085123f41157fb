#![allow(dead_code)]

use ocr_service::config::{ExtractionConfig, OcrConfig, PdfServicesConfig};
use ocr_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_CLIENT_ID: &str = "test-client-id";
pub const TEST_CLIENT_SECRET: &str = "test-client-secret";
pub const TEST_ACCESS_TOKEN: &str = "test-access-token";
pub const TEST_ASSET_ID: &str = "urn:aaid:AS:UE1:test-asset";
pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF\n";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    /// Plays the host that serves `fileUrl`.
    pub document_host: MockServer,
    /// Plays the PDF Services API.
    pub pdf_services: MockServer,
    pub shutdown: CancellationToken,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut OcrConfig)) -> Self {
        let document_host = MockServer::start().await;
        let pdf_services = MockServer::start().await;

        let mut config = OcrConfig {
            common: Config {
                port: 0, // Random port
                ..Config::default()
            },
            pdf_services: PdfServicesConfig {
                client_id: TEST_CLIENT_ID.to_string(),
                client_secret: Secret::new(TEST_CLIENT_SECRET.to_string()),
                api_base_url: pdf_services.uri(),
            },
            extraction: ExtractionConfig {
                job_timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(10),
                download_timeout: Duration::from_secs(5),
                max_document_bytes: 1024 * 1024,
            },
        };
        configure(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let shutdown = app.shutdown_token();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            document_host,
            pdf_services,
            shutdown,
        }
    }

    /// URL on the document host for `path`.
    pub fn file_url(&self, path: &str) -> String {
        format!("{}{}", self.document_host.uri(), path)
    }

    pub async fn post_extract(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/ocr", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Serve `content` as a PDF at `path` on the document host.
    pub async fn serve_document(&self, path_str: &str, content: &[u8]) {
        Mock::given(method("GET"))
            .and(path(path_str))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(content.to_vec()),
            )
            .mount(&self.document_host)
            .await;
    }

    /// Mount token, asset creation, upload and submission endpoints.
    /// The job status endpoint is left to the caller.
    pub async fn mount_job_submission(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(format!("client_id={}", TEST_CLIENT_ID)))
            .and(body_string_contains(format!(
                "client_secret={}",
                TEST_CLIENT_SECRET
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": TEST_ACCESS_TOKEN,
                "token_type": "bearer",
                "expires_in": 86399
            })))
            .expect(1)
            .mount(&self.pdf_services)
            .await;

        Mock::given(method("POST"))
            .and(path("/assets"))
            .and(header("x-api-key", TEST_CLIENT_ID))
            .and(header(
                "authorization",
                format!("Bearer {}", TEST_ACCESS_TOKEN).as_str(),
            ))
            .and(body_partial_json(json!({ "mediaType": "application/pdf" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "uploadUri": format!("{}/upload/test-asset", self.pdf_services.uri()),
                "assetID": TEST_ASSET_ID
            })))
            .expect(1)
            .mount(&self.pdf_services)
            .await;

        Mock::given(method("PUT"))
            .and(path("/upload/test-asset"))
            .and(header("content-type", "application/pdf"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&self.pdf_services)
            .await;

        Mock::given(method("POST"))
            .and(path("/operation/extractpdf"))
            .and(header("x-api-key", TEST_CLIENT_ID))
            .and(body_partial_json(json!({
                "assetID": TEST_ASSET_ID,
                "elementsToExtract": ["text"]
            })))
            .respond_with(ResponseTemplate::new(201).insert_header(
                "location",
                self.job_status_url().as_str(),
            ))
            .expect(1)
            .mount(&self.pdf_services)
            .await;
    }

    pub fn job_status_url(&self) -> String {
        format!(
            "{}/operation/extractpdf/test-job/status",
            self.pdf_services.uri()
        )
    }

    /// Answer every status poll with `body`.
    pub async fn mount_job_status(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path("/operation/extractpdf/test-job/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.pdf_services)
            .await;
    }
}

/// A representative completed extract job status body.
pub fn done_job_body() -> Value {
    json!({
        "status": "done",
        "content": {
            "uploadUri": "https://dcplatformstorageservice-prod-us-east-1.s3.amazonaws.com/content.zip",
            "assetID": "urn:aaid:AS:UE1:content",
            "size": 4321,
            "type": "application/zip"
        },
        "resource": {
            "downloadUri": "https://dcplatformstorageservice-prod-us-east-1.s3.amazonaws.com/resource.zip",
            "assetID": "urn:aaid:AS:UE1:resource",
            "size": 4321,
            "type": "application/zip"
        }
    })
}

pub async fn error_body(response: reqwest::Response) -> Value {
    response.json().await.expect("Failed to parse JSON")
}
