//! Adobe PDF Services REST client.
//!
//! Implements the token, asset and extract-job endpoints that the official
//! SDKs wrap: `POST /token`, `POST /assets` followed by a `PUT` to the
//! pre-signed upload URI, `POST /operation/extractpdf`, then polling the job
//! status URL returned in the `location` header.

use super::{
    AccessToken, Asset, ExtractPdfParams, ExtractionService, JobHandle, JobResult,
    ServiceCredentials, ServiceError,
};
use crate::services::describe_reqwest_error;
use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::HeaderValue;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Adobe PDF Services client.
#[derive(Clone)]
pub struct AdobePdfServices {
    client: Client,
    api_base_url: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAssetRequest<'a> {
    media_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAssetResponse {
    upload_uri: String,
    #[serde(rename = "assetID")]
    asset_id: String,
}

#[derive(Debug, Serialize)]
struct ExtractJobRequest<'a> {
    #[serde(rename = "assetID")]
    asset_id: &'a str,
    #[serde(flatten)]
    params: &'a ExtractPdfParams,
}

impl AdobePdfServices {
    pub fn new(client: Client, api_base_url: &str, poll_interval: Duration) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            poll_interval,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        request
            .header("X-API-Key", &token.api_key)
            .bearer_auth(token.bearer.expose_secret())
    }

    /// How long to wait before the next status poll.
    fn next_poll_delay(&self, response: &Response) -> Duration {
        retry_after_delay(response.headers().get(header::RETRY_AFTER), self.poll_interval)
    }
}

#[async_trait]
impl ExtractionService for AdobePdfServices {
    async fn authenticate(
        &self,
        credentials: &ServiceCredentials,
    ) -> Result<AccessToken, ServiceError> {
        if !credentials.is_complete() {
            return Err(ServiceError::MissingCredentials);
        }

        let response = self
            .client
            .post(self.url("/token"))
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.expose_secret().as_str()),
            ])
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;
        if !status.is_success() {
            tracing::warn!(status = %status, "PDF Services rejected credentials");
            return Err(ServiceError::Credentials(vendor_message(status, &body)));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::Protocol(format!("invalid token response: {}", e)))?;

        Ok(AccessToken {
            api_key: credentials.client_id.clone(),
            bearer: Secret::new(token.access_token),
        })
    }

    async fn upload(
        &self,
        token: &AccessToken,
        content: Bytes,
        media_type: &str,
    ) -> Result<Asset, ServiceError> {
        let response = self
            .authorized(self.client.post(self.url("/assets")), token)
            .json(&CreateAssetRequest { media_type })
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;
        if !status.is_success() {
            return Err(ServiceError::Upload(vendor_message(status, &body)));
        }

        let created: CreateAssetResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::Protocol(format!("invalid asset response: {}", e)))?;

        let size = content.len();
        let response = self
            .client
            .put(&created.upload_uri)
            .header(header::CONTENT_TYPE, media_type)
            .body(content)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Upload(vendor_message(status, &body)));
        }

        tracing::info!(asset_id = %created.asset_id, bytes = size, "Uploaded asset to PDF Services");

        Ok(Asset {
            id: created.asset_id,
        })
    }

    async fn submit(
        &self,
        token: &AccessToken,
        asset: &Asset,
        params: &ExtractPdfParams,
    ) -> Result<JobHandle, ServiceError> {
        let response = self
            .authorized(self.client.post(self.url("/operation/extractpdf")), token)
            .json(&ExtractJobRequest {
                asset_id: &asset.id,
                params,
            })
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Submit(vendor_message(status, &body)));
        }

        let status_url = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ServiceError::Protocol("job submission response has no location header".into())
            })?;

        Ok(JobHandle { status_url })
    }

    async fn await_result(
        &self,
        token: &AccessToken,
        job: &JobHandle,
    ) -> Result<JobResult, ServiceError> {
        loop {
            let response = self
                .authorized(self.client.get(&job.status_url), token)
                .send()
                .await
                .map_err(network_error)?;

            let status = response.status();
            let delay = self.next_poll_delay(&response);
            let body = response.text().await.map_err(network_error)?;
            if !status.is_success() {
                return Err(ServiceError::JobFailed(vendor_message(status, &body)));
            }

            let body: Value = serde_json::from_str(&body)
                .map_err(|e| ServiceError::Protocol(format!("invalid job status: {}", e)))?;

            let job_status = body
                .get("status")
                .and_then(Value::as_str)
                .ok_or_else(|| ServiceError::Protocol("job status has no status field".into()))?;

            match job_status {
                "done" => return Ok(JobResult(body)),
                "failed" => {
                    let message = error_message(&body)
                        .unwrap_or_else(|| "job reported failure without details".to_string());
                    return Err(ServiceError::JobFailed(message));
                }
                other => {
                    tracing::debug!(status = %other, delay_ms = delay.as_millis() as u64, "Extraction job still running");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// `Retry-After` in seconds, never shorter than the configured interval.
fn retry_after_delay(value: Option<&HeaderValue>, poll_interval: Duration) -> Duration {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .map(|delay| delay.max(poll_interval))
        .unwrap_or(poll_interval)
}

fn network_error(err: reqwest::Error) -> ServiceError {
    ServiceError::Network(describe_reqwest_error(&err))
}

/// Best human-readable message in a PDF Services error body.
///
/// Operation endpoints nest `{ error: { code, message } }`; the token
/// endpoint uses OAuth-style `error` / `error_description`.
fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error");
    error
        .and_then(|e| e.get("message"))
        .or_else(|| body.get("error_description"))
        .or_else(|| body.get("message"))
        .or(error)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn vendor_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| error_message(&value))
        .unwrap_or_else(|| format!("HTTP {}", status))
}
