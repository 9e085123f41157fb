//! Document extraction service abstraction.
//!
//! The extraction vendor is consumed as a black box: credentials are
//! exchanged for a token, the document is uploaded as an asset, a job is
//! submitted against that asset and its final output is awaited. Job
//! lifecycle, retries and polling cadence are the implementation's concern.

pub mod adobe;

pub use adobe::AdobePdfServices;

use crate::config::PdfServicesConfig;
use async_trait::async_trait;
use axum::body::Bytes;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Error type for extraction service operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("PDF Services client ID and client secret are required")]
    MissingCredentials,

    #[error("Credential exchange failed: {0}")]
    Credentials(String),

    #[error("Asset upload failed: {0}")]
    Upload(String),

    #[error("Job submission failed: {0}")]
    Submit(String),

    #[error("Extraction job failed: {0}")]
    JobFailed(String),

    #[error("Extraction job did not complete within {0:?}")]
    Timeout(Duration),

    #[error("Extraction job cancelled: service is shutting down")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response from PDF Services: {0}")]
    Protocol(String),
}

/// Client identifier and secret for the extraction service.
///
/// Built fresh for every request from the process configuration.
#[derive(Debug, Clone)]
pub struct ServiceCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl ServiceCredentials {
    pub fn from_config(config: &PdfServicesConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.expose_secret().trim().is_empty()
    }
}

/// Short-lived authorization produced from [`ServiceCredentials`].
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub api_key: String,
    pub bearer: Secret<String>,
}

/// Opaque reference to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
}

/// Opaque reference to a submitted job, used to poll for its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub status_url: String,
}

/// Final output of a completed job, relayed to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JobResult(pub serde_json::Value);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractElementType {
    Text,
    Tables,
}

/// Parameters of an extract job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractPdfParams {
    pub elements_to_extract: Vec<ExtractElementType>,
}

impl ExtractPdfParams {
    /// Plain-text extraction only.
    pub fn text() -> Self {
        Self {
            elements_to_extract: vec![ExtractElementType::Text],
        }
    }
}

/// Trait for document extraction backends (e.g., Adobe PDF Services).
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Exchange credentials for an access token.
    async fn authenticate(
        &self,
        credentials: &ServiceCredentials,
    ) -> Result<AccessToken, ServiceError>;

    /// Upload document content declared as `media_type`.
    async fn upload(
        &self,
        token: &AccessToken,
        content: Bytes,
        media_type: &str,
    ) -> Result<Asset, ServiceError>;

    /// Submit an extract job for a previously uploaded asset.
    async fn submit(
        &self,
        token: &AccessToken,
        asset: &Asset,
        params: &ExtractPdfParams,
    ) -> Result<JobHandle, ServiceError>;

    /// Wait until the job has either completed or failed.
    async fn await_result(
        &self,
        token: &AccessToken,
        job: &JobHandle,
    ) -> Result<JobResult, ServiceError>;

    /// Run the whole credential, upload, submit, await sequence for a PDF.
    async fn extract(
        &self,
        credentials: &ServiceCredentials,
        content: Bytes,
        params: &ExtractPdfParams,
    ) -> Result<JobResult, ServiceError> {
        let token = self.authenticate(credentials).await?;
        let asset = self.upload(&token, content, PDF_MEDIA_TYPE).await?;
        tracing::debug!(asset_id = %asset.id, "Uploaded document asset");

        let job = self.submit(&token, &asset, params).await?;
        tracing::debug!(status_url = %job.status_url, "Submitted extraction job");

        self.await_result(&token, &job).await
    }
}

/// Run [`ExtractionService::extract`] bounded by `deadline` and abandoned as
/// soon as `shutdown` is cancelled.
pub async fn extract_with_deadline(
    service: &dyn ExtractionService,
    credentials: &ServiceCredentials,
    content: Bytes,
    params: &ExtractPdfParams,
    deadline: Duration,
    shutdown: &CancellationToken,
) -> Result<JobResult, ServiceError> {
    tokio::select! {
        _ = shutdown.cancelled() => Err(ServiceError::Cancelled),
        outcome = tokio::time::timeout(deadline, service.extract(credentials, content, params)) => {
            outcome.map_err(|_| ServiceError::Timeout(deadline))?
        }
    }
}
