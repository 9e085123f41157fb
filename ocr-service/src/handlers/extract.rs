//! The extraction endpoint: download a PDF, hand it to PDF Services, relay
//! the job result.

use crate::dtos::ExtractionRequest;
use crate::error::{ExtractionError, InputError};
use crate::services::fetcher::loggable_url;
use crate::services::metrics::{record_document_bytes, record_extraction};
use crate::services::pdf_services::{
    extract_with_deadline, ExtractPdfParams, JobResult, ServiceCredentials,
};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};

pub async fn extract_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JobResult>, ExtractionError> {
    let outcome = run(&state, &headers, &body).await;

    match &outcome {
        Ok(_) => record_extraction("success"),
        Err(err) => {
            record_extraction(err.kind());
            if err.status().is_server_error() {
                tracing::error!(error = %err, kind = err.kind(), "Extraction request failed");
            } else {
                tracing::warn!(error = %err, kind = err.kind(), "Extraction request rejected");
            }
        }
    }

    outcome.map(Json)
}

/// Fallback for every non-POST method on the extraction routes.
pub async fn method_not_allowed() -> ExtractionError {
    record_extraction("input_error");
    InputError::MethodNotAllowed.into()
}

async fn run(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<JobResult, ExtractionError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let file_url = ExtractionRequest::from_body(content_type, body).into_file_url()?;

    let document = state.fetcher.fetch(&file_url).await?;
    record_document_bytes(document.content.len());
    if !document.looks_like_pdf() {
        tracing::warn!(
            content_type = ?document.content_type,
            "Downloaded file does not look like a PDF; submitting anyway"
        );
    }
    tracing::info!(
        file_url = %loggable_url(&file_url),
        bytes = document.content.len(),
        "Downloaded document, submitting extraction job"
    );

    let credentials = ServiceCredentials::from_config(&state.config.pdf_services);
    let result = extract_with_deadline(
        state.extractor.as_ref(),
        &credentials,
        document.content,
        &ExtractPdfParams::text(),
        state.config.extraction.job_timeout,
        &state.shutdown,
    )
    .await?;

    tracing::info!(file_url = %loggable_url(&file_url), "Extraction job completed");
    Ok(result)
}
