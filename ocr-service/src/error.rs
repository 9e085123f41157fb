//! Error taxonomy for the extraction endpoint.
//!
//! Every failure renders as `{ "error": "<message>" }` with the status
//! returned by [`ExtractionError::status`].

use crate::services::fetcher::FetchError;
use crate::services::pdf_services::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Problems with the request itself, reported before any network call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Missing fileUrl")]
    MissingFileUrl,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ExtractionError {
    pub fn status(&self) -> StatusCode {
        match self {
            ExtractionError::Input(InputError::MethodNotAllowed) => StatusCode::METHOD_NOT_ALLOWED,
            ExtractionError::Input(InputError::MissingFileUrl) => StatusCode::BAD_REQUEST,
            ExtractionError::Fetch(FetchError::DownloadFailed { .. })
            | ExtractionError::Fetch(FetchError::TooLarge { .. }) => StatusCode::BAD_REQUEST,
            ExtractionError::Fetch(_) | ExtractionError::Service(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Metric label for the stage that failed.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::Input(_) => "input_error",
            ExtractionError::Fetch(_) => "fetch_error",
            ExtractionError::Service(_) => "service_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
