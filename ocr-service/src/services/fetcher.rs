//! Downloads the document named by `fileUrl`.
//!
//! One GET per request, no retries, nothing cached. The body is streamed so
//! an oversized document is rejected without being buffered in full.

use super::describe_reqwest_error;
use axum::body::Bytes;
use futures::StreamExt;
use reqwest::{header, Client, Url};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The host answered with a non-2xx status.
    #[error("Failed to download PDF from fileUrl")]
    DownloadFailed { status: u16 },

    #[error("PDF exceeds maximum size of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Invalid fileUrl: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch fileUrl: {0}")]
    Transport(String),
}

/// Downloaded file content, alive only for the duration of one request.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub content: Bytes,
    pub content_type: Option<String>,
}

impl RemoteDocument {
    pub fn looks_like_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("application/pdf"))
            .unwrap_or(false)
            || self.content.starts_with(b"%PDF-")
    }
}

#[derive(Clone)]
pub struct DocumentFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl DocumentFetcher {
    pub fn new(client: Client, timeout: Duration, max_bytes: u64) -> Self {
        Self {
            client,
            timeout,
            max_bytes,
        }
    }

    pub async fn fetch(&self, file_url: &str) -> Result<RemoteDocument, FetchError> {
        let url = parse_url(file_url)?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Transport(describe_reqwest_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = %status, "Document host returned non-success status");
            return Err(FetchError::DownloadFailed {
                status: status.as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut content = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Transport(describe_reqwest_error(&e)))?;
            if (content.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            content.extend_from_slice(&chunk);
        }

        Ok(RemoteDocument {
            content: Bytes::from(content),
            content_type,
        })
    }
}

/// Scheme, host and path of `file_url`, without credentials or query string.
pub fn loggable_url(file_url: &str) -> String {
    match Url::parse(file_url) {
        Ok(url) => format!(
            "{}://{}{}",
            url.scheme(),
            url.host_str().unwrap_or_default(),
            url.path()
        ),
        Err(_) => "<unparseable>".to_string(),
    }
}

fn parse_url(file_url: &str) -> Result<Url, FetchError> {
    let url = Url::parse(file_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_are_invalid() {
        let err = parse_url("/docs/report.pdf").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn only_http_schemes_are_fetched() {
        let err = parse_url("file:///etc/passwd").unwrap_err();
        assert_eq!(err.to_string(), "Invalid fileUrl: unsupported scheme 'file'");
        assert!(parse_url("https://example.com/doc.pdf").is_ok());
    }

    #[test]
    fn logged_urls_drop_query_and_userinfo() {
        assert_eq!(
            loggable_url("https://user:pw@bucket.s3.amazonaws.com/docs/a.pdf?X-Amz-Signature=abc"),
            "https://bucket.s3.amazonaws.com/docs/a.pdf"
        );
        assert_eq!(loggable_url("doc.pdf"), "<unparseable>");
    }

    #[test]
    fn pdf_detection_uses_type_or_magic_bytes() {
        let by_type = RemoteDocument {
            content: Bytes::from_static(b"whatever"),
            content_type: Some("application/pdf".to_string()),
        };
        let by_magic = RemoteDocument {
            content: Bytes::from_static(b"%PDF-1.7\n"),
            content_type: Some("application/octet-stream".to_string()),
        };
        let neither = RemoteDocument {
            content: Bytes::from_static(b"<html>"),
            content_type: Some("text/html".to_string()),
        };

        assert!(by_type.looks_like_pdf());
        assert!(by_magic.looks_like_pdf());
        assert!(!neither.looks_like_pdf());
    }
}
