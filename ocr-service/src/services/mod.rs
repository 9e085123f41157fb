pub mod fetcher;
pub mod metrics;
pub mod pdf_services;

pub use fetcher::{DocumentFetcher, RemoteDocument};
pub use metrics::{get_metrics, init_metrics};
pub use pdf_services::{AdobePdfServices, ExtractionService};

/// Render a reqwest error together with its source chain; the top-level
/// message alone rarely says what went wrong.
pub(crate) fn describe_reqwest_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}
