use crate::error::InputError;
use serde::Deserialize;
use validator::Validate;

/// Body of an extraction request.
///
/// Accepts JSON or form-encoded bodies. Anything that cannot be read as an
/// object with a string `fileUrl` behaves as if `fileUrl` were absent.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    #[serde(default)]
    #[validate(required, length(min = 1))]
    pub file_url: Option<String>,
}

impl ExtractionRequest {
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Self {
        let is_form = content_type
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        let parsed: Option<Self> = if is_form {
            serde_urlencoded::from_bytes(body).ok()
        } else {
            serde_json::from_slice(body).ok()
        };

        let mut request = parsed.unwrap_or_default();
        request.file_url = request.file_url.map(|url| url.trim().to_string());
        request
    }

    /// The validated, trimmed `fileUrl`.
    pub fn into_file_url(self) -> Result<String, InputError> {
        self.validate().map_err(|_| InputError::MissingFileUrl)?;
        self.file_url.ok_or(InputError::MissingFileUrl)
    }
}
