use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Public PDF Services endpoint (US region).
pub const DEFAULT_PDF_SERVICES_BASE_URL: &str = "https://pdf-services.adobe.io";

/// PDF Services rejects inputs above 100 MiB, so there is no point downloading more.
const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub common: core_config::Config,
    pub pdf_services: PdfServicesConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone)]
pub struct PdfServicesConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub api_base_url: String,
}

impl PdfServicesConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.expose_secret().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Upper bound on credential exchange, upload, submission and the job wait together.
    pub job_timeout: Duration,
    /// Delay between job status polls when the service sends no `retry-after`.
    pub poll_interval: Duration,
    pub download_timeout: Duration,
    pub max_document_bytes: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(1000),
            download_timeout: Duration::from_secs(30),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl OcrConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the service config from `common` plus whatever `lookup` resolves.
    ///
    /// Credentials are optional here; a request made without them fails at
    /// the credential exchange instead of at startup.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_of = |keys: &[&str]| keys.iter().find_map(|&key| lookup(key));
        let defaults = ExtractionConfig::default();

        let mut common = common;
        if common.otlp_endpoint.is_none() {
            common.otlp_endpoint = lookup("OTLP_ENDPOINT");
        }

        Ok(OcrConfig {
            common,
            pdf_services: PdfServicesConfig {
                client_id: first_of(&["PDF_SERVICES_CLIENT_ID", "ADOBE_CLIENT_ID"])
                    .unwrap_or_default(),
                client_secret: Secret::new(
                    first_of(&["PDF_SERVICES_CLIENT_SECRET", "ADOBE_CLIENT_SECRET"])
                        .unwrap_or_default(),
                ),
                api_base_url: lookup("PDF_SERVICES_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_PDF_SERVICES_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            extraction: ExtractionConfig {
                job_timeout: parse_or(&lookup, "EXTRACTION_JOB_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.job_timeout),
                poll_interval: parse_or(&lookup, "EXTRACTION_POLL_INTERVAL_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.poll_interval),
                download_timeout: parse_or(&lookup, "EXTRACTION_DOWNLOAD_TIMEOUT_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.download_timeout),
                max_document_bytes: parse_or(&lookup, "EXTRACTION_MAX_DOCUMENT_BYTES")?
                    .unwrap_or(defaults.max_document_bytes),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<OcrConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OcrConfig::from_lookup(core_config::Config::default(), |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();

        assert!(!config.pdf_services.is_configured());
        assert_eq!(config.pdf_services.api_base_url, DEFAULT_PDF_SERVICES_BASE_URL);
        assert_eq!(config.extraction.job_timeout, Duration::from_secs(120));
        assert_eq!(config.extraction.max_document_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn legacy_adobe_variables_are_accepted() {
        let config = load(&[
            ("ADOBE_CLIENT_ID", "legacy-id"),
            ("ADOBE_CLIENT_SECRET", "legacy-secret"),
        ])
        .unwrap();

        assert!(config.pdf_services.is_configured());
        assert_eq!(config.pdf_services.client_id, "legacy-id");
    }

    #[test]
    fn prefixed_variables_win_over_legacy_ones() {
        let config = load(&[
            ("PDF_SERVICES_CLIENT_ID", "new-id"),
            ("ADOBE_CLIENT_ID", "legacy-id"),
        ])
        .unwrap();

        assert_eq!(config.pdf_services.client_id, "new-id");
        // secret still missing
        assert!(!config.pdf_services.is_configured());
    }

    #[test]
    fn numeric_overrides_are_parsed() {
        let config = load(&[
            ("EXTRACTION_JOB_TIMEOUT_SECS", "5"),
            ("EXTRACTION_POLL_INTERVAL_MS", "250"),
            ("EXTRACTION_MAX_DOCUMENT_BYTES", "2048"),
            ("PDF_SERVICES_API_BASE_URL", "https://pdf-services-ew1.adobe.io/"),
        ])
        .unwrap();

        assert_eq!(config.extraction.job_timeout, Duration::from_secs(5));
        assert_eq!(config.extraction.poll_interval, Duration::from_millis(250));
        assert_eq!(config.extraction.max_document_bytes, 2048);
        assert_eq!(
            config.pdf_services.api_base_url,
            "https://pdf-services-ew1.adobe.io"
        );
    }

    #[test]
    fn malformed_numbers_fail_loading() {
        let err = load(&[("EXTRACTION_JOB_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("EXTRACTION_JOB_TIMEOUT_SECS"));
    }

    #[test]
    fn otlp_endpoint_falls_back_to_plain_variable() {
        let config = load(&[("OTLP_ENDPOINT", "http://tempo:4317")]).unwrap();
        assert_eq!(
            config.common.otlp_endpoint.as_deref(),
            Some("http://tempo:4317")
        );
    }
}
