//! Application startup and lifecycle management.

use crate::config::OcrConfig;
use crate::handlers;
use crate::services::{AdobePdfServices, DocumentFetcher, ExtractionService};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared application state. Nothing in it is mutated by requests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<OcrConfig>,
    pub fetcher: DocumentFetcher,
    pub extractor: Arc<dyn ExtractionService>,
    /// Cancelled when the process starts shutting down.
    pub shutdown: CancellationToken,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: OcrConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to create HTTP client: {}", e);
                AppError::InternalError(e.into())
            })?;

        if config.pdf_services.is_configured() {
            tracing::info!(
                endpoint = %config.pdf_services.api_base_url,
                "PDF Services client initialized"
            );
        } else {
            tracing::warn!(
                "PDF Services credentials not configured - extraction requests will fail"
            );
        }

        let extractor: Arc<dyn ExtractionService> = Arc::new(AdobePdfServices::new(
            client.clone(),
            &config.pdf_services.api_base_url,
            config.extraction.poll_interval,
        ));

        let fetcher = DocumentFetcher::new(
            client,
            config.extraction.download_timeout,
            config.extraction.max_document_bytes,
        );

        let shutdown = CancellationToken::new();
        let state = AppState {
            config: Arc::new(config.clone()),
            fetcher,
            extractor,
            shutdown: shutdown.clone(),
        };

        let router = build_router(state);

        // Bind HTTP listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("OCR service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
            shutdown,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Token that stops the server and abandons in-flight extraction jobs.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve until Ctrl+C, SIGTERM or the shutdown token fires.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal(self.shutdown))
            .await
    }
}

pub fn build_router(state: AppState) -> Router {
    let extraction = post(handlers::extract_text).fallback(handlers::method_not_allowed);

    Router::new()
        .route("/", extraction.clone())
        .route("/api/ocr", extraction)
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
