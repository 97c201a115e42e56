//! HTTP server with axum router and graceful shutdown.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::error::ServerError;
use super::handlers::{get_status, get_stream, post_start, post_stop, AppState};
use crate::config::ServerConfig;
use crate::scan::ScanRegistry;

/// HTTP front end for a [`ScanRegistry`].
pub struct ScanServer {
    /// Server configuration.
    config: ServerConfig,
    /// Application state shared across handlers.
    state: AppState,
    /// Triggers graceful shutdown.
    cancel: CancellationToken,
}

impl ScanServer {
    /// Create a new server with default configuration.
    #[must_use]
    pub fn new(registry: Arc<ScanRegistry>) -> Self {
        Self {
            config: ServerConfig::default(),
            state: AppState::new(registry),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Token that shuts the server down when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/start", post(post_start))
            .route("/stream/:scan_id", get(get_stream))
            .route("/stop/:scan_id", post(post_stop))
            .route("/status/:scan_id", get(get_status))
            .with_state(self.state.clone());

        if let Some(dir) = &self.config.static_dir {
            router = router.fallback_service(ServeDir::new(dir));
        }

        let router = router.layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Bind to the configured address and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::BindError {
                address: addr.clone(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// Also runs the session reaper when a session TTL is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = self.build_router();
        let cancel = self.cancel.clone();
        let reaper = self.state.registry.spawn_reaper(cancel.child_token());

        match listener.local_addr() {
            Ok(addr) => tracing::info!(address = %addr, "Starting scan server"),
            Err(_) => tracing::info!("Starting scan server"),
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Scan server shutting down gracefully");
            })
            .await?;

        if let Some(reaper) = reaper {
            reaper.abort();
        }
        Ok(())
    }
}
