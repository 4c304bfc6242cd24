//! HTTP server for the financial analyst

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Upper bound on the idle-session sweep period
const MAX_SWEEP_INTERVAL_SECS: u64 = 60;

/// Financial analyst HTTP server
pub struct FinAnalystServer {
    config: AppConfig,
    state: AppState,
}

impl FinAnalystServer {
    /// Create a server backed by Gemini
    pub fn new(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_check))
            .nest("/api", routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting fin-analyst server on http://{}", addr);

        let sweeper = tokio::spawn(sweep_idle_sessions(self.state.clone()));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::config(format!("Failed to bind {}: {}", addr, e)))?;

        let served = axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)));
        sweeper.abort();

        served
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Periodically drop sessions that outlived the configured TTL
async fn sweep_idle_sessions(state: AppState) {
    let period = state
        .config()
        .server
        .session_ttl_secs
        .clamp(1, MAX_SWEEP_INTERVAL_SECS);
    let mut interval = tokio::time::interval(Duration::from_secs(period));

    loop {
        interval.tick().await;
        state.evict_idle();
    }
}
