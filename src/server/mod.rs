// Studio Server Module
// HTTP front end: one streaming endpoint per pipeline

mod handlers;
mod stream;

pub use handlers::{
    analyze_fix, analyze_optimize, analyze_security, health_check, root, ApiError, FixRequest,
    OptimizeRequest, SecurityRequest,
};
pub use stream::{stream_run, NDJSON_CONTENT_TYPE};

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::benchmark::ExecutionComparator;
use crate::config::Config;
use crate::providers::LlmProvider;

/// Shared state behind every handler
pub struct AppState {
    pub config: Config,
    /// None until an API key is configured; analysis requests are refused meanwhile
    pub provider: Option<Arc<dyn LlmProvider>>,
    pub comparator: ExecutionComparator,
}

impl AppState {
    /// State with the Python comparator from `config`
    pub fn new(config: Config, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        let comparator = ExecutionComparator::python(&config.benchmark);
        Self {
            config,
            provider,
            comparator,
        }
    }

    pub fn with_comparator(
        config: Config,
        provider: Arc<dyn LlmProvider>,
        comparator: ExecutionComparator,
    ) -> Self {
        Self {
            config,
            provider: Some(provider),
            comparator,
        }
    }
}

/// Build the application router, CORS and body limit included
pub fn create_router(state: Arc<AppState>) -> axum::Router {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.server.max_body_bytes;

    axum::Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analyze/fix", post(analyze_fix))
        .route("/analyze/security", post(analyze_security))
        .route("/analyze/optimize", post(analyze_optimize))
        .with_state(state)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(cors)
}

pub struct StudioServer {
    state: Arc<AppState>,
}

impl StudioServer {
    pub fn new(config: Config, provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            state: Arc::new(AppState::new(config, provider)),
        }
    }

    /// Bind and serve until the process is stopped
    pub async fn serve(self) -> Result<()> {
        let addr: SocketAddr = self
            .state
            .config
            .server
            .bind_address
            .parse()
            .with_context(|| {
                format!("Invalid bind address: {}", self.state.config.server.bind_address)
            })?;

        let app = create_router(Arc::clone(&self.state)).layer(TraceLayer::new_for_http());

        tracing::info!("Starting Agentic Code Studio server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}
