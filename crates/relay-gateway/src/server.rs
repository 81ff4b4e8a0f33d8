//! Relay HTTP server - Axum router, CORS policy, status endpoint

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use relay_core::{ProviderHandles, ProviderKind};
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chat::chat_handler;

/// Origins a locally served or locally opened front-end sends
pub const ALLOWED_ORIGINS: [&str; 3] = ["http://localhost", "http://127.0.0.1", "null"];

/// Shared, read-only state for every request
#[derive(Clone)]
pub struct RelayState {
    pub providers: Arc<ProviderHandles>,
    pub start_time: std::time::Instant,
}

/// The relay server
pub struct RelayServer {
    state: RelayState,
    bind: SocketAddr,
}

impl RelayServer {
    /// Create a server around handles built at startup
    pub fn new(bind: SocketAddr, providers: ProviderHandles) -> Self {
        let state = RelayState {
            providers: Arc::new(providers),
            start_time: std::time::Instant::now(),
        };
        Self { state, bind }
    }

    /// Build the Axum router. Request bodies are not size-capped, so any
    /// well-formed JSON reaches the chat handler.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/chat", post(chat_handler))
            .route("/api/status", get(status_handler))
            .layer(DefaultBodyLimit::disable())
            .layer(cors_layer())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Relay listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Relay stopped");
        Ok(())
    }
}

/// Credentials are allowed, so methods and headers are mirrored from the
/// preflight instead of answered with a wildcard.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(ALLOWED_ORIGINS.map(HeaderValue::from_static))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn status_handler(State(state): State<RelayState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    axum::Json(serde_json::json!({
        "status": "ok",
        "providers": {
            "openai": state.providers.is_configured(ProviderKind::OpenAi),
            "anthropic": state.providers.is_configured(ProviderKind::Anthropic),
        },
        "uptime_secs": uptime,
    }))
}
