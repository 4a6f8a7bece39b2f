//! Inspector HTTP server.
//!
//! Serves the RPC surface as JSON endpoints and pushes hot-update events over
//! Server-Sent Events. CORS is wide open: this is a dev-only tool.

use crate::middleware::time_requests;
use crate::rpc::RpcHandler;
use crate::state::SharedState;
use crate::{Error, Result};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response, Sse},
    routing::get,
};
use peek_core::registry::EnvQuery;
use serde::Deserialize;
use std::net::SocketAddr;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Inspector server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 7867)),
        }
    }
}

impl ServerConfig {
    pub fn server_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// The live inspector server.
pub struct InspectorServer {
    config: ServerConfig,
    state: SharedState,
}

impl InspectorServer {
    pub fn new(config: ServerConfig, state: SharedState) -> Self {
        Self { config, state }
    }

    /// Start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the configured address.
    pub async fn start(self) -> Result<()> {
        let addr = self.config.addr;
        let url = self.config.server_url();

        let app = build_router(self.state);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("Inspector running at {}", url);

        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Server(format!("Server error: {}", e)))?;

        Ok(())
    }
}

/// Build the axum router over shared state.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/metadata", get(handle_metadata))
        .route("/api/modules", get(handle_modules))
        .route("/api/module", get(handle_module))
        .route("/api/metrics/plugins", get(handle_plugin_metrics))
        .route("/api/metrics/server", get(handle_server_metrics))
        .route("/api/resolve", get(handle_resolve))
        .route("/api/events", get(handle_sse))
        .layer(axum::middleware::from_fn_with_state(state.clone(), time_requests))
        .layer(
            // CORS: Allow all origins for dev (standard practice)
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Query params for `getModuleTransformInfo`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleQuery {
    pub instance_id: String,
    pub environment_name: String,
    pub id: String,
    #[serde(default)]
    pub clear: bool,
}

impl ModuleQuery {
    fn env_query(&self) -> EnvQuery {
        EnvQuery::new(self.instance_id.clone(), self.environment_name.clone())
    }
}

/// Query params for `resolveId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveQuery {
    pub instance_id: String,
    pub environment_name: String,
    pub id: String,
}

async fn handle_metadata(State(state): State<SharedState>) -> impl IntoResponse {
    Json(RpcHandler::new(state).get_metadata().await)
}

async fn handle_modules(
    State(state): State<SharedState>,
    Query(query): Query<EnvQuery>,
) -> Result<impl IntoResponse> {
    let modules = RpcHandler::new(state).get_modules_list(&query).await?;
    Ok(Json(modules))
}

async fn handle_module(
    State(state): State<SharedState>,
    Query(query): Query<ModuleQuery>,
) -> Result<impl IntoResponse> {
    let info = RpcHandler::new(state)
        .get_module_transform_info(&query.env_query(), &query.id, query.clear)
        .await?;
    Ok(Json(info))
}

async fn handle_plugin_metrics(
    State(state): State<SharedState>,
    Query(query): Query<EnvQuery>,
) -> Result<impl IntoResponse> {
    let metrics = RpcHandler::new(state).get_plugin_metrics(&query).await?;
    Ok(Json(metrics))
}

async fn handle_server_metrics(
    State(state): State<SharedState>,
    Query(query): Query<EnvQuery>,
) -> Result<impl IntoResponse> {
    let metrics = RpcHandler::new(state).get_server_metrics(&query).await?;
    Ok(Json(metrics))
}

async fn handle_resolve(
    State(state): State<SharedState>,
    Query(query): Query<ResolveQuery>,
) -> Result<impl IntoResponse> {
    let resolved = RpcHandler::new(state)
        .resolve_id(
            &EnvQuery::new(query.instance_id.clone(), query.environment_name.clone()),
            &query.id,
        )
        .await?;
    Ok(Json(resolved))
}

/// Handle SSE connections for hot-update events.
async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<axum::response::sse::Event, std::convert::Infallible>>>
{
    use axum::response::sse::Event;

    let (id, rx) = state.register_client();
    tracing::debug!("client {} connected to event stream", id);

    state
        .broadcast(&crate::state::InspectorEvent::ClientConnected { id })
        .await;

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Query(peek_core::Error::UnknownInstance(_))
            | Error::Query(peek_core::Error::UnknownEnvironment { .. }) => StatusCode::NOT_FOUND,
            Error::Query(_) => StatusCode::BAD_REQUEST,
            Error::Server(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
