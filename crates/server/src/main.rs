use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::ApiError,
    protocol::{
        AskRequest, AskResponse, LoadUrlRequest, LoadUrlResponse, StatusResponse, ASK_ROUTE,
        LOAD_URL_ROUTE,
    },
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod index;
mod page;

use api::ApiContext;
use config::load_settings;
use page::HttpPageFetcher;

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let fetcher = HttpPageFetcher::new(&settings)?;
    let api = ApiContext::new(Arc::new(fetcher), &settings);
    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .route(LOAD_URL_ROUTE, post(http_load_url))
        .route(ASK_ROUTE, post(http_ask))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn home() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "RAG Chatbot API is running".to_string(),
    })
}

async fn healthz() -> &'static str {
    "ok"
}

fn into_response_error(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = StatusCode::from_u16(error.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error))
}

async fn http_load_url(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadUrlRequest>,
) -> Result<Json<LoadUrlResponse>, (StatusCode, Json<ApiError>)> {
    api::load_url(&state.api, req)
        .await
        .map(Json)
        .map_err(into_response_error)
}

async fn http_ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ApiError>)> {
    api::ask(&state.api, req)
        .await
        .map(Json)
        .map_err(into_response_error)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
