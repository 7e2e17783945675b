//! HTTP/WebSocket API for the Shan Koe Mee server.
//!
//! The surface is intentionally small: a health check, a table directory
//! and one WebSocket endpoint. All gameplay happens over the socket; a
//! client joins a table with a `table:join` command and from then on every
//! table event is pushed to it as a tagged JSON message.
//!
//! # Endpoints
//!
//! - `GET /health` - Server health status
//! - `GET /api/tables` - List all tables
//! - `GET /ws` - Establish WebSocket connection

pub mod websocket;

use axum::{extract::State, routing::get, Json, Router};
use shan_koe_mee::{TableManager, TableSummary};
use tower_http::cors::CorsLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: TableManager,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tables", get(list_tables))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn list_tables(State(state): State<AppState>) -> Json<Vec<TableSummary>> {
    Json(state.manager.summaries().await)
}
