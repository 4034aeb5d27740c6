/*
 * Responsibility
 * - GET /health (liveness)
 * - Passes the gateway as a public path without touching cookies
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
