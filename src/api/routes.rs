/*
 * Responsibility
 * - URL layout of the host pipeline
 * - The gateway layer is applied on top of this router in app.rs, so every route and the
 *   fallback below pass through it
 */
use axum::{Router, routing::get};

use crate::api::handlers::{health::health, pages::page, session::me};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/me", get(me))
        .fallback(page)
}
