/*
 * Responsibility
 * - GET /api/me: the user behind the current session
 * - Endpoint-level check; the gateway lets `/api/...` through as public
 */
use axum::Json;

use crate::api::extractors::CurrentUser;
use crate::services::identity::AuthenticatedUser;

pub async fn me(CurrentUser(user): CurrentUser) -> Json<AuthenticatedUser> {
    Json(user)
}
