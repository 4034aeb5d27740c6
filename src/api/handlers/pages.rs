//! Fallback for page routes. Rendering lives in the front-end; this only reports
//! what the gateway let through.
use axum::{Json, http::Uri};
use serde::Serialize;

use crate::api::extractors::MaybeUser;

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub path: String,
    pub signed_in: bool,
}

pub async fn page(uri: Uri, MaybeUser(user): MaybeUser) -> Json<PageResponse> {
    Json(PageResponse {
        path: uri.path().to_string(),
        signed_in: user.is_some(),
    })
}
