use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::context::IdentityContext;

pub async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong" }))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(identity): Extension<IdentityContext>) -> impl IntoResponse {
    let claims = identity.claims();
    Json(json!({
        "user_id": claims.user_id,
        "org_id": claims.org_id,
        "username": claims.username,
        "role": claims.role_key,
        "expires_at": claims.expires_at.to_rfc3339(),
    }))
}
