use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
};
use serde_json::json;

use schoolmart_admin::{
    CreateAccountRequest, ResetPasswordRequest, ServiceContext, UpdateAccountRequest, UpdateStatusRequest,
};
use schoolmart_core::UserId;

use crate::app::errors::{self, ApiResult, domain_error_response};
use crate::app::dto;
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_account).get(list_accounts))
        .route("/:id", put(update_account).delete(delete_account))
        .route("/:id/status", put(update_status))
        .route("/:id/password", put(reset_password))
}

/// Create a sub-account in the caller's organization with the caller's
/// subordinate role.
pub async fn create_account(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = errors::read_input(body)?;
    let account = ctx
        .accounts()
        .create(identity.claims(), body)
        .await
        .map_err(domain_error_response)?;
    Ok((StatusCode::CREATED, Json(dto::account_to_json(&account))).into_response())
}

/// Accounts the caller created.
pub async fn list_accounts(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    query: Result<Query<dto::ListQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = errors::read_input(query)?;
    let page = query.page_request().map_err(domain_error_response)?;
    let accounts = ctx
        .accounts()
        .list(identity.claims(), page)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::page_to_json(&accounts, page, dto::account_to_json)).into_response())
}

pub async fn update_account(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> ApiResult {
    let id: UserId = errors::parse_id(&id)?;
    let Json(body) = errors::read_input(body)?;
    let account = ctx
        .accounts()
        .update(identity.claims(), id, body)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::account_to_json(&account)).into_response())
}

pub async fn update_status(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult {
    let id: UserId = errors::parse_id(&id)?;
    let Json(body) = errors::read_input(body)?;
    let account = ctx
        .accounts()
        .update_status(identity.claims(), id, body)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::account_to_json(&account)).into_response())
}

pub async fn reset_password(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
    body: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult {
    let id: UserId = errors::parse_id(&id)?;
    let Json(body) = errors::read_input(body)?;
    ctx.accounts()
        .reset_password(identity.claims(), id, body)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(json!({ "message": "password reset" })).into_response())
}

pub async fn delete_account(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: UserId = errors::parse_id(&id)?;
    ctx.accounts()
        .delete(identity.claims(), id)
        .await
        .map_err(domain_error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
