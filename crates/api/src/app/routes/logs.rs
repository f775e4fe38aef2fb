use axum::{
    Json, Router,
    extract::{Extension, Query, rejection::QueryRejection},
    response::IntoResponse,
    routing::get,
};

use schoolmart_admin::ServiceContext;

use crate::app::errors::{self, ApiResult, domain_error_response};
use crate::app::dto;
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_logs))
}

/// Operation log of the caller's organization, newest first.
pub async fn list_logs(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    query: Result<Query<dto::ListQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = errors::read_input(query)?;
    let page = query.page_request().map_err(domain_error_response)?;
    let logs = ctx
        .op_logs()
        .list(identity.claims(), page)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::page_to_json(&logs, page, dto::op_log_to_json)).into_response())
}
