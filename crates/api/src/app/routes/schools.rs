use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use schoolmart_admin::{CreateSchoolRequest, ServiceContext, UpdateSchoolRequest};
use schoolmart_core::OrgId;

use crate::app::errors::{self, ApiResult, domain_error_response};
use crate::app::dto;
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_schools).post(create_school))
        .route("/:id", get(get_school).put(update_school).delete(delete_school))
}

/// Create a school and its administrator in one transaction.
pub async fn create_school(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    body: Result<Json<CreateSchoolRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = errors::read_input(body)?;
    let created = ctx
        .organizations()
        .create_school(identity.claims(), body)
        .await
        .map_err(domain_error_response)?;
    Ok((StatusCode::CREATED, Json(dto::created_to_json(&created))).into_response())
}

pub async fn list_schools(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    query: Result<Query<dto::ListQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = errors::read_input(query)?;
    let page = query.page_request().map_err(domain_error_response)?;
    let schools = ctx
        .organizations()
        .list_schools(identity.claims(), page)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::page_to_json(&schools, page, dto::summary_to_json)).into_response())
}

pub async fn get_school(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: OrgId = errors::parse_id(&id)?;
    let school = ctx
        .organizations()
        .get_school(identity.claims(), id)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::details_to_json(&school)).into_response())
}

pub async fn update_school(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSchoolRequest>, JsonRejection>,
) -> ApiResult {
    let id: OrgId = errors::parse_id(&id)?;
    let Json(body) = errors::read_input(body)?;
    let school = ctx
        .organizations()
        .update_school(identity.claims(), id, body)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::organization_to_json(&school)).into_response())
}

/// Delete the school, then its administrator.
pub async fn delete_school(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: OrgId = errors::parse_id(&id)?;
    ctx.organizations()
        .delete_school(identity.claims(), id)
        .await
        .map_err(domain_error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
