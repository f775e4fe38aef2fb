use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use schoolmart_admin::{CreateSupplierRequest, ServiceContext, UpdateSupplierRequest, UpdateSupplierStatusRequest};
use schoolmart_core::OrgId;

use crate::app::errors::{self, ApiResult, domain_error_response};
use crate::app::dto;
use crate::context::IdentityContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/:id", get(get_supplier).put(update_supplier).delete(delete_supplier))
        .route("/:id/status", put(update_supplier_status))
}

pub async fn create_supplier(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    body: Result<Json<CreateSupplierRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = errors::read_input(body)?;
    let created = ctx
        .organizations()
        .create_supplier(identity.claims(), body)
        .await
        .map_err(domain_error_response)?;
    Ok((StatusCode::CREATED, Json(dto::created_to_json(&created))).into_response())
}

/// `?parentId=` narrows the list to one parent organization.
pub async fn list_suppliers(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    query: Result<Query<dto::ListQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = errors::read_input(query)?;
    let page = query.page_request().map_err(domain_error_response)?;
    let suppliers = ctx
        .organizations()
        .list_suppliers(identity.claims(), page, query.parent())
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::page_to_json(&suppliers, page, dto::summary_to_json)).into_response())
}

pub async fn get_supplier(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: OrgId = errors::parse_id(&id)?;
    let supplier = ctx
        .organizations()
        .get_supplier(identity.claims(), id)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::details_to_json(&supplier)).into_response())
}

pub async fn update_supplier(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSupplierRequest>, JsonRejection>,
) -> ApiResult {
    let id: OrgId = errors::parse_id(&id)?;
    let Json(body) = errors::read_input(body)?;
    let supplier = ctx
        .organizations()
        .update_supplier(identity.claims(), id, body)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::organization_to_json(&supplier)).into_response())
}

pub async fn update_supplier_status(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSupplierStatusRequest>, JsonRejection>,
) -> ApiResult {
    let id: OrgId = errors::parse_id(&id)?;
    let Json(body) = errors::read_input(body)?;
    let supplier = ctx
        .organizations()
        .update_supplier_status(identity.claims(), id, body)
        .await
        .map_err(domain_error_response)?;
    Ok(Json(dto::organization_to_json(&supplier)).into_response())
}

pub async fn delete_supplier(
    Extension(ctx): Extension<ServiceContext>,
    Extension(identity): Extension<IdentityContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: OrgId = errors::parse_id(&id)?;
    ctx.organizations()
        .delete_supplier(identity.claims(), id)
        .await
        .map_err(domain_error_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
