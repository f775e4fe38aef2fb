use axum::{Json, extract::Extension, extract::rejection::JsonRejection, response::IntoResponse};
use chrono::Utc;

use schoolmart_admin::{LoginRequest, ServiceContext};

use crate::app::{dto, errors};
use crate::app::errors::ApiResult;

pub async fn login(
    Extension(ctx): Extension<ServiceContext>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult {
    let Json(body) = errors::read_input(body)?;
    let result = ctx
        .login()
        .login(body, Utc::now())
        .await
        .map_err(errors::domain_error_response)?;
    Ok(Json(dto::login_to_json(&result)).into_response())
}
