use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use schoolmart_core::DomainError;

/// Handler result: both arms are finished responses, so `?` works on
/// extraction, parsing and service errors alike.
pub type ApiResult = Result<axum::response::Response, axum::response::Response>;

pub fn domain_error_response(err: DomainError) -> axum::response::Response {
    let status = match &err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Forbidden(_) | DomainError::RoleNotDelegating(_) => StatusCode::FORBIDDEN,
        DomainError::InvalidToken | DomainError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        DomainError::RoleMissing(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if err.is_internal() {
        error!(error = %err, code = err.code(), "request failed");
        return json_error(status, err.code(), "internal server error");
    }
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Unwrap a body/query extractor, answering 400 in the common JSON shape.
pub fn read_input<T, R: std::fmt::Display>(input: Result<T, R>) -> Result<T, axum::response::Response> {
    input.map_err(|rejection| json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.to_string()))
}

/// Parse a numeric path id, answering 400 on garbage.
pub fn parse_id<T: std::str::FromStr>(raw: &str) -> Result<T, axum::response::Response> {
    raw.parse()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "id must be a positive integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use schoolmart_core::UserId;

    #[test]
    fn each_kind_maps_to_its_status() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("account"), StatusCode::NOT_FOUND),
            (DomainError::username_taken(), StatusCode::CONFLICT),
            (DomainError::forbidden("x"), StatusCode::FORBIDDEN),
            (DomainError::RoleNotDelegating("school_staff".into()), StatusCode::FORBIDDEN),
            (DomainError::RoleMissing("school_staff".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::InvalidToken, StatusCode::UNAUTHORIZED),
            (DomainError::bad_credentials(), StatusCode::UNAUTHORIZED),
            (DomainError::internal("db down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_response(err).status(), status);
        }
    }

    #[test]
    fn bad_ids_are_rejected() {
        assert!(parse_id::<UserId>("12").is_ok());
        assert_eq!(
            parse_id::<UserId>("twelve").unwrap_err().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
