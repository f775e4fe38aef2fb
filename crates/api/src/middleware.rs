use std::sync::Arc;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{HeaderMap, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use schoolmart_admin::ServiceContext;
use schoolmart_auth::{JwtValidator, is_platform_role};
use schoolmart_core::DomainError;

use crate::app::errors::{domain_error_response, json_error};
use crate::context::IdentityContext;

/// Largest request body the op-log middleware will buffer.
pub const MAX_AUDITED_BODY: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return domain_error_response(DomainError::InvalidToken);
    };

    let claims = match state.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            return domain_error_response(e.into());
        }
    };

    req.extensions_mut().insert(IdentityContext::new(claims));
    next.run(req).await
}

/// Only platform roles may manage schools and suppliers.
pub async fn require_platform_role(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<IdentityContext>() {
        Some(identity) if is_platform_role(identity.role_key()) => next.run(req).await,
        Some(_) => json_error(StatusCode::FORBIDDEN, "forbidden", "platform role required"),
        None => domain_error_response(DomainError::InvalidToken),
    }
}

/// Queue an op-log entry for every authenticated state-changing request.
///
/// The body is buffered so the handler can still read it; the entry is
/// enqueued after the handler has run and never delays or fails the response.
pub async fn audit_middleware(State(ctx): State<ServiceContext>, req: Request<Body>, next: Next) -> Response {
    if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(req).await;
    }
    let Some(identity) = req.extensions().get::<IdentityContext>().cloned() else {
        return next.run(req).await;
    };

    let module = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let action = req.method().as_str().to_string();

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_AUDITED_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return json_error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "request body is too large",
            );
        }
    };
    let req = Request::from_parts(parts, Body::from(bytes.clone()));

    let response = next.run(req).await;
    ctx.op_logs()
        .record(identity.claims(), &module, &action, &bytes, Utc::now());
    response
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_refused() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
    }
}
