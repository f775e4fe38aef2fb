//! Domain error model.

use thiserror::Error;

/// Result type used across the domain and service layers.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure a caller can observe is one of these kinds. Storage and
/// crypto errors are converted into `Internal` (or a more specific kind) at
/// the crate boundary that produced them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced account, organization or role does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness rule was violated (e.g. username already exists).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authenticated but not allowed to perform the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller's role has no subordinate role it may create.
    #[error("role '{0}' cannot create sub-accounts")]
    RoleNotDelegating(String),

    /// A seeded role is absent. This is a deployment defect, not a user error.
    #[error("required role '{0}' is missing")]
    RoleMissing(String),

    /// Missing, malformed or expired bearer token.
    #[error("invalid token")]
    InvalidToken,

    /// Credentials were rejected.
    #[error("{0}")]
    Unauthenticated(String),

    /// Persistence or other infrastructure failure not otherwise classified.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The single message used for every rejected login.
    pub fn bad_credentials() -> Self {
        Self::Unauthenticated("username or password incorrect".to_string())
    }

    pub fn username_taken() -> Self {
        Self::Conflict("username already exists".to_string())
    }

    /// Stable machine-readable code for transport mapping.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::RoleNotDelegating(_) => "role_not_delegating",
            DomainError::RoleMissing(_) => "role_missing",
            DomainError::InvalidToken => "invalid_token",
            DomainError::Unauthenticated(_) => "unauthenticated",
            DomainError::Internal(_) => "internal_error",
        }
    }

    /// Whether the error reflects a server-side defect rather than a bad request.
    pub fn is_internal(&self) -> bool {
        matches!(self, DomainError::Internal(_) | DomainError::RoleMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failures_share_one_message() {
        let err = DomainError::bad_credentials();
        assert_eq!(err.to_string(), "username or password incorrect");
        assert_eq!(err.code(), "unauthenticated");
    }

    #[test]
    fn role_missing_counts_as_internal() {
        assert!(DomainError::RoleMissing("school_admin".into()).is_internal());
        assert!(!DomainError::username_taken().is_internal());
        assert_eq!(DomainError::username_taken().to_string(), "conflict: username already exists");
    }
}
