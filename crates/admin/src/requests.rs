//! Validated service inputs.
//!
//! These are deserialized straight from request bodies (camelCase keys).
//! Unknown keys such as `roleId` or `orgId` are ignored: role and
//! organization are always derived from the caller's claims.

use serde::Deserialize;
use validator::Validate;

use schoolmart_core::{DomainError, DomainResult};

/// Run `validator` rules and convert failures into `DomainError::Validation`.
pub fn validate_input<T: Validate>(input: &T) -> DomainResult<()> {
    input
        .validate()
        .map_err(|errors| DomainError::validation(errors.to_string()))
}

macro_rules! redacted_debug {
    ($ty:ident { $($field:ident),* } secret $secret:ident) => {
        impl core::fmt::Debug for $ty {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))*
                    .field(stringify!($secret), &"<redacted>")
                    .finish()
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

redacted_debug!(LoginRequest { username } secret password);

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 50, message = "username must be 1-50 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "realName must be 1-50 characters"))]
    pub real_name: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "mobile must be at most 20 characters"))]
    pub mobile: String,
}

redacted_debug!(CreateAccountRequest { username, real_name, mobile } secret password);

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 50, message = "realName must be 1-50 characters"))]
    pub real_name: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "mobile must be at most 20 characters"))]
    pub mobile: String,
}

/// `status`: 1 = active, 2 = locked.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(range(min = 1, max = 2, message = "status must be 1 (active) or 2 (locked)"))]
    pub status: i16,
}

#[derive(Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
}

impl core::fmt::Debug for ResetPasswordRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResetPasswordRequest")
            .field("password", &"<redacted>")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schools
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub contact_name: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub contact_phone: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub address: String,
    #[validate(length(min = 1, max = 50, message = "adminUsername must be 1-50 characters"))]
    pub admin_username: String,
    #[validate(length(min = 6, message = "adminPassword must be at least 6 characters"))]
    pub admin_password: String,
    #[validate(length(min = 1, max = 50, message = "adminRealName must be 1-50 characters"))]
    pub admin_real_name: String,
}

redacted_debug!(
    CreateSchoolRequest { name, contact_name, contact_phone, address, admin_username, admin_real_name }
    secret admin_password
);

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchoolRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub contact_name: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub contact_phone: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub address: String,
    #[serde(default)]
    pub is_enabled: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Suppliers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "contactName is required"))]
    pub contact_name: String,
    #[validate(length(min = 1, max = 20, message = "contactPhone is required"))]
    pub contact_phone: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub address: String,
    #[validate(length(min = 1, max = 50, message = "username must be 1-50 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 50, message = "realName must be 1-50 characters"))]
    pub real_name: String,
}

redacted_debug!(
    CreateSupplierRequest { name, contact_name, contact_phone, address, username, real_name }
    secret password
);

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "contactName is required"))]
    pub contact_name: String,
    #[validate(length(min = 1, max = 20, message = "contactPhone is required"))]
    pub contact_phone: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub address: String,
    #[validate(length(min = 1, max = 50, message = "realName must be 1-50 characters"))]
    pub real_name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierStatusRequest {
    pub is_enabled: bool,
}
