//! `schoolmart-auth`: role delegation, authorization checks, password hashing and tokens.
//!
//! This crate is intentionally decoupled from HTTP and storage: callers hand
//! it already-loaded roles and accounts and get back a decision.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod roles;
pub mod token;

pub use authorize::{Action, AuthzError, authorize, authorize_ownership, delegated_role};
pub use claims::{IdentityClaims, TokenValidationError, validate_claims};
pub use password::{MIN_PASSWORD_LEN, PasswordError, check_password, hash_password, verify_password};
pub use roles::{DELEGATIONS, is_platform_role, subordinate_role};
pub use token::{Hs256TokenService, IssuedToken, JwtValidator, TokenConfig, TokenError};
