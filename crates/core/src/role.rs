//! Role definitions.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::RoleId;

/// Stable symbolic role identifier (e.g. `school_admin`).
///
/// Keys are kept as opaque strings so a token or a database row carrying an
/// unknown key can still be represented and then rejected by policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleKey(Cow<'static, str>);

impl RoleKey {
    pub const PLATFORM_ADMIN: RoleKey = RoleKey(Cow::Borrowed("platform_admin"));
    pub const PLATFORM_STAFF: RoleKey = RoleKey(Cow::Borrowed("platform_staff"));
    pub const SCHOOL_ADMIN: RoleKey = RoleKey(Cow::Borrowed("school_admin"));
    pub const SCHOOL_STAFF: RoleKey = RoleKey(Cow::Borrowed("school_staff"));
    pub const SUPPLIER_ADMIN: RoleKey = RoleKey(Cow::Borrowed("supplier_admin"));
    pub const SUPPLIER_STAFF: RoleKey = RoleKey(Cow::Borrowed("supplier_staff"));

    /// Every key seeded at bootstrap.
    pub const SEEDED: [RoleKey; 6] = [
        Self::PLATFORM_ADMIN,
        Self::PLATFORM_STAFF,
        Self::SCHOOL_ADMIN,
        Self::SCHOOL_STAFF,
        Self::SUPPLIER_ADMIN,
        Self::SUPPLIER_STAFF,
    ];

    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted role definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub role_key: RoleKey,
    pub role_name: String,
    pub can_create_users: bool,
}
