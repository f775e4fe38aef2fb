//! Accounts (users) bound to an organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, OrgId, RoleId, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// Account Status
// ─────────────────────────────────────────────────────────────────────────────

/// Account status. `active ⇄ locked` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Locked,
}

impl AccountStatus {
    pub fn code(self) -> i16 {
        match self {
            AccountStatus::Active => 1,
            AccountStatus::Locked => 2,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(AccountStatus::Active),
            2 => Ok(AccountStatus::Locked),
            other => Err(DomainError::validation(format!(
                "status must be 1 (active) or 2 (locked), got {other}"
            ))),
        }
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Locked => write!(f, "locked"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted account.
///
/// # Invariants
/// - `username` is globally unique (enforced by storage).
/// - `created_by` is `UserId::NONE` only for seeded root accounts.
/// - Only the account named by `created_by` may mutate it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub org_id: OrgId,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub real_name: String,
    pub mobile: String,
    pub role_id: RoleId,
    pub status: AccountStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_locked(&self) -> bool {
        self.status == AccountStatus::Locked
    }
}

impl core::fmt::Debug for Account {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("org_id", &self.org_id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("real_name", &self.real_name)
            .field("mobile", &self.mobile)
            .field("role_id", &self.role_id)
            .field("status", &self.status)
            .field("created_by", &self.created_by)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Account fields supplied at creation. `password_hash` must already be hashed.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub org_id: OrgId,
    pub username: String,
    pub password_hash: String,
    pub real_name: String,
    pub mobile: String,
    pub role_id: RoleId,
    pub status: AccountStatus,
    pub created_by: UserId,
}

impl NewAccount {
    pub fn into_account(self, id: UserId, now: DateTime<Utc>) -> Account {
        Account {
            id,
            org_id: self.org_id,
            username: self.username,
            password_hash: self.password_hash,
            real_name: self.real_name,
            mobile: self.mobile,
            role_id: self.role_id,
            status: self.status,
            created_by: self.created_by,
            created_at: now,
        }
    }
}

impl core::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewAccount")
            .field("org_id", &self.org_id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("role_id", &self.role_id)
            .field("created_by", &self.created_by)
            .finish_non_exhaustive()
    }
}
