//! Organizations: the tenant nodes of the platform → school/supplier tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DomainError, OrgId, RoleKey, UserId};

/// Kind of tenant node. Immutable once the organization exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgType {
    Platform,
    School,
    Supplier,
    Canteen,
    Merchant,
}

impl OrgType {
    /// Numeric code used in storage.
    pub fn code(self) -> i16 {
        match self {
            OrgType::Platform => 1,
            OrgType::School => 2,
            OrgType::Supplier => 3,
            OrgType::Canteen => 4,
            OrgType::Merchant => 5,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(OrgType::Platform),
            2 => Ok(OrgType::School),
            3 => Ok(OrgType::Supplier),
            4 => Ok(OrgType::Canteen),
            5 => Ok(OrgType::Merchant),
            other => Err(DomainError::validation(format!("unknown org_type code {other}"))),
        }
    }

    /// Role assigned to the administrator paired with a new organization of
    /// this type, if the type is created through the lifecycle service.
    pub fn admin_role(self) -> Option<RoleKey> {
        match self {
            OrgType::Platform => Some(RoleKey::PLATFORM_ADMIN),
            OrgType::School => Some(RoleKey::SCHOOL_ADMIN),
            OrgType::Supplier => Some(RoleKey::SUPPLIER_ADMIN),
            OrgType::Canteen | OrgType::Merchant => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrgType::Platform => "platform",
            OrgType::School => "school",
            OrgType::Supplier => "supplier",
            OrgType::Canteen => "canteen",
            OrgType::Merchant => "merchant",
        }
    }
}

impl core::fmt::Display for OrgType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted organization.
///
/// # Invariants
/// - `org_type` never changes after creation.
/// - A non-platform organization has a non-zero `admin_user_id` once its
///   creation transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    pub org_type: OrgType,
    pub parent_id: OrgId,
    pub admin_user_id: UserId,
    pub contact_name: String,
    pub contact_phone: String,
    pub address: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organization fields supplied at creation (id and timestamps are assigned by the store).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub org_type: OrgType,
    pub parent_id: OrgId,
    pub contact_name: String,
    pub contact_phone: String,
    pub address: String,
    pub is_enabled: bool,
}

impl NewOrganization {
    pub fn into_organization(self, id: OrgId, now: DateTime<Utc>) -> Organization {
        Organization {
            id,
            name: self.name,
            org_type: self.org_type,
            parent_id: self.parent_id,
            admin_user_id: UserId::NONE,
            contact_name: self.contact_name,
            contact_phone: self.contact_phone,
            address: self.address,
            is_enabled: self.is_enabled,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_type_codes_round_trip() {
        for t in [
            OrgType::Platform,
            OrgType::School,
            OrgType::Supplier,
            OrgType::Canteen,
            OrgType::Merchant,
        ] {
            assert_eq!(OrgType::from_code(t.code()).unwrap(), t);
        }
        assert!(OrgType::from_code(9).is_err());
    }

    #[test]
    fn only_managed_types_have_an_admin_role() {
        assert_eq!(OrgType::School.admin_role(), Some(RoleKey::SCHOOL_ADMIN));
        assert_eq!(OrgType::Supplier.admin_role(), Some(RoleKey::SUPPLIER_ADMIN));
        assert_eq!(OrgType::Canteen.admin_role(), None);
    }
}
