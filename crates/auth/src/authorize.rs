use thiserror::Error;

use schoolmart_core::{DomainError, Role, RoleKey, UserId};

use crate::roles::{is_platform_role, subordinate_role};

/// Actions gated by the caller's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a sub-account under the caller.
    CreateAccount,
    /// Create, edit or delete schools and suppliers.
    ManageOrganizations,
    /// Read the caller organization's operation log.
    ViewOpLogs,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateAccount => "accounts.create",
            Action::ManageOrganizations => "organizations.manage",
            Action::ViewOpLogs => "op_logs.read",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("caller role is not recognised")]
    UnknownRole,

    #[error("role '{role}' may not perform '{action}'")]
    Forbidden { role: String, action: &'static str },

    #[error("only the creator of this account may modify it")]
    NotOwner,

    #[error("role '{0}' cannot create sub-accounts")]
    RoleNotDelegating(String),
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::RoleNotDelegating(role) => DomainError::RoleNotDelegating(role),
            other => DomainError::Forbidden(other.to_string()),
        }
    }
}

/// Role-to-action check.
///
/// `role` is the caller's role row as loaded from the Role Store by key;
/// `None` (role not found) always denies.
///
/// - No IO
/// - No panics
pub fn authorize(role: Option<&Role>, action: Action) -> Result<(), AuthzError> {
    let Some(role) = role else {
        return Err(AuthzError::UnknownRole);
    };

    let allowed = match action {
        Action::CreateAccount => role.can_create_users,
        Action::ManageOrganizations => is_platform_role(&role.role_key),
        Action::ViewOpLogs => true,
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role: role.role_key.as_str().to_string(),
            action: action.as_str(),
        })
    }
}

/// Strict, non-transitive ownership: only the account's creator may mutate it.
///
/// There is no administrator override.
pub fn authorize_ownership(actor: UserId, resource_owner: UserId) -> Result<(), AuthzError> {
    if resource_owner.is_none() || actor != resource_owner {
        return Err(AuthzError::NotOwner);
    }
    Ok(())
}

/// Resolve the subordinate role the caller hands out, or refuse.
pub fn delegated_role(creator: &RoleKey) -> Result<RoleKey, AuthzError> {
    subordinate_role(creator).ok_or_else(|| AuthzError::RoleNotDelegating(creator.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use schoolmart_core::RoleId;

    fn role(key: RoleKey, can_create_users: bool) -> Role {
        Role {
            id: RoleId::new(1),
            role_name: key.to_string(),
            role_key: key,
            can_create_users,
        }
    }

    #[test]
    fn missing_role_fails_closed() {
        assert!(matches!(
            authorize(None, Action::ViewOpLogs),
            Err(AuthzError::UnknownRole)
        ));
    }

    #[test]
    fn account_creation_follows_the_capability_flag() {
        assert_eq!(authorize(Some(&role(RoleKey::SCHOOL_ADMIN, true)), Action::CreateAccount), Ok(()));
        let err = authorize(Some(&role(RoleKey::SCHOOL_STAFF, false)), Action::CreateAccount).unwrap_err();
        assert!(matches!(err, AuthzError::Forbidden { .. }));
    }

    #[test]
    fn organizations_are_platform_only() {
        assert!(authorize(Some(&role(RoleKey::PLATFORM_STAFF, false)), Action::ManageOrganizations).is_ok());
        assert!(authorize(Some(&role(RoleKey::SCHOOL_ADMIN, true)), Action::ManageOrganizations).is_err());
    }

    #[test]
    fn root_accounts_have_no_owner() {
        assert_eq!(authorize_ownership(UserId::NONE, UserId::NONE), Err(AuthzError::NotOwner));
    }

    #[test]
    fn delegation_errors_map_to_their_own_kind() {
        let err: DomainError = delegated_role(&RoleKey::SCHOOL_STAFF).unwrap_err().into();
        assert_eq!(err, DomainError::RoleNotDelegating("school_staff".into()));

        let err: DomainError = AuthzError::NotOwner.into();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    proptest! {
        #[test]
        fn only_the_creator_passes_ownership(actor in 1i64..10_000, owner in 1i64..10_000) {
            let result = authorize_ownership(UserId::new(actor), UserId::new(owner));
            prop_assert_eq!(result.is_ok(), actor == owner);
        }

        #[test]
        fn unknown_keys_never_delegate(key in "[a-z_]{1,20}") {
            let key = RoleKey::new(key);
            let expected = crate::DELEGATIONS.iter().any(|(admin, _)| *admin == key);
            prop_assert_eq!(delegated_role(&key).is_ok(), expected);
        }
    }
}
