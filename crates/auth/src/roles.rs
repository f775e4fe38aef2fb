//! Role delegation table.

use schoolmart_core::RoleKey;

/// Administrator role → the single subordinate role it may create.
pub const DELEGATIONS: [(RoleKey, RoleKey); 3] = [
    (RoleKey::PLATFORM_ADMIN, RoleKey::PLATFORM_STAFF),
    (RoleKey::SCHOOL_ADMIN, RoleKey::SCHOOL_STAFF),
    (RoleKey::SUPPLIER_ADMIN, RoleKey::SUPPLIER_STAFF),
];

/// The role an account holding `creator` may hand out, if any.
pub fn subordinate_role(creator: &RoleKey) -> Option<RoleKey> {
    DELEGATIONS
        .iter()
        .find(|(admin, _)| admin == creator)
        .map(|(_, staff)| staff.clone())
}

/// Platform operators manage schools and suppliers.
pub fn is_platform_role(role: &RoleKey) -> bool {
    *role == RoleKey::PLATFORM_ADMIN || *role == RoleKey::PLATFORM_STAFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_admin_maps_to_its_own_staff() {
        assert_eq!(subordinate_role(&RoleKey::PLATFORM_ADMIN), Some(RoleKey::PLATFORM_STAFF));
        assert_eq!(subordinate_role(&RoleKey::SCHOOL_ADMIN), Some(RoleKey::SCHOOL_STAFF));
        assert_eq!(subordinate_role(&RoleKey::SUPPLIER_ADMIN), Some(RoleKey::SUPPLIER_STAFF));
    }

    #[test]
    fn staff_and_unknown_roles_do_not_delegate() {
        for key in [
            RoleKey::PLATFORM_STAFF,
            RoleKey::SCHOOL_STAFF,
            RoleKey::SUPPLIER_STAFF,
            RoleKey::new("canteen_admin"),
        ] {
            assert_eq!(subordinate_role(&key), None, "{key}");
        }
    }

    #[test]
    fn only_platform_roles_are_operators() {
        assert!(is_platform_role(&RoleKey::PLATFORM_ADMIN));
        assert!(is_platform_role(&RoleKey::PLATFORM_STAFF));
        assert!(!is_platform_role(&RoleKey::SCHOOL_ADMIN));
    }
}
