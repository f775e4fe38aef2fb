use schoolmart_auth::IdentityClaims;
use schoolmart_core::RoleKey;

/// Identity of the caller for a request.
///
/// Inserted by the auth middleware from a verified token; every protected
/// handler extracts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    claims: IdentityClaims,
}

impl IdentityContext {
    pub fn new(claims: IdentityClaims) -> Self {
        Self { claims }
    }

    pub fn claims(&self) -> &IdentityClaims {
        &self.claims
    }

    pub fn role_key(&self) -> &RoleKey {
        &self.claims.role_key
    }
}
