use std::sync::Arc;

use schoolmart_auth::Hs256TokenService;
use schoolmart_infra::{AuditLog, Stores};

use crate::accounts::AccountService;
use crate::login::LoginService;
use crate::op_logs::OpLogService;
use crate::organizations::OrganizationService;

/// Everything a request needs, constructed once at startup and injected.
///
/// Cloning is cheap: every field is a shared handle.
#[derive(Clone, Debug)]
pub struct ServiceContext {
    pub stores: Stores,
    pub tokens: Arc<Hs256TokenService>,
    pub audit: AuditLog,
}

impl ServiceContext {
    pub fn new(stores: Stores, tokens: Arc<Hs256TokenService>, audit: AuditLog) -> Self {
        Self { stores, tokens, audit }
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.stores.clone())
    }

    pub fn organizations(&self) -> OrganizationService {
        OrganizationService::new(self.stores.clone())
    }

    pub fn login(&self) -> LoginService {
        LoginService::new(self.stores.clone(), self.tokens.clone())
    }

    pub fn op_logs(&self) -> OpLogService {
        OpLogService::new(self.stores.clone(), self.audit.clone())
    }
}
