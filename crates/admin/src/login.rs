use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use schoolmart_auth::{Hs256TokenService, IdentityClaims, PasswordError, verify_password};
use schoolmart_core::{DomainError, DomainResult, OrgId, RoleKey, UserId};
use schoolmart_infra::Stores;

use crate::requests::{LoginRequest, validate_input};

/// Public profile returned alongside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub real_name: String,
    pub role: RoleKey,
    pub org_id: OrgId,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub claims: IdentityClaims,
    pub user_info: UserInfo,
}

/// Exchanges credentials for a signed identity token.
#[derive(Debug, Clone)]
pub struct LoginService {
    stores: Stores,
    tokens: Arc<Hs256TokenService>,
}

impl LoginService {
    pub fn new(stores: Stores, tokens: Arc<Hs256TokenService>) -> Self {
        Self { stores, tokens }
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown usernames and wrong passwords produce the same error. A
    /// locked account is only reported after its password checks out.
    #[instrument(skip_all, fields(username = %req.username), err)]
    pub async fn login(&self, req: LoginRequest, now: DateTime<Utc>) -> DomainResult<LoginResult> {
        validate_input(&req)?;

        let Some(account) = self.stores.accounts.find_account_by_username(&req.username).await? else {
            return Err(DomainError::bad_credentials());
        };

        match verify_password(&req.password, &account.password_hash) {
            Ok(()) => {}
            Err(PasswordError::InvalidHashFormat) => {
                warn!(user_id = %account.id, "stored password hash is malformed");
                return Err(DomainError::bad_credentials());
            }
            Err(e) => return Err(e.into()),
        }

        if account.is_locked() {
            return Err(DomainError::forbidden("account is locked"));
        }

        let role = self
            .stores
            .roles
            .find_role(account.role_id)
            .await?
            .ok_or_else(|| DomainError::RoleMissing(format!("role id {}", account.role_id)))?;

        let issued = self
            .tokens
            .issue(account.id, account.org_id, &account.username, &role.role_key, now)?;

        info!(user_id = %account.id, role = %role.role_key, "login succeeded");
        Ok(LoginResult {
            token: issued.token,
            claims: issued.claims,
            user_info: UserInfo {
                id: account.id,
                username: account.username,
                real_name: account.real_name,
                role: role.role_key,
                org_id: account.org_id,
            },
        })
    }
}
