//! Sub-account lifecycle.
//!
//! ```text
//! create ──► active ⇄ locked
//!              │        │
//!              └─► deleted (terminal, hard delete)
//! ```
//!
//! Every mutation loads the target first and then requires
//! `caller.user_id == account.created_by`. There is no administrator
//! override and ownership does not chain through intermediate creators.

use tracing::{info, instrument};

use schoolmart_auth::{
    Action, IdentityClaims, authorize, authorize_ownership, delegated_role, hash_password,
};
use schoolmart_core::{
    Account, AccountStatus, DomainError, DomainResult, NewAccount, Page, PageRequest, UserId,
};
use schoolmart_infra::Stores;

use crate::requests::{
    CreateAccountRequest, ResetPasswordRequest, UpdateAccountRequest, UpdateStatusRequest, validate_input,
};

#[derive(Debug, Clone)]
pub struct AccountService {
    stores: Stores,
}

impl AccountService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Create a sub-account under the caller.
    ///
    /// The new account's organization is the caller's organization and its
    /// role is the caller's delegated staff role.
    #[instrument(skip_all, fields(creator = %actor.user_id, username = %req.username), err)]
    pub async fn create(&self, actor: &IdentityClaims, req: CreateAccountRequest) -> DomainResult<Account> {
        validate_input(&req)?;

        if self
            .stores
            .accounts
            .find_account_by_username(&req.username)
            .await?
            .is_some()
        {
            return Err(DomainError::username_taken());
        }

        let staff_key = delegated_role(&actor.role_key)?;

        let creator_role = self.stores.roles.find_role_by_key(&actor.role_key).await?;
        authorize(creator_role.as_ref(), Action::CreateAccount)?;

        let staff_role = self
            .stores
            .roles
            .find_role_by_key(&staff_key)
            .await?
            .ok_or_else(|| DomainError::RoleMissing(staff_key.to_string()))?;

        let password_hash = hash_password(&req.password)?;

        // A concurrent create can still win the race; the unique constraint
        // surfaces that as the same username conflict.
        let account = self
            .stores
            .accounts
            .insert_account(NewAccount {
                org_id: actor.org_id,
                username: req.username,
                password_hash,
                real_name: req.real_name,
                mobile: req.mobile,
                role_id: staff_role.id,
                status: AccountStatus::Active,
                created_by: actor.user_id,
            })
            .await?;

        info!(user_id = %account.id, role = %staff_key, "account created");
        Ok(account)
    }

    /// Accounts the caller created, ascending by id.
    #[instrument(skip_all, fields(creator = %actor.user_id, page = page.page()), err)]
    pub async fn list(&self, actor: &IdentityClaims, page: PageRequest) -> DomainResult<Page<Account>> {
        Ok(self
            .stores
            .accounts
            .list_accounts_by_creator(actor.user_id, page)
            .await?)
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, user_id = %id), err)]
    pub async fn update(
        &self,
        actor: &IdentityClaims,
        id: UserId,
        req: UpdateAccountRequest,
    ) -> DomainResult<Account> {
        validate_input(&req)?;
        let mut account = self.load_owned(actor, id).await?;

        account.real_name = req.real_name;
        account.mobile = req.mobile;
        self.stores.accounts.save_account(&account).await?;

        info!("account updated");
        Ok(account)
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, user_id = %id), err)]
    pub async fn update_status(
        &self,
        actor: &IdentityClaims,
        id: UserId,
        req: UpdateStatusRequest,
    ) -> DomainResult<Account> {
        validate_input(&req)?;
        let status = AccountStatus::from_code(req.status)?;
        let mut account = self.load_owned(actor, id).await?;

        account.status = status;
        self.stores.accounts.save_account(&account).await?;

        info!(%status, "account status changed");
        Ok(account)
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, user_id = %id), err)]
    pub async fn reset_password(
        &self,
        actor: &IdentityClaims,
        id: UserId,
        req: ResetPasswordRequest,
    ) -> DomainResult<()> {
        validate_input(&req)?;
        let mut account = self.load_owned(actor, id).await?;

        account.password_hash = hash_password(&req.password)?;
        self.stores.accounts.save_account(&account).await?;

        info!("account password reset");
        Ok(())
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, user_id = %id), err)]
    pub async fn delete(&self, actor: &IdentityClaims, id: UserId) -> DomainResult<()> {
        let account = self.load_owned(actor, id).await?;
        self.stores.accounts.delete_account(account.id).await?;

        info!(username = %account.username, "account deleted");
        Ok(())
    }

    async fn load_owned(&self, actor: &IdentityClaims, id: UserId) -> DomainResult<Account> {
        let account = self
            .stores
            .accounts
            .find_account(id)
            .await?
            .ok_or_else(|| DomainError::not_found("account"))?;
        authorize_ownership(actor.user_id, account.created_by)?;
        Ok(account)
    }
}
