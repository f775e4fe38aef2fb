//! School and supplier lifecycle.
//!
//! An organization and its administrator account are created together in a
//! single store transaction:
//!
//! ```text
//! begin
//!   1. insert organization          (admin_user_id = 0)
//!   2. insert admin account         (org_id = new organization)
//!   3. backfill admin_user_id
//! commit
//! ```
//!
//! A failure at any step rolls the whole transaction back, so an organization
//! without an administrator is never observable. Deletion removes the
//! organization and its administrator in one transaction as well.
//!
//! Reads happen before `begin`; a transaction holds its backend until it
//! commits or rolls back.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, instrument, warn};

use schoolmart_auth::{Action, IdentityClaims, authorize, hash_password};
use schoolmart_core::{
    Account, AccountStatus, DomainError, DomainResult, NewAccount, NewOrganization, OrgId, OrgType, Organization,
    Page, PageRequest, UserId,
};
use schoolmart_infra::{OrganizationFilter, StoreError, StoreResult, StoreTransaction, Stores};

use crate::requests::{
    CreateSchoolRequest, CreateSupplierRequest, UpdateSchoolRequest, UpdateSupplierRequest,
    UpdateSupplierStatusRequest, validate_input,
};

/// Administrator credentials supplied with a new organization.
struct AdminSeed {
    username: String,
    password: String,
    real_name: String,
}

/// A newly created organization and its administrator.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrganization {
    pub organization: Organization,
    pub admin: Account,
}

/// List row: the organization plus its administrator's username (empty if
/// the administrator no longer exists).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationSummary {
    pub organization: Organization,
    pub admin_username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminSummary {
    pub username: String,
    pub real_name: String,
}

/// Detail view: the organization plus its administrator, if present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationDetails {
    pub organization: Organization,
    pub admin: Option<AdminSummary>,
}

#[derive(Debug, Clone)]
pub struct OrganizationService {
    stores: Stores,
}

impl OrganizationService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Schools
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(actor = %actor.user_id, name = %req.name), err)]
    pub async fn create_school(
        &self,
        actor: &IdentityClaims,
        req: CreateSchoolRequest,
    ) -> DomainResult<CreatedOrganization> {
        validate_input(&req)?;
        self.ensure_manager(actor).await?;

        let org = NewOrganization {
            name: req.name,
            org_type: OrgType::School,
            parent_id: actor.org_id,
            contact_name: req.contact_name,
            contact_phone: req.contact_phone,
            address: req.address,
            is_enabled: true,
        };
        let admin = AdminSeed {
            username: req.admin_username,
            password: req.admin_password,
            real_name: req.admin_real_name,
        };
        self.create_with_admin(actor, org, admin).await
    }

    /// Schools, newest first, each with its administrator's username.
    #[instrument(skip_all, fields(actor = %actor.user_id), err)]
    pub async fn list_schools(
        &self,
        actor: &IdentityClaims,
        page: PageRequest,
    ) -> DomainResult<Page<OrganizationSummary>> {
        self.ensure_manager(actor).await?;
        self.list_with_admins(&OrganizationFilter::of_type(OrgType::School), page)
            .await
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, org_id = %id), err)]
    pub async fn get_school(&self, actor: &IdentityClaims, id: OrgId) -> DomainResult<OrganizationDetails> {
        self.ensure_manager(actor).await?;
        let org = self.load_of_type(id, OrgType::School).await?;
        self.with_admin(org).await
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, org_id = %id), err)]
    pub async fn update_school(
        &self,
        actor: &IdentityClaims,
        id: OrgId,
        req: UpdateSchoolRequest,
    ) -> DomainResult<Organization> {
        validate_input(&req)?;
        self.ensure_manager(actor).await?;
        let mut org = self.load_of_type(id, OrgType::School).await?;

        org.name = req.name;
        org.contact_name = req.contact_name;
        org.contact_phone = req.contact_phone;
        org.address = req.address;
        org.is_enabled = req.is_enabled;
        self.stores.organizations.save_organization(&org).await?;

        info!("school updated");
        Ok(org)
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, org_id = %id), err)]
    pub async fn delete_school(&self, actor: &IdentityClaims, id: OrgId) -> DomainResult<()> {
        self.ensure_manager(actor).await?;
        let org = self.load_of_type(id, OrgType::School).await?;
        self.delete_organization(org).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Suppliers
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(actor = %actor.user_id, name = %req.name), err)]
    pub async fn create_supplier(
        &self,
        actor: &IdentityClaims,
        req: CreateSupplierRequest,
    ) -> DomainResult<CreatedOrganization> {
        validate_input(&req)?;
        self.ensure_manager(actor).await?;

        let org = NewOrganization {
            name: req.name,
            org_type: OrgType::Supplier,
            parent_id: actor.org_id,
            contact_name: req.contact_name,
            contact_phone: req.contact_phone,
            address: req.address,
            is_enabled: true,
        };
        let admin = AdminSeed {
            username: req.username,
            password: req.password,
            real_name: req.real_name,
        };
        self.create_with_admin(actor, org, admin).await
    }

    /// Suppliers, newest first, optionally restricted to one parent.
    #[instrument(skip_all, fields(actor = %actor.user_id, parent = ?parent_id), err)]
    pub async fn list_suppliers(
        &self,
        actor: &IdentityClaims,
        page: PageRequest,
        parent_id: Option<OrgId>,
    ) -> DomainResult<Page<OrganizationSummary>> {
        self.ensure_manager(actor).await?;
        let filter = OrganizationFilter::of_type(OrgType::Supplier).with_parent(parent_id);
        self.list_with_admins(&filter, page).await
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, org_id = %id), err)]
    pub async fn get_supplier(&self, actor: &IdentityClaims, id: OrgId) -> DomainResult<OrganizationDetails> {
        self.ensure_manager(actor).await?;
        let org = self.load_of_type(id, OrgType::Supplier).await?;
        self.with_admin(org).await
    }

    /// Save supplier fields and the administrator's real name atomically.
    #[instrument(skip_all, fields(actor = %actor.user_id, org_id = %id), err)]
    pub async fn update_supplier(
        &self,
        actor: &IdentityClaims,
        id: OrgId,
        req: UpdateSupplierRequest,
    ) -> DomainResult<Organization> {
        validate_input(&req)?;
        self.ensure_manager(actor).await?;
        let mut org = self.load_of_type(id, OrgType::Supplier).await?;
        let mut admin = self
            .stores
            .accounts
            .find_account(org.admin_user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("supplier administrator"))?;

        org.name = req.name;
        org.contact_name = req.contact_name;
        org.contact_phone = req.contact_phone;
        org.address = req.address;
        admin.real_name = req.real_name;

        let mut tx = self.stores.uow.begin().await?;
        let staged = async {
            tx.save_organization(&org).await?;
            tx.save_account(&admin).await
        }
        .await;
        finish(tx, staged).await?;

        info!("supplier updated");
        Ok(org)
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, org_id = %id, enabled = req.is_enabled), err)]
    pub async fn update_supplier_status(
        &self,
        actor: &IdentityClaims,
        id: OrgId,
        req: UpdateSupplierStatusRequest,
    ) -> DomainResult<Organization> {
        self.ensure_manager(actor).await?;
        let mut org = self.load_of_type(id, OrgType::Supplier).await?;

        org.is_enabled = req.is_enabled;
        self.stores.organizations.save_organization(&org).await?;

        info!("supplier status changed");
        Ok(org)
    }

    #[instrument(skip_all, fields(actor = %actor.user_id, org_id = %id), err)]
    pub async fn delete_supplier(&self, actor: &IdentityClaims, id: OrgId) -> DomainResult<()> {
        self.ensure_manager(actor).await?;
        let org = self.load_of_type(id, OrgType::Supplier).await?;
        self.delete_organization(org).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shared steps
    // ─────────────────────────────────────────────────────────────────────

    /// Fails closed: an unknown role is denied.
    async fn ensure_manager(&self, actor: &IdentityClaims) -> DomainResult<()> {
        let role = self.stores.roles.find_role_by_key(&actor.role_key).await?;
        authorize(role.as_ref(), Action::ManageOrganizations)?;
        Ok(())
    }

    async fn create_with_admin(
        &self,
        actor: &IdentityClaims,
        org: NewOrganization,
        admin: AdminSeed,
    ) -> DomainResult<CreatedOrganization> {
        if self
            .stores
            .accounts
            .find_account_by_username(&admin.username)
            .await?
            .is_some()
        {
            return Err(DomainError::username_taken());
        }

        let role_key = org
            .org_type
            .admin_role()
            .ok_or_else(|| DomainError::validation(format!("{} organizations have no administrator", org.org_type)))?;
        let role = self
            .stores
            .roles
            .find_role_by_key(&role_key)
            .await?
            .ok_or_else(|| DomainError::RoleMissing(role_key.to_string()))?;

        let password_hash = hash_password(&admin.password)?;

        let mut tx = self.stores.uow.begin().await?;
        let staged = async {
            let organization = tx.insert_organization(org).await?;
            let account = tx
                .insert_account(NewAccount {
                    org_id: organization.id,
                    username: admin.username,
                    password_hash,
                    real_name: admin.real_name,
                    mobile: String::new(),
                    role_id: role.id,
                    status: AccountStatus::Active,
                    created_by: actor.user_id,
                })
                .await?;
            tx.set_organization_admin(organization.id, account.id).await?;
            Ok::<_, StoreError>(CreatedOrganization {
                organization: Organization {
                    admin_user_id: account.id,
                    ..organization
                },
                admin: account,
            })
        }
        .await;
        let created = finish(tx, staged).await?;

        info!(
            org_id = %created.organization.id,
            org_type = %created.organization.org_type,
            admin_user_id = %created.admin.id,
            "organization created"
        );
        Ok(created)
    }

    /// Delete the organization row, then its administrator. An administrator
    /// that is already gone is fine; any other failure rolls back both.
    async fn delete_organization(&self, org: Organization) -> DomainResult<()> {
        let mut tx = self.stores.uow.begin().await?;
        let staged = async {
            tx.delete_organization(org.id).await?;
            if org.admin_user_id.is_none() {
                return Ok::<(), StoreError>(());
            }
            match tx.delete_account(org.admin_user_id).await {
                Err(e) if e.is_not_found() => {
                    warn!(admin_user_id = %org.admin_user_id, "administrator already removed");
                    Ok(())
                }
                other => other,
            }
        }
        .await;
        finish(tx, staged).await?;

        info!(org_type = %org.org_type, "organization deleted");
        Ok(())
    }

    async fn load_of_type(&self, id: OrgId, org_type: OrgType) -> DomainResult<Organization> {
        match self.stores.organizations.find_organization(id).await? {
            Some(org) if org.org_type == org_type => Ok(org),
            _ => Err(DomainError::not_found(org_type.as_str())),
        }
    }

    async fn with_admin(&self, organization: Organization) -> DomainResult<OrganizationDetails> {
        let admin = if organization.admin_user_id.is_none() {
            None
        } else {
            self.stores
                .accounts
                .find_account(organization.admin_user_id)
                .await?
                .map(|a| AdminSummary {
                    username: a.username,
                    real_name: a.real_name,
                })
        };
        Ok(OrganizationDetails { organization, admin })
    }

    /// One page of organizations plus a single batched administrator lookup.
    async fn list_with_admins(
        &self,
        filter: &OrganizationFilter,
        page: PageRequest,
    ) -> DomainResult<Page<OrganizationSummary>> {
        let orgs = self.stores.organizations.list_organizations(filter, page).await?;

        let admin_ids: Vec<UserId> = orgs
            .items
            .iter()
            .map(|o| o.admin_user_id)
            .filter(|id| !id.is_none())
            .collect();
        let usernames: HashMap<UserId, String> = self
            .stores
            .accounts
            .find_accounts_by_ids(&admin_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a.username))
            .collect();

        Ok(orgs.map(|organization| OrganizationSummary {
            admin_username: usernames
                .get(&organization.admin_user_id)
                .cloned()
                .unwrap_or_default(),
            organization,
        }))
    }
}

/// Commit on success, roll back on failure.
async fn finish<T>(tx: Box<dyn StoreTransaction>, staged: StoreResult<T>) -> DomainResult<T> {
    match staged {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err.into())
        }
    }
}
