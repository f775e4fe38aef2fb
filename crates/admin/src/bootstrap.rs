//! First-start seeding.
//!
//! Idempotent: roles are upserted, and the platform organization and root
//! administrator are only created when absent. Changing the configured root
//! username after the first start is refused rather than seeding a second
//! root. Startup must abort if this returns an error.

use tracing::{info, instrument};

use schoolmart_core::{
    AccountStatus, DomainError, DomainResult, NewAccount, NewOrganization, OrgId, OrgType, PageRequest, Role,
    RoleKey, UserId,
};
use schoolmart_auth::{MIN_PASSWORD_LEN, hash_password, subordinate_role};
use schoolmart_infra::{OrganizationFilter, Stores};

/// Name given to the platform organization when it is first created.
pub const PLATFORM_ORG_NAME: &str = "SchoolMart Platform";

/// Root administrator credentials.
#[derive(Clone)]
pub struct BootstrapConfig {
    pub root_username: String,
    pub root_password: String,
}

impl core::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("root_username", &self.root_username)
            .field("root_password", &"<redacted>")
            .finish()
    }
}

/// What bootstrap found or created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub roles: Vec<Role>,
    pub platform_org_id: OrgId,
    pub root_user_id: UserId,
    pub created_platform_org: bool,
    pub created_root_user: bool,
}

fn role_name(key: &RoleKey) -> &'static str {
    match key.as_str() {
        "platform_admin" => "Platform Administrator",
        "platform_staff" => "Platform Staff",
        "school_admin" => "School Administrator",
        "school_staff" => "School Staff",
        "supplier_admin" => "Supplier Administrator",
        "supplier_staff" => "Supplier Staff",
        _ => "Custom Role",
    }
}

#[instrument(skip_all, fields(root = %config.root_username), err)]
pub async fn bootstrap(stores: &Stores, config: &BootstrapConfig) -> DomainResult<BootstrapReport> {
    if config.root_password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "root password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    // Roles that delegate are exactly the administrator roles.
    for key in RoleKey::SEEDED.iter() {
        let can_create_users = subordinate_role(key).is_some();
        stores.roles.upsert_role(key, role_name(key), can_create_users).await?;
    }

    let roles = stores.roles.list_roles().await?;
    for key in RoleKey::SEEDED.iter() {
        if !roles.iter().any(|r| &r.role_key == key) {
            return Err(DomainError::RoleMissing(key.to_string()));
        }
    }
    let root_role = roles
        .iter()
        .find(|r| r.role_key == RoleKey::PLATFORM_ADMIN)
        .cloned()
        .ok_or_else(|| DomainError::RoleMissing(RoleKey::PLATFORM_ADMIN.to_string()))?;

    let existing_platform = stores
        .organizations
        .list_organizations(&OrganizationFilter::of_type(OrgType::Platform), PageRequest::default())
        .await?
        .items
        .into_iter()
        .min_by_key(|o| o.id);
    let existing_root = stores.accounts.find_account_by_username(&config.root_username).await?;

    // A root seeded under another username is never replaced by a second one.
    if existing_root.is_none() {
        if let Some(platform) = existing_platform.as_ref().filter(|o| !o.admin_user_id.is_none()) {
            return Err(DomainError::internal(format!(
                "platform organization {} already has administrator {}; root account '{}' not found",
                platform.id, platform.admin_user_id, config.root_username
            )));
        }
        let seeded = stores
            .accounts
            .list_accounts_by_creator(UserId::NONE, PageRequest::default())
            .await?;
        if let Some(other) = seeded.items.iter().find(|a| a.role_id == root_role.id) {
            return Err(DomainError::internal(format!(
                "root account '{}' not found but '{}' already holds the platform_admin role",
                config.root_username, other.username
            )));
        }
    }

    let report = match (existing_platform, existing_root) {
        (Some(platform), Some(root)) => {
            if root.role_id != root_role.id {
                return Err(DomainError::internal(format!(
                    "root account '{}' does not hold the platform_admin role",
                    root.username
                )));
            }
            BootstrapReport {
                roles,
                platform_org_id: platform.id,
                root_user_id: root.id,
                created_platform_org: false,
                created_root_user: false,
            }
        }
        (platform, None) => {
            let password_hash = hash_password(&config.root_password)?;
            let created_platform_org = platform.is_none();

            let mut tx = stores.uow.begin().await?;
            let org = match platform {
                Some(org) => org,
                None => {
                    tx.insert_organization(NewOrganization {
                        name: PLATFORM_ORG_NAME.to_string(),
                        org_type: OrgType::Platform,
                        parent_id: OrgId::NONE,
                        contact_name: String::new(),
                        contact_phone: String::new(),
                        address: String::new(),
                        is_enabled: true,
                    })
                    .await?
                }
            };
            let root = tx
                .insert_account(NewAccount {
                    org_id: org.id,
                    username: config.root_username.clone(),
                    password_hash,
                    real_name: "Platform Administrator".to_string(),
                    mobile: String::new(),
                    role_id: root_role.id,
                    status: AccountStatus::Active,
                    created_by: UserId::NONE,
                })
                .await?;
            if org.admin_user_id.is_none() {
                tx.set_organization_admin(org.id, root.id).await?;
            }
            tx.commit().await?;

            BootstrapReport {
                roles,
                platform_org_id: org.id,
                root_user_id: root.id,
                created_platform_org,
                created_root_user: true,
            }
        }
        (None, Some(root)) => {
            return Err(DomainError::internal(format!(
                "root account '{}' exists without a platform organization",
                root.username
            )));
        }
    };

    info!(
        platform_org_id = %report.platform_org_id,
        root_user_id = %report.root_user_id,
        created_platform_org = report.created_platform_org,
        created_root_user = report.created_root_user,
        "bootstrap complete"
    );
    Ok(report)
}
