//! Persistence contracts for accounts, organizations, roles and op logs.
//!
//! Every store is async and object-safe so services hold `Arc<dyn …>` handles
//! and stay unaware of the backend. Two backends exist:
//!
//! - [`InMemoryStore`]: tests and local development.
//! - [`PgStore`]: PostgreSQL via `sqlx`.
//!
//! Multi-step writes (organization + admin account) go through
//! [`UnitOfWork::begin`], which hands out a [`StoreTransaction`]. Dropping a
//! transaction without calling `commit` discards all of its writes.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use schoolmart_core::{
    Account, DomainError, NewAccount, NewOpLog, NewOrganization, OpLog, OrgId, OrgType, Organization, Page,
    PageRequest, Role, RoleId, RoleKey, UserId,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The row addressed by a write does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Connection, query or transaction failure.
    #[error("storage failure in {operation}: {message}")]
    Backend { operation: &'static str, message: String },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => DomainError::not_found(what),
            StoreError::UniqueViolation(what) if what.contains("username") => DomainError::username_taken(),
            StoreError::UniqueViolation(what) => DomainError::conflict(what),
            StoreError::Backend { .. } => DomainError::internal(err.to_string()),
        }
    }
}

/// Filter for organization listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationFilter {
    /// Empty means every type.
    pub org_types: Vec<OrgType>,
    pub parent_id: Option<OrgId>,
}

impl OrganizationFilter {
    pub fn of_type(org_type: OrgType) -> Self {
        Self {
            org_types: vec![org_type],
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<OrgId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn matches(&self, org: &Organization) -> bool {
        (self.org_types.is_empty() || self.org_types.contains(&org.org_type))
            && self.parent_id.is_none_or(|p| org.parent_id == p)
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, id: UserId) -> StoreResult<Option<Account>>;

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>>;

    /// Batch lookup; missing ids are silently skipped.
    async fn find_accounts_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<Account>>;

    /// Insert a single account outside any transaction.
    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account>;

    /// Whole-row save.
    async fn save_account(&self, account: &Account) -> StoreResult<()>;

    /// Hard delete. `NotFound` if the row is absent.
    async fn delete_account(&self, id: UserId) -> StoreResult<()>;

    /// Accounts created by `creator`, ascending by id.
    async fn list_accounts_by_creator(&self, creator: UserId, page: PageRequest) -> StoreResult<Page<Account>>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn find_organization(&self, id: OrgId) -> StoreResult<Option<Organization>>;

    /// Matching organizations, newest (highest id) first.
    async fn list_organizations(
        &self,
        filter: &OrganizationFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Organization>>;

    /// Whole-row save (last writer wins).
    async fn save_organization(&self, org: &Organization) -> StoreResult<()>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role(&self, id: RoleId) -> StoreResult<Option<Role>>;

    async fn find_role_by_key(&self, key: &RoleKey) -> StoreResult<Option<Role>>;

    async fn list_roles(&self) -> StoreResult<Vec<Role>>;

    /// Insert or refresh a role definition (bootstrap only).
    async fn upsert_role(&self, key: &RoleKey, name: &str, can_create_users: bool) -> StoreResult<Role>;
}

#[async_trait]
pub trait OpLogStore: Send + Sync {
    async fn append_op_log(&self, entry: NewOpLog) -> StoreResult<OpLog>;

    /// Entries for one organization, newest first.
    async fn list_op_logs(&self, org_id: OrgId, page: PageRequest) -> StoreResult<Page<OpLog>>;
}

/// Entry point for atomic multi-step writes.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// Writes staged inside one transaction.
///
/// Nothing is visible to other callers until `commit`. Dropping the value
/// rolls back.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_organization(&mut self, new: NewOrganization) -> StoreResult<Organization>;

    async fn set_organization_admin(&mut self, org_id: OrgId, admin: UserId) -> StoreResult<()>;

    async fn save_organization(&mut self, org: &Organization) -> StoreResult<()>;

    async fn delete_organization(&mut self, id: OrgId) -> StoreResult<()>;

    async fn insert_account(&mut self, new: NewAccount) -> StoreResult<Account>;

    async fn save_account(&mut self, account: &Account) -> StoreResult<()>;

    async fn delete_account(&mut self, id: UserId) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// The full set of store handles a service context needs.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub organizations: Arc<dyn OrganizationStore>,
    pub roles: Arc<dyn RoleStore>,
    pub op_logs: Arc<dyn OpLogStore>,
    pub uow: Arc<dyn UnitOfWork>,
}

impl Stores {
    /// Use one backend for every concern.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AccountStore + OrganizationStore + RoleStore + OpLogStore + UnitOfWork + 'static,
    {
        Self {
            accounts: backend.clone(),
            organizations: backend.clone(),
            roles: backend.clone(),
            op_logs: backend.clone(),
            uow: backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(InMemoryStore::new()))
    }

    pub fn postgres(store: PgStore) -> Self {
        Self::from_backend(Arc::new(store))
    }
}

impl core::fmt::Debug for Stores {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_violations_become_username_conflicts() {
        let err: DomainError = StoreError::UniqueViolation("users_username_key".into()).into();
        assert_eq!(err, DomainError::username_taken());

        let err: DomainError = StoreError::NotFound("account").into();
        assert_eq!(err, DomainError::not_found("account"));

        let err: DomainError = StoreError::backend("commit", "connection reset").into();
        assert!(err.is_internal());
    }

    #[test]
    fn filter_matches_type_and_parent() {
        let now = chrono::Utc::now();
        let org = NewOrganization {
            name: "North High".into(),
            org_type: OrgType::School,
            parent_id: OrgId::new(1),
            contact_name: String::new(),
            contact_phone: String::new(),
            address: String::new(),
            is_enabled: true,
        }
        .into_organization(OrgId::new(2), now);

        assert!(OrganizationFilter::default().matches(&org));
        assert!(OrganizationFilter::of_type(OrgType::School).matches(&org));
        assert!(!OrganizationFilter::of_type(OrgType::Supplier).matches(&org));
        assert!(!OrganizationFilter::of_type(OrgType::School)
            .with_parent(Some(OrgId::new(9)))
            .matches(&org));
    }
}
