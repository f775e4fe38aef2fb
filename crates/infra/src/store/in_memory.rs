//! In-memory store for tests and local development.
//!
//! All tables live behind one async mutex. A transaction takes ownership of
//! the lock, works on a copy of the tables, and swaps the copy in on commit,
//! so transactions are fully serialized and a dropped transaction leaves no
//! trace. Callers must not use the non-transactional methods while holding a
//! transaction on the same store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use schoolmart_core::{
    Account, NewAccount, NewOpLog, NewOrganization, OpLog, OpLogId, OrgId, Organization, Page, PageRequest, Role,
    RoleId, RoleKey, UserId,
};

use super::{
    AccountStore, OpLogStore, OrganizationFilter, OrganizationStore, RoleStore, StoreError, StoreResult,
    StoreTransaction, UnitOfWork,
};

#[derive(Debug, Default, Clone)]
struct Tables {
    organizations: BTreeMap<OrgId, Organization>,
    accounts: BTreeMap<UserId, Account>,
    roles: BTreeMap<RoleId, Role>,
    next_org_id: i64,
    next_user_id: i64,
    next_role_id: i64,
}

impl Tables {
    fn insert_organization(&mut self, new: NewOrganization) -> Organization {
        self.next_org_id += 1;
        let org = new.into_organization(OrgId::new(self.next_org_id), Utc::now());
        self.organizations.insert(org.id, org.clone());
        org
    }

    fn set_organization_admin(&mut self, org_id: OrgId, admin: UserId) -> StoreResult<()> {
        let org = self
            .organizations
            .get_mut(&org_id)
            .ok_or(StoreError::NotFound("organization"))?;
        org.admin_user_id = admin;
        org.updated_at = Utc::now();
        Ok(())
    }

    fn save_organization(&mut self, org: &Organization) -> StoreResult<()> {
        let slot = self
            .organizations
            .get_mut(&org.id)
            .ok_or(StoreError::NotFound("organization"))?;
        let mut updated = org.clone();
        updated.org_type = slot.org_type;
        updated.created_at = slot.created_at;
        updated.updated_at = Utc::now();
        *slot = updated;
        Ok(())
    }

    fn delete_organization(&mut self, id: OrgId) -> StoreResult<()> {
        self.organizations
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("organization"))
    }

    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.accounts
            .values()
            .any(|a| a.username == username && Some(a.id) != except)
    }

    fn insert_account(&mut self, new: NewAccount) -> StoreResult<Account> {
        if self.username_taken(&new.username, None) {
            return Err(StoreError::UniqueViolation("users_username_key".to_string()));
        }
        self.next_user_id += 1;
        let account = new.into_account(UserId::new(self.next_user_id), Utc::now());
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn save_account(&mut self, account: &Account) -> StoreResult<()> {
        if self.username_taken(&account.username, Some(account.id)) {
            return Err(StoreError::UniqueViolation("users_username_key".to_string()));
        }
        let slot = self
            .accounts
            .get_mut(&account.id)
            .ok_or(StoreError::NotFound("account"))?;
        let created_at = slot.created_at;
        *slot = account.clone();
        slot.created_at = created_at;
        Ok(())
    }

    fn delete_account(&mut self, id: UserId) -> StoreResult<()> {
        self.accounts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("account"))
    }
}

/// In-memory implementation of every store trait.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    op_logs: Arc<Mutex<Vec<OpLog>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn find_account(&self, id: UserId) -> StoreResult<Option<Account>> {
        Ok(self.tables.lock().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.values().find(|a| a.username == username).cloned())
    }

    async fn find_accounts_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<Account>> {
        let tables = self.tables.lock().await;
        Ok(ids.iter().filter_map(|id| tables.accounts.get(id).cloned()).collect())
    }

    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account> {
        self.tables.lock().await.insert_account(new)
    }

    async fn save_account(&self, account: &Account) -> StoreResult<()> {
        self.tables.lock().await.save_account(account)
    }

    async fn delete_account(&self, id: UserId) -> StoreResult<()> {
        self.tables.lock().await.delete_account(id)
    }

    async fn list_accounts_by_creator(&self, creator: UserId, page: PageRequest) -> StoreResult<Page<Account>> {
        let tables = self.tables.lock().await;
        // BTreeMap iteration is ascending by id.
        let matching: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| a.created_by == creator)
            .cloned()
            .collect();
        Ok(Page::new(page.apply(&matching), matching.len() as u64))
    }
}

#[async_trait]
impl OrganizationStore for InMemoryStore {
    async fn find_organization(&self, id: OrgId) -> StoreResult<Option<Organization>> {
        Ok(self.tables.lock().await.organizations.get(&id).cloned())
    }

    async fn list_organizations(
        &self,
        filter: &OrganizationFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Organization>> {
        let tables = self.tables.lock().await;
        let matching: Vec<Organization> = tables
            .organizations
            .values()
            .rev()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        Ok(Page::new(page.apply(&matching), matching.len() as u64))
    }

    async fn save_organization(&self, org: &Organization) -> StoreResult<()> {
        self.tables.lock().await.save_organization(org)
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn find_role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        Ok(self.tables.lock().await.roles.get(&id).cloned())
    }

    async fn find_role_by_key(&self, key: &RoleKey) -> StoreResult<Option<Role>> {
        let tables = self.tables.lock().await;
        Ok(tables.roles.values().find(|r| r.role_key == *key).cloned())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.tables.lock().await.roles.values().cloned().collect())
    }

    async fn upsert_role(&self, key: &RoleKey, name: &str, can_create_users: bool) -> StoreResult<Role> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.roles.values_mut().find(|r| r.role_key == *key) {
            existing.role_name = name.to_string();
            existing.can_create_users = can_create_users;
            return Ok(existing.clone());
        }

        tables.next_role_id += 1;
        let role = Role {
            id: RoleId::new(tables.next_role_id),
            role_key: key.clone(),
            role_name: name.to_string(),
            can_create_users,
        };
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }
}

#[async_trait]
impl OpLogStore for InMemoryStore {
    async fn append_op_log(&self, entry: NewOpLog) -> StoreResult<OpLog> {
        let mut logs = self.op_logs.lock().await;
        let log = entry.into_op_log(OpLogId::new(logs.len() as i64 + 1));
        logs.push(log.clone());
        Ok(log)
    }

    async fn list_op_logs(&self, org_id: OrgId, page: PageRequest) -> StoreResult<Page<OpLog>> {
        let logs = self.op_logs.lock().await;
        let matching: Vec<OpLog> = logs.iter().rev().filter(|l| l.org_id == org_id).cloned().collect();
        Ok(Page::new(page.apply(&matching), matching.len() as u64))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

/// Serialized transaction over a private copy of the tables.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn insert_organization(&mut self, new: NewOrganization) -> StoreResult<Organization> {
        Ok(self.working.insert_organization(new))
    }

    async fn set_organization_admin(&mut self, org_id: OrgId, admin: UserId) -> StoreResult<()> {
        self.working.set_organization_admin(org_id, admin)
    }

    async fn save_organization(&mut self, org: &Organization) -> StoreResult<()> {
        self.working.save_organization(org)
    }

    async fn delete_organization(&mut self, id: OrgId) -> StoreResult<()> {
        self.working.delete_organization(id)
    }

    async fn insert_account(&mut self, new: NewAccount) -> StoreResult<Account> {
        self.working.insert_account(new)
    }

    async fn save_account(&mut self, account: &Account) -> StoreResult<()> {
        self.working.save_account(account)
    }

    async fn delete_account(&mut self, id: UserId) -> StoreResult<()> {
        self.working.delete_account(id)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolmart_core::{AccountStatus, OrgType};

    fn new_org(name: &str, org_type: OrgType) -> NewOrganization {
        NewOrganization {
            name: name.to_string(),
            org_type,
            parent_id: OrgId::new(1),
            contact_name: String::new(),
            contact_phone: String::new(),
            address: String::new(),
            is_enabled: true,
        }
    }

    fn new_account(username: &str, created_by: UserId) -> NewAccount {
        NewAccount {
            org_id: OrgId::new(1),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            real_name: username.to_string(),
            mobile: String::new(),
            role_id: RoleId::new(1),
            status: AccountStatus::Active,
            created_by,
        }
    }

    #[tokio::test]
    async fn storage_rejects_duplicate_usernames() {
        let store = InMemoryStore::new();
        store.insert_account(new_account("alice", UserId::NONE)).await.unwrap();
        let err = store.insert_account(new_account("alice", UserId::NONE)).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_rows() {
        let store = InMemoryStore::new();
        store.insert_account(new_account("taken", UserId::NONE)).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_organization(new_org("Half School", OrgType::School)).await.unwrap();
            let err = tx.insert_account(new_account("taken", UserId::NONE)).await.unwrap_err();
            assert!(matches!(err, StoreError::UniqueViolation(_)));
        }

        let page = store
            .list_organizations(&OrganizationFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let org = tx.insert_organization(new_org("Acme Supplies", OrgType::Supplier)).await.unwrap();
        let admin = tx.insert_account(new_account("acme", UserId::new(1))).await.unwrap();
        tx.set_organization_admin(org.id, admin.id).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.find_organization(org.id).await.unwrap().unwrap();
        assert_eq!(stored.admin_user_id, admin.id);
    }

    #[tokio::test]
    async fn accounts_list_by_creator_in_id_order() {
        let store = InMemoryStore::new();
        let creator = UserId::new(99);
        for i in 0..15 {
            store.insert_account(new_account(&format!("staff{i}"), creator)).await.unwrap();
        }
        store.insert_account(new_account("other", UserId::new(5))).await.unwrap();

        let first = store
            .list_accounts_by_creator(creator, PageRequest::new(1, 10).unwrap())
            .await
            .unwrap();
        let second = store
            .list_accounts_by_creator(creator, PageRequest::new(2, 10).unwrap())
            .await
            .unwrap();

        assert_eq!(first.total, 15);
        assert_eq!(first.items.len(), 10);
        assert_eq!(second.items.len(), 5);
        assert!(first.items.windows(2).all(|w| w[0].id < w[1].id));
        assert!(first.items.last().unwrap().id < second.items[0].id);
    }

    #[tokio::test]
    async fn organizations_list_newest_first_and_keep_type() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let a = tx.insert_organization(new_org("A", OrgType::School)).await.unwrap();
        let b = tx.insert_organization(new_org("B", OrgType::School)).await.unwrap();
        tx.insert_organization(new_org("C", OrgType::Supplier)).await.unwrap();
        tx.commit().await.unwrap();

        let page = store
            .list_organizations(&OrganizationFilter::of_type(OrgType::School), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items.iter().map(|o| o.id).collect::<Vec<_>>(), vec![b.id, a.id]);

        let mut changed = a.clone();
        changed.org_type = OrgType::Merchant;
        changed.name = "A2".into();
        store.save_organization(&changed).await.unwrap();
        let stored = store.find_organization(a.id).await.unwrap().unwrap();
        assert_eq!(stored.org_type, OrgType::School);
        assert_eq!(stored.name, "A2");
    }

    #[tokio::test]
    async fn upsert_role_is_idempotent() {
        let store = InMemoryStore::new();
        let first = store.upsert_role(&RoleKey::SCHOOL_ADMIN, "School admin", true).await.unwrap();
        let again = store.upsert_role(&RoleKey::SCHOOL_ADMIN, "School administrator", true).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(store.list_roles().await.unwrap().len(), 1);
    }
}
