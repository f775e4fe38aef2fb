//! Postgres-backed store implementation.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `UniqueViolation` | Username (or role key) already taken |
//! | Database (other) | Any other | `Backend` | Check constraint, syntax, etc. |
//! | RowNotFound | N/A | `NotFound` | `fetch_one` on a missing row |
//! | PoolClosed | N/A | `Backend` | Connection pool was closed |
//! | Other | N/A | `Backend` | Network errors, decode failures, etc. |
//!
//! ## Thread Safety
//!
//! `PgStore` is `Send + Sync`; every call checks a connection out of the
//! shared pool. Transactions own one connection until commit/rollback.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Executor, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use schoolmart_core::{
    Account, AccountStatus, NewAccount, NewOpLog, NewOrganization, OpLog, OpLogId, OrgId, OrgType, Organization,
    Page, PageRequest, Role, RoleId, RoleKey, UserId,
};

use super::{
    AccountStore, OpLogStore, OrganizationFilter, OrganizationStore, RoleStore, StoreError, StoreResult,
    StoreTransaction, UnitOfWork,
};

/// Schema applied by [`PgStore::migrate`].
pub const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const ACCOUNT_COLUMNS: &str =
    "id, org_id, username, password_hash, real_name, mobile, role_id, status, created_by, created_at";

const ORGANIZATION_COLUMNS: &str = "id, name, org_type, parent_id, admin_user_id, contact_name, contact_phone, \
     address, is_enabled, created_at, updated_at";

/// Postgres implementation of every store trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountStore for PgStore {
    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_account(&self, id: UserId) -> StoreResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_account", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_account_by_username", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn find_accounts_by_ids(&self, ids: &[UserId]) -> StoreResult<Vec<Account>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(raw)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_accounts_by_ids", e))?;
        rows.iter().map(account_from_row).collect()
    }

    #[instrument(skip_all, fields(username = %new.username), err)]
    async fn insert_account(&self, new: NewAccount) -> StoreResult<Account> {
        insert_account_with(&*self.pool, new).await
    }

    #[instrument(skip_all, fields(user_id = %account.id), err)]
    async fn save_account(&self, account: &Account) -> StoreResult<()> {
        save_account_with(&*self.pool, account).await
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_account(&self, id: UserId) -> StoreResult<()> {
        delete_account_with(&*self.pool, id).await
    }

    #[instrument(skip(self), fields(creator = %creator), err)]
    async fn list_accounts_by_creator(&self, creator: UserId, page: PageRequest) -> StoreResult<Page<Account>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM users WHERE created_by = $1")
            .bind(creator.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_accounts", e))?
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_accounts", e))?;

        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE created_by = $1 ORDER BY id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(creator.get())
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_accounts_by_creator", e))?;

        let items = rows.iter().map(account_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Organizations
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl OrganizationStore for PgStore {
    #[instrument(skip(self), fields(org_id = %id), err)]
    async fn find_organization(&self, id: OrgId) -> StoreResult<Option<Organization>> {
        let row = sqlx::query(&format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_organization", e))?;
        row.as_ref().map(organization_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_organizations(
        &self,
        filter: &OrganizationFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Organization>> {
        let types: Vec<i16> = filter.org_types.iter().map(|t| t.code()).collect();
        let parent: Option<i64> = filter.parent_id.map(|p| p.get());

        let total: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM organizations
            WHERE (cardinality($1::smallint[]) = 0 OR org_type = ANY($1))
                AND ($2::bigint IS NULL OR parent_id = $2)
            "#,
        )
        .bind(&types)
        .bind(parent)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_organizations", e))?
        .try_get("total")
        .map_err(|e| map_sqlx_error("count_organizations", e))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORGANIZATION_COLUMNS}
            FROM organizations
            WHERE (cardinality($1::smallint[]) = 0 OR org_type = ANY($1))
                AND ($2::bigint IS NULL OR parent_id = $2)
            ORDER BY id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&types)
        .bind(parent)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_organizations", e))?;

        let items = rows.iter().map(organization_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64))
    }

    #[instrument(skip_all, fields(org_id = %org.id), err)]
    async fn save_organization(&self, org: &Organization) -> StoreResult<()> {
        save_organization_with(&*self.pool, org).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RoleStore for PgStore {
    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn find_role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        let row = sqlx::query("SELECT id, role_key, role_name, can_create_users FROM roles WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role", e))?;
        row.as_ref().map(role_from_row).transpose()
    }

    #[instrument(skip(self), fields(role_key = %key), err)]
    async fn find_role_by_key(&self, key: &RoleKey) -> StoreResult<Option<Role>> {
        let row = sqlx::query("SELECT id, role_key, role_name, can_create_users FROM roles WHERE role_key = $1")
            .bind(key.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_key", e))?;
        row.as_ref().map(role_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query("SELECT id, role_key, role_name, can_create_users FROM roles ORDER BY id ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        rows.iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), fields(role_key = %key), err)]
    async fn upsert_role(&self, key: &RoleKey, name: &str, can_create_users: bool) -> StoreResult<Role> {
        let row = sqlx::query(
            r#"
            INSERT INTO roles (role_key, role_name, can_create_users)
            VALUES ($1, $2, $3)
            ON CONFLICT (role_key)
            DO UPDATE SET role_name = EXCLUDED.role_name, can_create_users = EXCLUDED.can_create_users
            RETURNING id, role_key, role_name, can_create_users
            "#,
        )
        .bind(key.as_str())
        .bind(name)
        .bind(can_create_users)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_role", e))?;
        role_from_row(&row)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operation log
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl OpLogStore for PgStore {
    #[instrument(skip_all, fields(org_id = %entry.org_id, action = %entry.action), err)]
    async fn append_op_log(&self, entry: NewOpLog) -> StoreResult<OpLog> {
        let row = sqlx::query(
            r#"
            INSERT INTO op_logs (user_id, org_id, username, module, action, params, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.user_id.get())
        .bind(entry.org_id.get())
        .bind(&entry.username)
        .bind(&entry.module)
        .bind(&entry.action)
        .bind(&entry.params)
        .bind(entry.occurred_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_op_log", e))?;

        let id: i64 = row.try_get("id").map_err(|e| map_sqlx_error("append_op_log", e))?;
        Ok(entry.into_op_log(OpLogId::new(id)))
    }

    #[instrument(skip(self), fields(org_id = %org_id), err)]
    async fn list_op_logs(&self, org_id: OrgId, page: PageRequest) -> StoreResult<Page<OpLog>> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM op_logs WHERE org_id = $1")
            .bind(org_id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_op_logs", e))?
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_op_logs", e))?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, org_id, username, module, action, params, created_at
            FROM op_logs
            WHERE org_id = $1
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(org_id.get())
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_op_logs", e))?;

        let items = rows.iter().map(op_log_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UnitOfWork for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

/// A Postgres transaction. sqlx rolls back automatically when dropped.
struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn insert_organization(&mut self, new: NewOrganization) -> StoreResult<Organization> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO organizations
                (name, org_type, parent_id, admin_user_id, contact_name, contact_phone, address, is_enabled)
            VALUES ($1, $2, $3, 0, $4, $5, $6, $7)
            RETURNING {ORGANIZATION_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(new.org_type.code())
        .bind(new.parent_id.get())
        .bind(&new.contact_name)
        .bind(&new.contact_phone)
        .bind(&new.address)
        .bind(new.is_enabled)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_organization", e))?;
        organization_from_row(&row)
    }

    async fn set_organization_admin(&mut self, org_id: OrgId, admin: UserId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE organizations SET admin_user_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(org_id.get())
            .bind(admin.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_organization_admin", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("organization"));
        }
        Ok(())
    }

    async fn save_organization(&mut self, org: &Organization) -> StoreResult<()> {
        save_organization_with(&mut *self.tx, org).await
    }

    async fn delete_organization(&mut self, id: OrgId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_organization", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("organization"));
        }
        Ok(())
    }

    async fn insert_account(&mut self, new: NewAccount) -> StoreResult<Account> {
        insert_account_with(&mut *self.tx, new).await
    }

    async fn save_account(&mut self, account: &Account) -> StoreResult<()> {
        save_account_with(&mut *self.tx, account).await
    }

    async fn delete_account(&mut self, id: UserId) -> StoreResult<()> {
        delete_account_with(&mut *self.tx, id).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statements shared by the pool and transactions
// ─────────────────────────────────────────────────────────────────────────────

async fn insert_account_with<'e, E>(executor: E, new: NewAccount) -> StoreResult<Account>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO users (org_id, username, password_hash, real_name, mobile, role_id, status, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(new.org_id.get())
    .bind(&new.username)
    .bind(&new.password_hash)
    .bind(&new.real_name)
    .bind(&new.mobile)
    .bind(new.role_id.get())
    .bind(new.status.code())
    .bind(new.created_by.get())
    .fetch_one(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_account", e))?;
    account_from_row(&row)
}

async fn save_account_with<'e, E>(executor: E, account: &Account) -> StoreResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET org_id = $2, username = $3, password_hash = $4, real_name = $5,
            mobile = $6, role_id = $7, status = $8, created_by = $9
        WHERE id = $1
        "#,
    )
    .bind(account.id.get())
    .bind(account.org_id.get())
    .bind(&account.username)
    .bind(&account.password_hash)
    .bind(&account.real_name)
    .bind(&account.mobile)
    .bind(account.role_id.get())
    .bind(account.status.code())
    .bind(account.created_by.get())
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("save_account", e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("account"));
    }
    Ok(())
}

async fn delete_account_with<'e, E>(executor: E, id: UserId) -> StoreResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id.get())
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_error("delete_account", e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("account"));
    }
    Ok(())
}

async fn save_organization_with<'e, E>(executor: E, org: &Organization) -> StoreResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    // org_type is immutable, so it is deliberately absent from the SET list.
    let result = sqlx::query(
        r#"
        UPDATE organizations
        SET name = $2, parent_id = $3, admin_user_id = $4, contact_name = $5,
            contact_phone = $6, address = $7, is_enabled = $8, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(org.id.get())
    .bind(&org.name)
    .bind(org.parent_id.get())
    .bind(org.admin_user_id.get())
    .bind(&org.contact_name)
    .bind(&org.contact_phone)
    .bind(&org.address)
    .bind(org.is_enabled)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("save_organization", e))?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound("organization"));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Row decoding
// ─────────────────────────────────────────────────────────────────────────────

fn account_from_row(row: &PgRow) -> StoreResult<Account> {
    let decode = |e| map_sqlx_error("decode_account", e);
    let status: i16 = row.try_get("status").map_err(decode)?;
    Ok(Account {
        id: UserId::new(row.try_get("id").map_err(decode)?),
        org_id: OrgId::new(row.try_get("org_id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        real_name: row.try_get("real_name").map_err(decode)?,
        mobile: row.try_get("mobile").map_err(decode)?,
        role_id: RoleId::new(row.try_get("role_id").map_err(decode)?),
        status: AccountStatus::from_code(status)
            .map_err(|e| StoreError::backend("decode_account", e.to_string()))?,
        created_by: UserId::new(row.try_get("created_by").map_err(decode)?),
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn organization_from_row(row: &PgRow) -> StoreResult<Organization> {
    let decode = |e| map_sqlx_error("decode_organization", e);
    let org_type: i16 = row.try_get("org_type").map_err(decode)?;
    Ok(Organization {
        id: OrgId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        org_type: OrgType::from_code(org_type)
            .map_err(|e| StoreError::backend("decode_organization", e.to_string()))?,
        parent_id: OrgId::new(row.try_get("parent_id").map_err(decode)?),
        admin_user_id: UserId::new(row.try_get("admin_user_id").map_err(decode)?),
        contact_name: row.try_get("contact_name").map_err(decode)?,
        contact_phone: row.try_get("contact_phone").map_err(decode)?,
        address: row.try_get("address").map_err(decode)?,
        is_enabled: row.try_get("is_enabled").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

fn role_from_row(row: &PgRow) -> StoreResult<Role> {
    let decode = |e| map_sqlx_error("decode_role", e);
    let key: String = row.try_get("role_key").map_err(decode)?;
    Ok(Role {
        id: RoleId::new(row.try_get("id").map_err(decode)?),
        role_key: RoleKey::new(key),
        role_name: row.try_get("role_name").map_err(decode)?,
        can_create_users: row.try_get("can_create_users").map_err(decode)?,
    })
}

fn op_log_from_row(row: &PgRow) -> StoreResult<OpLog> {
    let decode = |e| map_sqlx_error("decode_op_log", e);
    Ok(OpLog {
        id: OpLogId::new(row.try_get("id").map_err(decode)?),
        user_id: UserId::new(row.try_get("user_id").map_err(decode)?),
        org_id: OrgId::new(row.try_get("org_id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        module: row.try_get("module").map_err(decode)?,
        action: row.try_get("action").map_err(decode)?,
        params: row.try_get("params").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

/// Map SQLx errors to store errors (see module docs).
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unique constraint").to_string();
                StoreError::UniqueViolation(constraint)
            } else {
                StoreError::backend(operation, format!("database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound("row"),
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        other => StoreError::backend(operation, other.to_string()),
    }
}
