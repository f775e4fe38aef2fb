//! Infrastructure layer: persistence adapters and the audit log queue.

pub mod audit;
pub mod store;

pub use audit::{AuditConfig, AuditLog, AuditStats, AuditWorkerHandle};
pub use store::{
    AccountStore, InMemoryStore, OpLogStore, OrganizationFilter, OrganizationStore, PgStore, RoleStore,
    StoreError, StoreResult, StoreTransaction, Stores, UnitOfWork,
};
