//! `schoolmart-core`: ids, errors, domain records and pagination.
//!
//! This crate contains **pure domain** records and primitives (no storage,
//! no transport, no crypto).

pub mod account;
pub mod error;
pub mod id;
pub mod op_log;
pub mod organization;
pub mod page;
pub mod role;

pub use account::{Account, AccountStatus, NewAccount};
pub use error::{DomainError, DomainResult};
pub use id::{OpLogId, OrgId, RoleId, UserId};
pub use op_log::{NewOpLog, OpLog};
pub use organization::{NewOrganization, OrgType, Organization};
pub use page::{Page, PageRequest};
pub use role::{Role, RoleKey};
