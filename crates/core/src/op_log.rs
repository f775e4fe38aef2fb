//! Append-only operation log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OpLogId, OrgId, UserId};

/// A persisted audit entry for one mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpLog {
    pub id: OpLogId,
    pub user_id: UserId,
    pub org_id: OrgId,
    pub username: String,
    /// Route the request matched (e.g. `/api/v1/accounts/:id`).
    pub module: String,
    /// HTTP method.
    pub action: String,
    /// Request body with secrets redacted.
    pub params: String,
    pub created_at: DateTime<Utc>,
}

/// An audit entry waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOpLog {
    pub user_id: UserId,
    pub org_id: OrgId,
    pub username: String,
    pub module: String,
    pub action: String,
    pub params: String,
    pub occurred_at: DateTime<Utc>,
}

impl NewOpLog {
    pub fn into_op_log(self, id: OpLogId) -> OpLog {
        OpLog {
            id,
            user_id: self.user_id,
            org_id: self.org_id,
            username: self.username,
            module: self.module,
            action: self.action,
            params: self.params,
            created_at: self.occurred_at,
        }
    }
}
