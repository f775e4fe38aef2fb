use serde::Deserialize;
use serde_json::{Value, json};

use schoolmart_admin::{CreatedOrganization, LoginResult, OrganizationDetails, OrganizationSummary};
use schoolmart_core::{Account, DomainResult, OpLog, OrgId, Organization, Page, PageRequest};

// -------------------------
// Query DTOs
// -------------------------

/// `?page=&pageSize=&parentId=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub parent_id: Option<i64>,
}

impl ListQuery {
    pub fn page_request(&self) -> DomainResult<PageRequest> {
        PageRequest::from_query(self.page, self.page_size)
    }

    /// A zero or absent parent means "no filter".
    pub fn parent(&self) -> Option<OrgId> {
        self.parent_id.filter(|id| *id > 0).map(OrgId::new)
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn account_to_json(a: &Account) -> Value {
    json!({
        "id": a.id,
        "orgId": a.org_id,
        "username": a.username,
        "realName": a.real_name,
        "mobile": a.mobile,
        "roleId": a.role_id,
        "status": a.status.code(),
        "createdBy": a.created_by,
        "createdAt": a.created_at.to_rfc3339(),
    })
}

pub fn organization_to_json(o: &Organization) -> Value {
    json!({
        "id": o.id,
        "name": o.name,
        "orgType": o.org_type.code(),
        "parentId": o.parent_id,
        "adminUserId": o.admin_user_id,
        "contactName": o.contact_name,
        "contactPhone": o.contact_phone,
        "address": o.address,
        "isEnabled": o.is_enabled,
        "createdAt": o.created_at.to_rfc3339(),
        "updatedAt": o.updated_at.to_rfc3339(),
    })
}

pub fn summary_to_json(s: &OrganizationSummary) -> Value {
    let mut v = organization_to_json(&s.organization);
    v["adminUsername"] = json!(s.admin_username);
    v
}

pub fn details_to_json(d: &OrganizationDetails) -> Value {
    let mut v = organization_to_json(&d.organization);
    v["adminUser"] = match &d.admin {
        Some(admin) => json!({ "username": admin.username, "realName": admin.real_name }),
        None => Value::Null,
    };
    v
}

pub fn created_to_json(c: &CreatedOrganization) -> Value {
    let mut v = organization_to_json(&c.organization);
    v["adminUser"] = account_to_json(&c.admin);
    v
}

pub fn op_log_to_json(l: &OpLog) -> Value {
    json!({
        "id": l.id,
        "userId": l.user_id,
        "orgId": l.org_id,
        "username": l.username,
        "module": l.module,
        "action": l.action,
        "params": l.params,
        "createdAt": l.created_at.to_rfc3339(),
    })
}

pub fn page_to_json<T>(page: &Page<T>, req: PageRequest, f: impl Fn(&T) -> Value) -> Value {
    json!({
        "list": page.items.iter().map(f).collect::<Vec<_>>(),
        "total": page.total,
        "page": req.page(),
        "pageSize": req.page_size(),
    })
}

/// Login response; `user_info` keys stay snake_case for existing clients.
pub fn login_to_json(r: &LoginResult) -> Value {
    json!({
        "token": r.token,
        "expiresAt": r.claims.expires_at.to_rfc3339(),
        "user_info": {
            "id": r.user_info.id,
            "username": r.user_info.username,
            "real_name": r.user_info.real_name,
            "role": r.user_info.role,
            "org_id": r.user_info.org_id,
        },
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use schoolmart_core::{AccountStatus, NewAccount, RoleId, UserId};

    #[test]
    fn account_json_never_carries_the_hash() {
        let account = NewAccount {
            org_id: OrgId::new(1),
            username: "school_clerk".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            real_name: "Clerk".into(),
            mobile: String::new(),
            role_id: RoleId::new(4),
            status: AccountStatus::Active,
            created_by: UserId::new(2),
        }
        .into_account(UserId::new(9), Utc::now());

        let v = account_to_json(&account);
        assert_eq!(v["id"], 9);
        assert_eq!(v["createdBy"], 2);
        assert_eq!(v["status"], 1);
        assert!(!v.to_string().contains("argon2"));
    }

    #[test]
    fn list_query_treats_zero_parent_as_unfiltered() {
        let q = ListQuery {
            parent_id: Some(0),
            ..ListQuery::default()
        };
        assert_eq!(q.parent(), None);
        assert_eq!(q.page_request().unwrap(), PageRequest::default());
    }
}
