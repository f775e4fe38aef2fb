use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use schoolmart_api::app::{build_app, services::{AppServices, build_services}};
use schoolmart_api::config::AppConfig;

const ROOT_USERNAME: &str = "platform_admin";
const ROOT_PASSWORD: &str = "password123";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
    _services: AppServices,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        // Same router as prod over in-memory stores, bound to an ephemeral port.
        let config = AppConfig::for_tests(jwt_secret);
        let services = build_services(&config).await.expect("services start");
        let app = build_app(services.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
            _services: services,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/v1/system/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
    }

    /// Log in and return `(token, user_info)`.
    async fn session(&self, username: &str, password: &str) -> (String, Value) {
        let res = self.login(username, password).await;
        assert_eq!(res.status(), StatusCode::OK, "login as {username}");
        let body: Value = res.json().await.unwrap();
        (body["token"].as_str().unwrap().to_string(), body["user_info"].clone())
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).bearer_auth(token).json(&body).send().await.unwrap()
    }

    async fn put(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client.put(self.url(path)).bearer_auth(token).json(&body).send().await.unwrap()
    }

    async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).bearer_auth(token).send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, user_id: i64, role: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "user_id": user_id,
        "org_id": 1,
        "username": "intruder",
        "role": role,
        "iss": "schoolmart",
        "iat": now,
        "nbf": now,
        "exp": now + 600,
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn school_body(name: &str, admin: &str) -> Value {
    json!({
        "name": name,
        "contactName": "Principal",
        "contactPhone": "555-0100",
        "address": "1 School Road",
        "adminUsername": admin,
        "adminPassword": "school-pass",
        "adminRealName": "School Admin",
    })
}

fn supplier_body(name: &str, admin: &str) -> Value {
    json!({
        "name": name,
        "contactName": "Sales Desk",
        "contactPhone": "555-0200",
        "address": "2 Depot Lane",
        "username": admin,
        "password": "supplier-pass",
        "realName": "Supplier Admin",
    })
}

async fn logs_eventually(srv: &TestServer, token: &str, expected: usize) -> Vec<Value> {
    // Op-log writes are queued; poll briefly until the worker catches up.
    for _ in 0..50 {
        let body: Value = srv.get(token, "/api/v1/logs?pageSize=100").await.json().await.unwrap();
        let list = body["list"].as_array().cloned().unwrap_or_default();
        if list.len() >= expected {
            return list;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("op log entries did not appear within timeout");
}

#[tokio::test]
async fn public_routes_need_no_token() {
    let srv = TestServer::spawn("test-secret").await;

    let res = srv.client.get(srv.url("/ping")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "pong");

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn("test-secret").await;

    let res = srv.client.get(srv.url("/api/v1/system/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");

    let res = srv.get("not-a-jwt", "/api/v1/accounts").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let srv = TestServer::spawn("test-secret").await;

    let forged = mint_jwt("some-other-secret", 1, "platform_admin");
    let res = srv.get(&forged, "/api/v1/system/whoami").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Same secret and shape is accepted, which shows the rejection above is the signature.
    let genuine = mint_jwt("test-secret", 1, "platform_admin");
    let res = srv.get(&genuine, "/api/v1/system/whoami").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn root_login_yields_identity_from_the_store() {
    let srv = TestServer::spawn("test-secret").await;

    let res = srv.login(ROOT_USERNAME, ROOT_PASSWORD).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_info"]["username"], ROOT_USERNAME);
    assert_eq!(body["user_info"]["role"], "platform_admin");
    let token = body["token"].as_str().unwrap();

    let res = srv.get(token, "/api/v1/system/whoami").await;
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["user_id"], body["user_info"]["id"]);
    assert_eq!(me["org_id"], body["user_info"]["org_id"]);
    assert_eq!(me["role"], "platform_admin");
}

#[tokio::test]
async fn login_failures_do_not_say_which_field_was_wrong() {
    let srv = TestServer::spawn("test-secret").await;

    let wrong_password = srv.login(ROOT_USERNAME, "not-the-password").await;
    let unknown_user = srv.login("nobody_here", ROOT_PASSWORD).await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_user.json().await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a["message"], "username or password incorrect");
}

#[tokio::test]
async fn account_lifecycle_respects_delegation_and_ownership() {
    let srv = TestServer::spawn("test-secret").await;
    let (root, root_info) = srv.session(ROOT_USERNAME, ROOT_PASSWORD).await;

    // A roleId in the body is ignored; the subordinate role is derived.
    let res = srv
        .post(
            &root,
            "/api/v1/accounts",
            json!({ "username": "ops_staff", "password": "staff-pass", "realName": "Ops", "roleId": 1 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let staff: Value = res.json().await.unwrap();
    assert_eq!(staff["createdBy"], root_info["id"]);
    assert_eq!(staff["orgId"], root_info["org_id"]);
    assert!(staff.get("passwordHash").is_none());
    let staff_id = staff["id"].as_i64().unwrap();

    let res = srv
        .post(&root, "/api/v1/accounts", json!({ "username": "ops_staff", "password": "staff-pass", "realName": "Dup" }))
        .await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let listed: Value = srv.get(&root, "/api/v1/accounts").await.json().await.unwrap();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["list"][0]["username"], "ops_staff");

    let (staff_token, staff_info) = srv.session("ops_staff", "staff-pass").await;
    assert_eq!(staff_info["role"], "platform_staff");

    // Staff cannot delegate and cannot touch accounts they did not create.
    let res = srv
        .post(&staff_token, "/api/v1/accounts", json!({ "username": "x1", "password": "secret1", "realName": "X" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "role_not_delegating");

    let res = srv.put(&staff_token, &format!("/api/v1/accounts/{staff_id}"), json!({ "realName": "Me" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // The creator can lock it; the locked account can no longer log in.
    let res = srv.put(&root, &format!("/api/v1/accounts/{staff_id}/status"), json!({ "status": 2 })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = srv.login("ops_staff", "staff-pass").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .put(&root, &format!("/api/v1/accounts/{staff_id}/password"), json!({ "password": "fresh-pass" }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.delete(&root, &format!("/api/v1/accounts/{staff_id}")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = srv.delete(&root, &format!("/api/v1/accounts/{staff_id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let srv = TestServer::spawn("test-secret").await;
    let (root, _) = srv.session(ROOT_USERNAME, ROOT_PASSWORD).await;

    let res = srv
        .post(&root, "/api/v1/accounts", json!({ "username": "short_pw", "password": "123", "realName": "X" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/api/v1/accounts"))
        .bearer_auth(&root)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.put(&root, "/api/v1/accounts/abc/status", json!({ "status": 1 })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.get(&root, "/api/v1/accounts?pageSize=1000").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn school_routes_require_a_platform_role() {
    let srv = TestServer::spawn("test-secret").await;
    let (root, _) = srv.session(ROOT_USERNAME, ROOT_PASSWORD).await;

    let res = srv.post(&root, "/api/v1/schools", school_body("North High", "north_admin")).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let school: Value = res.json().await.unwrap();
    assert_eq!(school["orgType"], 2);
    assert_eq!(school["adminUser"]["username"], "north_admin");
    let school_id = school["id"].as_i64().unwrap();

    let listed: Value = srv.get(&root, "/api/v1/schools").await.json().await.unwrap();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["list"][0]["adminUsername"], "north_admin");

    let detail: Value = srv.get(&root, &format!("/api/v1/schools/{school_id}")).await.json().await.unwrap();
    assert_eq!(detail["adminUser"]["realName"], "School Admin");

    // The school admin is not a platform role, but can delegate within the school.
    let (school_token, school_info) = srv.session("north_admin", "school-pass").await;
    assert_eq!(school_info["role"], "school_admin");
    assert_eq!(school_info["org_id"], school_id);

    let res = srv.get(&school_token, "/api/v1/schools").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv.post(&school_token, "/api/v1/schools", school_body("Rogue", "rogue_admin")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .post(&school_token, "/api/v1/accounts", json!({ "username": "north_clerk", "password": "clerk-pass", "realName": "Clerk" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let (_, clerk_info) = srv.session("north_clerk", "clerk-pass").await;
    assert_eq!(clerk_info["role"], "school_staff");
    assert_eq!(clerk_info["org_id"], school_id);

    let res = srv
        .put(
            &root,
            &format!("/api/v1/schools/{school_id}"),
            json!({ "name": "North High School", "isEnabled": false }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "North High School");
    assert_eq!(updated["isEnabled"], false);

    let res = srv.delete(&root, &format!("/api/v1/schools/{school_id}")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = srv.login("north_admin", "school-pass").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn supplier_lifecycle() {
    let srv = TestServer::spawn("test-secret").await;
    let (root, root_info) = srv.session(ROOT_USERNAME, ROOT_PASSWORD).await;
    let platform_id = root_info["org_id"].as_i64().unwrap();

    let res = srv.post(&root, "/api/v1/suppliers", supplier_body("Paper Co", "paper_admin")).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let supplier: Value = res.json().await.unwrap();
    assert_eq!(supplier["parentId"], platform_id);
    let id = supplier["id"].as_i64().unwrap();

    let res = srv.post(&root, "/api/v1/suppliers", supplier_body("Ink Co", "paper_admin")).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let listed: Value = srv
        .get(&root, &format!("/api/v1/suppliers?parentId={platform_id}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed["total"], 1);
    let listed: Value = srv.get(&root, "/api/v1/suppliers?parentId=999999").await.json().await.unwrap();
    assert_eq!(listed["total"], 0);

    let res = srv
        .put(
            &root,
            &format!("/api/v1/suppliers/{id}"),
            json!({
                "name": "Paper & Co",
                "contactName": "Front Desk",
                "contactPhone": "555-0300",
                "realName": "Renamed Admin",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let detail: Value = srv.get(&root, &format!("/api/v1/suppliers/{id}")).await.json().await.unwrap();
    assert_eq!(detail["name"], "Paper & Co");
    assert_eq!(detail["adminUser"]["realName"], "Renamed Admin");

    let res = srv.put(&root, &format!("/api/v1/suppliers/{id}/status"), json!({ "isEnabled": false })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["isEnabled"], false);

    // A supplier id is not a school.
    let res = srv.get(&root, &format!("/api/v1/schools/{id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv.delete(&root, &format!("/api/v1/suppliers/{id}")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = srv.get(&root, &format!("/api/v1/suppliers/{id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mutations_are_logged_without_passwords() {
    let srv = TestServer::spawn("test-secret").await;
    let (root, root_info) = srv.session(ROOT_USERNAME, ROOT_PASSWORD).await;

    let res = srv
        .post(&root, "/api/v1/accounts", json!({ "username": "audited", "password": "hunter2hunter2", "realName": "A" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    // Reads are not logged.
    let _ = srv.get(&root, "/api/v1/accounts").await;

    let logs = logs_eventually(&srv, &root, 1).await;
    assert_eq!(logs.len(), 1);
    let entry = &logs[0];
    assert_eq!(entry["module"], "/api/v1/accounts");
    assert_eq!(entry["action"], "POST");
    assert_eq!(entry["username"], ROOT_USERNAME);
    assert_eq!(entry["orgId"], root_info["org_id"]);
    let params = entry["params"].as_str().unwrap();
    assert!(params.contains("audited"));
    assert!(!params.contains("hunter2hunter2"));
}
