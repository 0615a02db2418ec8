use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use reqwest::StatusCode;
use serde_json::json;

use akademi_api::app::{build_app, AppServices};
use akademi_auth::{PermissionPolicy, TokenIssuer};
use akademi_core::UserId;
use akademi_registry::model::ApprovalStatus;
use akademi_registry::InMemoryStore;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    store: Arc<InMemoryStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod, bound to an ephemeral port, with a handle on the
    /// backing store so tests can seed approval records.
    async fn spawn() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let tokens = Arc::new(TokenIssuer::new(JWT_SECRET.as_bytes()));
        let services =
            AppServices::from_store(store.clone(), tokens, PermissionPolicy::AllowAll);
        let app = build_app(services);

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
            store,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn register(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{base_url}/auth/register"))
        .json(&json!({
            "email": email,
            "password": password,
            "full_name": "Test User",
        }))
        .send()
        .await
        .unwrap()
}

async fn login_token(client: &reqwest::Client, base_url: &str, email: &str, password: &str) -> (String, String) {
    let res = client
        .post(format!("{base_url}/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    (
        body["data"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_needs_no_auth() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_bearer() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/roles", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/roles", srv.base_url))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_and_duplicate_email() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "alice@example.com", "password123").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["is_active"], json!(true));
    assert!(body["data"].get("password_hash").is_none());

    let res = register(&client, &srv.base_url, "alice@example.com", "password123").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_password_is_indistinguishable_and_repeatable() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv.base_url, "alice@example.com", "password123").await;

    let mut messages = Vec::new();
    for _ in 0..3 {
        let res = client
            .post(format!("{}/auth/login", srv.base_url))
            .json(&json!({ "email": "alice@example.com", "password": "wrong-pass" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = res.json().await.unwrap();
        messages.push(body["message"].as_str().unwrap().to_string());
    }
    assert!(messages.windows(2).all(|w| w[0] == w[1]));

    // Unknown email yields the very same message.
    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "nobody@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"].as_str().unwrap(), messages[0]);
}

#[tokio::test]
async fn pending_approval_blocks_login_with_specific_message() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "alice@example.com", "password123").await;
    let body: serde_json::Value = res.json().await.unwrap();
    let user_id: UserId = body["data"]["id"].as_str().unwrap().parse().unwrap();

    srv.store.set_approval(user_id, ApprovalStatus::Pending);

    let res = client
        .post(format!("{}/auth/login", srv.base_url))
        .json(&json!({ "email": "alice@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("awaiting"));
}

#[tokio::test]
async fn role_permission_set_replacement_end_to_end() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv.base_url, "admin@example.com", "password123").await;
    let (token, _) = login_token(&client, &srv.base_url, "admin@example.com", "password123").await;

    let mut permission_ids = Vec::new();
    for action in ["read", "write"] {
        let res = client
            .post(format!("{}/permissions", srv.base_url))
            .bearer_auth(&token)
            .json(&json!({ "resource": "classes", "action": action }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: serde_json::Value = res.json().await.unwrap();
        permission_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let res = client
        .post(format!("{}/roles", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "teacher",
            "display_name": "Teacher",
            "permission_ids": permission_ids,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    let role_id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{}/roles/{role_id}", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let got: Vec<&str> = body["data"]["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(got.len(), 2);
    assert!(permission_ids.iter().all(|id| got.contains(&id.as_str())));

    // Explicit empty set clears the permissions.
    let res = client
        .put(format!("{}/roles/{role_id}", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "permission_ids": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/roles/{role_id}", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["data"]["permissions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn adding_the_same_member_twice_conflicts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "admin@example.com", "password123").await;
    let body: serde_json::Value = res.json().await.unwrap();
    let admin_id = body["data"]["id"].as_str().unwrap().to_string();
    let (token, _) = login_token(&client, &srv.base_url, "admin@example.com", "password123").await;

    let res = register(&client, &srv.base_url, "bob@example.com", "password123").await;
    let body: serde_json::Value = res.json().await.unwrap();
    let bob_id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/organizations", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "owner_id": admin_id, "name": "Yayasan Satu", "code": "YS-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    let org_id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/roles", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "staff", "display_name": "Staff" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let role_id = body["data"]["id"].as_str().unwrap().to_string();

    let add = json!({ "user_id": bob_id, "role_id": role_id });
    let res = client
        .post(format!("{}/organizations/{org_id}/members", srv.base_url))
        .bearer_auth(&token)
        .json(&add)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // Same pair again, even with a different role, conflicts.
    let res = client
        .post(format!("{}/organizations/{org_id}/members", srv.base_url))
        .bearer_auth(&token)
        .json(&add)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn member_mutations_are_scoped_to_the_addressed_organization() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "admin@example.com", "password123").await;
    let body: serde_json::Value = res.json().await.unwrap();
    let admin_id = body["data"]["id"].as_str().unwrap().to_string();
    let (token, _) = login_token(&client, &srv.base_url, "admin@example.com", "password123").await;

    let res = register(&client, &srv.base_url, "bob@example.com", "password123").await;
    let body: serde_json::Value = res.json().await.unwrap();
    let bob_id = body["data"]["id"].as_str().unwrap().to_string();

    let mut org_ids = Vec::new();
    for (name, code) in [("Yayasan Satu", "YS-01"), ("Yayasan Dua", "YS-02")] {
        let res = client
            .post(format!("{}/organizations", srv.base_url))
            .bearer_auth(&token)
            .json(&json!({ "owner_id": admin_id, "name": name, "code": code }))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = res.json().await.unwrap();
        org_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let res = client
        .post(format!("{}/roles", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "staff", "display_name": "Staff" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let role_id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/organizations/{}/members", srv.base_url, org_ids[0]))
        .bearer_auth(&token)
        .json(&json!({ "user_id": bob_id, "role_id": role_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    let member_id = body["data"]["id"].as_str().unwrap().to_string();

    // The first organization's membership is unreachable through the second.
    let res = client
        .put(format!(
            "{}/organizations/{}/members/{member_id}",
            srv.base_url, org_ids[1]
        ))
        .bearer_auth(&token)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(format!(
            "{}/organizations/{}/members/{member_id}",
            srv.base_url, org_ids[1]
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Through the owning organization the same mutation succeeds.
    let res = client
        .put(format!(
            "{}/organizations/{}/members/{member_id}",
            srv.base_url, org_ids[0]
        ))
        .bearer_auth(&token)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["is_active"], json!(false));
}

#[tokio::test]
async fn refresh_rejects_expired_and_preserves_identity() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "alice@example.com", "password123").await;
    let body: serde_json::Value = res.json().await.unwrap();
    let user_id = body["data"]["id"].as_str().unwrap().to_string();
    let (_, refresh_token) =
        login_token(&client, &srv.base_url, "alice@example.com", "password123").await;

    // An already-expired token signed with the right secret is still refused.
    let expired = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({ "user_id": user_id, "exp": (Utc::now().timestamp() - 60) }),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "refresh_token": expired }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // A live refresh token yields a pair bound to the same user.
    let res = client
        .post(format!("{}/auth/refresh", srv.base_url))
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let access = body["data"]["access_token"].as_str().unwrap();

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp"]);
    let decoded = jsonwebtoken::decode::<serde_json::Value>(
        access,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &validation,
    )
    .unwrap();
    assert_eq!(decoded.claims["user_id"].as_str().unwrap(), user_id);
}

#[tokio::test]
async fn memberships_view_reflects_enrollment() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv.base_url, "alice@example.com", "password123").await;
    let body: serde_json::Value = res.json().await.unwrap();
    let alice_id = body["data"]["id"].as_str().unwrap().to_string();
    let (token, _) = login_token(&client, &srv.base_url, "alice@example.com", "password123").await;

    let res = client
        .post(format!("{}/organizations", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "owner_id": alice_id, "name": "Yayasan Satu", "code": "YS-01" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let org_id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(format!("{}/roles", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "name": "admin", "display_name": "Admin" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    let role_id = body["data"]["id"].as_str().unwrap().to_string();

    client
        .post(format!("{}/organizations/{org_id}/members", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "user_id": alice_id, "role_id": role_id }))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{}/users/me/memberships", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let orgs = body["data"]["organization_memberships"].as_array().unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0]["role_name"].as_str().unwrap(), "admin");
    assert!(body["data"]["unit_memberships"].as_array().unwrap().is_empty());
}
