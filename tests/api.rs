//! HTTP tests over the full router backed by the in-memory user store.

use accounts_api::{app::build_app, config::AppConfig, state::AppState};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let config = AppConfig::from_lookup(|key| match key {
        "SECRET_KEY" => Some("integration-secret".into()),
        "DATABASE_URL" => Some("postgres://unused@localhost/unused".into()),
        "PROJECT_NAME" => Some("Accounts Test".into()),
        _ => None,
    })
    .expect("test config");
    build_app(AppState::in_memory(config))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn bare_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn register(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            Method::POST,
            "/api/v1/users/",
            None,
            json!({ "email": email, "password": password }),
        ),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    let form = format!(
        "username={}&password={}",
        email.replace('@', "%40"),
        password
    );
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/login/access-token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    send(app, req).await
}

async fn token_for(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = login(app, email, password).await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_welcome() {
    let app = app();
    let (status, body) = send(&app, bare_request(Method::GET, "/api/v1/meta/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "OK" }));

    let (status, body) = send(&app, bare_request(Method::GET, "/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Accounts Test");
}

#[tokio::test]
async fn register_login_and_read_me() {
    let app = app();

    let (status, user) = register(&app, "a@x.com", "longenough1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(user["id"].is_i64());
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["is_active"], true);
    assert_eq!(user["is_superuser"], false);
    assert!(user.get("hashed_password").is_none());
    assert!(user.get("password").is_none());

    let (status, body) = login(&app, "a@x.com", "longenough1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap();
    assert!(!token.is_empty());

    let (status, me) = send(&app, bare_request(Method::GET, "/api/v1/users/me", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@x.com");
    assert_eq!(me["id"], user["id"]);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = app();
    let (first, _) = register(&app, "a@x.com", "longenough1").await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = register(&app, "a@x.com", "anotherpass").await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "The user with this email already exists in the system."
    );
}

#[tokio::test]
async fn invalid_registration_is_unprocessable() {
    let app = app();
    let (status, body) = register(&app, "a@x.com", "short").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("password"));

    let (status, _) = register(&app, "not-an-email", "longenough1").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app();
    for uri in ["/api/v1/users/", "/api/v1/users/me", "/api/v1/users/1"] {
        let (status, body) = send(&app, bare_request(Method::GET, uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body["detail"].is_string());

        let (status, _) = send(&app, bare_request(Method::GET, uri, Some("garbage"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let app = app();
    register(&app, "a@x.com", "longenough1").await;

    let (status, wrong_password) = login(&app, "a@x.com", "wrongpass1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, unknown_email) = login(&app, "nobody@x.com", "longenough1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(wrong_password["detail"], "Incorrect email or password");
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn inactive_user_cannot_log_in() {
    let app = app();
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/",
            None,
            json!({ "email": "idle@x.com", "password": "longenough1", "is_active": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = login(&app, "idle@x.com", "longenough1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Inactive user");
}

#[tokio::test]
async fn other_users_resources_are_forbidden() {
    let app = app();
    let (_, a) = register(&app, "a@x.com", "longenough1").await;
    let (_, b) = register(&app, "b@x.com", "longenough1").await;
    assert_ne!(a["id"], b["id"]);
    let token_a = token_for(&app, "a@x.com", "longenough1").await;
    let b_uri = format!("/api/v1/users/{}", b["id"]);

    let requests = [
        bare_request(Method::GET, &b_uri, Some(token_a.as_str())),
        json_request(
            Method::PUT,
            &b_uri,
            Some(token_a.as_str()),
            json!({ "full_name": "Mallory" }),
        ),
        bare_request(Method::DELETE, &b_uri, Some(token_a.as_str())),
        bare_request(Method::GET, "/api/v1/users/9999", Some(token_a.as_str())),
    ];
    for req in requests {
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(!body.to_string().contains("b@x.com"));
    }

    // B is untouched
    let token_b = token_for(&app, "b@x.com", "longenough1").await;
    let (status, b_after) = send(
        &app,
        bare_request(Method::GET, &b_uri, Some(token_b.as_str())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(b_after["full_name"].is_null());
}

#[tokio::test]
async fn owner_updates_and_deletes_own_account() {
    let app = app();
    let (_, a) = register(&app, "a@x.com", "longenough1").await;
    let token = token_for(&app, "a@x.com", "longenough1").await;
    let uri = format!("/api/v1/users/{}", a["id"]);

    let (status, updated) = send(
        &app,
        json_request(
            Method::PUT,
            &uri,
            Some(token.as_str()),
            json!({ "full_name": "Ada Lovelace" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["full_name"], "Ada Lovelace");
    assert_eq!(updated["email"], "a@x.com");
    assert!(updated["updated_at"].is_string());

    let (status, deleted) = send(
        &app,
        bare_request(Method::DELETE, &uri, Some(token.as_str())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["full_name"], "Ada Lovelace");
    assert!(deleted.get("hashed_password").is_none());

    // the token's subject is gone
    let (status, _) = send(
        &app,
        bare_request(Method::GET, "/api/v1/users/me", Some(token.as_str())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn changing_email_to_a_taken_one_conflicts() {
    let app = app();
    register(&app, "a@x.com", "longenough1").await;
    let (_, b) = register(&app, "b@x.com", "longenough1").await;
    let token_b = token_for(&app, "b@x.com", "longenough1").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/v1/users/{}", b["id"]),
            Some(token_b.as_str()),
            json!({ "email": "a@x.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "The user with this email already exists in the system."
    );
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let app = app();
    register(&app, "a@x.com", "longenough1").await;
    let token = token_for(&app, "a@x.com", "longenough1").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/me/password",
            Some(token.as_str()),
            json!({ "current_password": "notmypassword", "new_password": "brandnew99" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Incorrect current password");
    let (status, _) = login(&app, "a@x.com", "longenough1").await;
    assert_eq!(status, StatusCode::OK, "stored hash must be unchanged");

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/me/password",
            Some(token.as_str()),
            json!({ "current_password": "longenough1", "new_password": "brandnew99" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Password updated successfully");

    let (status, _) = login(&app, "a@x.com", "brandnew99").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = login(&app, "a@x.com", "longenough1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_users_pages_in_id_order() {
    let app = app();
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        register(&app, email, "longenough1").await;
    }
    let token = token_for(&app, "c@x.com", "longenough1").await;

    let (status, all) = send(
        &app,
        bare_request(Method::GET, "/api/v1/users/", Some(token.as_str())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let emails: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);

    let (status, page) = send(
        &app,
        bare_request(Method::GET, "/api/v1/users?skip=1&limit=1", Some(token.as_str())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["email"], "b@x.com");
}

#[tokio::test]
async fn malformed_path_query_and_form_answer_json_422() {
    let app = app();
    register(&app, "a@x.com", "longenough1").await;
    let token = token_for(&app, "a@x.com", "longenough1").await;

    for uri in ["/api/v1/users/abc", "/api/v1/users?limit=abc"] {
        let (status, body) = send(&app, bare_request(Method::GET, uri, Some(token.as_str()))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert!(body["detail"].is_string(), "{uri}: {body}");
    }

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/login/access-token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=a%40x.com"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn explicit_null_clears_full_name() {
    let app = app();
    let (status, a) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/users/",
            None,
            json!({ "email": "a@x.com", "password": "longenough1", "full_name": "Ada" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = token_for(&app, "a@x.com", "longenough1").await;
    let uri = format!("/api/v1/users/{}", a["id"]);

    let (status, kept) = send(
        &app,
        json_request(Method::PUT, &uri, Some(token.as_str()), json!({ "is_active": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kept["full_name"], "Ada");

    let (status, cleared) = send(
        &app,
        json_request(Method::PUT, &uri, Some(token.as_str()), json!({ "full_name": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["full_name"].is_null());
}
