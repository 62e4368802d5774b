//! Drives the router end to end against a seeded in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use marketplace_api::{
    db::SqliteStore, marketplace::Marketplace, memory::MemoryStore, router, seed,
    store::RecordStore, AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn app_with(store: Arc<dyn RecordStore>) -> Router {
    let market = Marketplace::new(store);
    seed::seed_demo(&market).expect("seed");
    router(AppState {
        market,
        jwt_secret: SECRET.to_string(),
    })
}

fn app() -> Router {
    app_with(Arc::new(MemoryStore::new()))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token").to_string()
}

fn titles(body: &Value) -> Vec<&str> {
    body.as_array()
        .expect("array")
        .iter()
        .map(|p| p["title"].as_str().expect("title"))
        .collect()
}

#[tokio::test]
async fn health_and_catalog() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (_, catalog) = send(&app, Method::GET, "/api/catalog", None, None).await;
    assert_eq!(catalog["tags"], json!(["goods", "services", "education", "money", "general"]));
    assert_eq!(catalog["statuses"], json!(["Available", "Pending", "Completed", "Sold"]));
}

#[tokio::test]
async fn listing_is_newest_first_and_filterable() {
    let app = app();

    let (status, all) = send(&app, Method::GET, "/api/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        titles(&all),
        vec!["Selling Chair - $10", "Ride to city - 6 PM", "Old Lamp - $5"]
    );

    let (_, unfiltered) = send(&app, Method::GET, "/api/posts?search=&tag=all&status=all", None, None).await;
    assert_eq!(unfiltered, all);

    let (_, chair) = send(&app, Method::GET, "/api/posts?search=CHAIR", None, None).await;
    assert_eq!(titles(&chair), vec!["Selling Chair - $10"]);

    // the term is matched as sent, surrounding spaces included
    let (_, spaced) = send(&app, Method::GET, "/api/posts?search=Lamp%20%20", None, None).await;
    assert_eq!(spaced, json!([]));

    let (_, services) = send(&app, Method::GET, "/api/posts?tag=services", None, None).await;
    assert_eq!(titles(&services), vec!["Ride to city - 6 PM"]);
    assert_eq!(services[0]["type"], "Service");
    assert_eq!(services[0]["time"], "6 PM");
    assert!(services[0].get("price").is_none());
}

#[tokio::test]
async fn unknown_post_is_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/posts/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "post 999 not found");
}

#[tokio::test]
async fn login_rejects_bad_passwords() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "maria4b", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_then_me_and_duplicate_names_conflict() {
    let app = app();
    let signup = json!({ "username": "neighbor7c", "password": "pw", "display_name": "neighbor#7777" });

    let (status, body) = send(&app, Method::POST, "/api/auth/signup", None, Some(signup.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");
    let token = body["token"].as_str().unwrap().to_string();

    let (_, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(me["username"], "neighbor7c");
    assert_eq!(me["display_name"], "neighbor#7777");

    let (status, _) = send(&app, Method::POST, "/api/auth/signup", None, Some(signup)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn creating_needs_a_session_and_valid_input() {
    let app = app();
    let listing = json!({
        "title": "Math tutoring",
        "description": "Algebra and geometry for middle schoolers",
        "type": "Service",
        "time": "Weekends",
        "tag": "education"
    });

    let (status, _) = send(&app, Method::POST, "/api/posts", None, Some(listing.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "john12a", "password123").await;
    let (status, post) = send(&app, Method::POST, "/api/posts", Some(&token), Some(listing)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["posted_by"], "john12a");
    assert_eq!(post["status"], "Available");
    assert_eq!(post["thumbs_up"], 0);
    assert_eq!(post["thumbs_up_by"], json!([]));
    assert_eq!(post["comments"], json!([]));

    let too_long = json!({
        "title": "x".repeat(51),
        "description": "fine",
        "type": "For Sale",
        "price": "3"
    });
    let (status, _) = send(&app, Method::POST, "/api/posts", Some(&token), Some(too_long)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ampersands_survive_create_and_search() {
    let app = app();
    let token = login(&app, "john12a", "password123").await;
    let listing = json!({
        "title": "Tom & Jerry DVDs <b>boxed</b>",
        "description": "Seasons 1 & 2",
        "type": "For Sale",
        "price": "4"
    });
    let (status, post) = send(&app, Method::POST, "/api/posts", Some(&token), Some(listing)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["title"], "Tom & Jerry DVDs boxed");
    assert_eq!(post["description"], "Seasons 1 & 2");

    let (_, found) = send(&app, Method::GET, "/api/posts?search=Tom%20%26%20J", None, None).await;
    assert_eq!(titles(&found), vec!["Tom & Jerry DVDs boxed"]);

    let (_, comment) = send(
        &app,
        Method::POST,
        &format!("/api/posts/{}/comments", post["id"]),
        Some(&token),
        Some(json!({ "text": "Salt & pepper shakers too?" })),
    )
    .await;
    assert_eq!(comment["text"], "Salt & pepper shakers too?");
}

#[tokio::test]
async fn reactions_toggle_for_the_caller() {
    let app = app();
    let token = login(&app, "maria4b", "password123").await;

    // post 2 is the ride, which maria already likes
    let (status, first) = send(&app, Method::POST, "/api/posts/2/reactions", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, json!({ "thumbs_up": 0, "reacted": false }));

    let (_, second) = send(&app, Method::POST, "/api/posts/2/reactions", Some(&token), None).await;
    assert_eq!(second, json!({ "thumbs_up": 1, "reacted": true }));

    let (status, _) = send(&app, Method::POST, "/api/posts/42/reactions", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_continue_the_numbering() {
    let app = app();
    let token = login(&app, "maria4b", "password123").await;

    // post 3 is the chair, which already has one comment
    let (status, comment) = send(
        &app,
        Method::POST,
        "/api/posts/3/comments",
        Some(&token),
        Some(json!({ "text": "Yes, still available" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["id"], 2);
    assert_eq!(comment["posted_by"], "maria4b");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/posts/3/comments",
        Some(&token),
        Some(json!({ "text": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, post) = send(&app, Method::GET, "/api/posts/3", None, None).await;
    assert_eq!(post["comments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn only_owners_and_admins_change_or_delete() {
    let app = app();
    let john = login(&app, "john12a", "password123").await;
    let maria = login(&app, "maria4b", "password123").await;
    let admin = login(&app, "admin", "admin123").await;

    // post 3 belongs to maria
    let (status, _) = send(&app, Method::PATCH, "/api/posts/3/status", Some(&john), Some(json!({ "status": "Sold" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, post) = send(&app, Method::PATCH, "/api/posts/3/status", Some(&maria), Some(json!({ "status": "Pending" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["status"], "Pending");

    let (_, post) = send(&app, Method::PATCH, "/api/posts/3/status", Some(&admin), Some(json!({ "status": "Available" }))).await;
    assert_eq!(post["status"], "Available");

    let (status, _) = send(&app, Method::DELETE, "/api/posts/3", Some(&john), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, "/api/posts/3", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, "/api/posts/3", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sqlite_store_serves_the_same_listing() {
    let app = app_with(Arc::new(SqliteStore::in_memory().expect("sqlite")));
    let (_, all) = send(&app, Method::GET, "/api/posts", None, None).await;
    assert_eq!(
        titles(&all),
        vec!["Selling Chair - $10", "Ride to city - 6 PM", "Old Lamp - $5"]
    );

    let token = login(&app, "john12a", "password123").await;
    let (_, reaction) = send(&app, Method::POST, "/api/posts/3/reactions", Some(&token), None).await;
    assert_eq!(reaction, json!({ "thumbs_up": 1, "reacted": false }));
}
