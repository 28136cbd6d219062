use serde_json::json;

use crate::helpers::make_test_app;
use db::models::user::{Model as User, Role};

async fn seed_admin(db: &sea_orm::DatabaseConnection) -> User {
    User::create(db, "admin", "admin@school.test", "password1", Role::Admin)
        .await
        .expect("create admin")
}

#[tokio::test]
async fn login_returns_tokens_and_rejects_bad_password() {
    let test = make_test_app().await;
    seed_admin(test.state.db()).await;

    let (status, body) = test
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "admin", "password": "password1"})),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(
        body["data"]["refresh_token"]
            .as_str()
            .is_some_and(|t| !t.is_empty())
    );
    assert_eq!(body["data"]["role"], "admin");

    let (status, body) = test
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "admin", "password": "wrongpassword"})),
        )
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Invalid username or password");
}

#[tokio::test]
async fn refresh_rotates_and_invalidates_the_old_token() {
    let test = make_test_app().await;
    seed_admin(test.state.db()).await;

    let (_, login) = test
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "admin", "password": "password1"})),
        )
        .await;
    let original = login["data"]["refresh_token"].as_str().unwrap().to_owned();

    let (status, refreshed) = test
        .request(
            "POST",
            "/api/auth/refresh-token",
            None,
            Some(json!({"refresh_token": original})),
        )
        .await;
    assert_eq!(status, 200);
    let replacement = refreshed["data"]["refresh_token"].as_str().unwrap();
    assert_ne!(replacement, original);

    // the redeemed token is dead
    let (status, _) = test
        .request(
            "POST",
            "/api/auth/refresh-token",
            None,
            Some(json!({"refresh_token": original})),
        )
        .await;
    assert_eq!(status, 401);

    // the replacement still works
    let (status, _) = test
        .request(
            "POST",
            "/api/auth/refresh-token",
            None,
            Some(json!({"refresh_token": replacement})),
        )
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn logout_revokes_the_refresh_token() {
    let test = make_test_app().await;
    seed_admin(test.state.db()).await;

    let (_, login) = test
        .request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "admin", "password": "password1"})),
        )
        .await;
    let refresh = login["data"]["refresh_token"].as_str().unwrap().to_owned();

    let (status, _) = test
        .request(
            "POST",
            "/api/auth/logout",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
    assert_eq!(status, 200);

    let (status, _) = test
        .request(
            "POST",
            "/api/auth/refresh-token",
            None,
            Some(json!({"refresh_token": refresh})),
        )
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn unknown_refresh_token_is_unauthorized() {
    let test = make_test_app().await;

    let (status, body) = test
        .request(
            "POST",
            "/api/auth/refresh-token",
            None,
            Some(json!({"refresh_token": "deadbeef"})),
        )
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["message"], "Invalid or expired refresh token");
}
