use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use crate::helpers::{post_json, spawn_app, user_id_of, with_bearer};

#[actix_web::test]
async fn login_with_registered_credentials_returns_identity_and_token() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let (_, registered) = send!(
        app,
        post_json(
            "/api/register",
            json!({"username": "alice", "email": "alice@example.com", "password": "pw-1"})
        )
    );
    let user_id = user_id_of(&registered);

    for request in [
        json!({"login": "alice", "password": "pw-1"}),
        json!({"login": "alice@example.com", "password": "pw-1"}),
        json!({"username": "alice", "password": "pw-1"}),
    ] {
        let (status, body) = send!(app, post_json("/api/login", request));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user_id_of(&body), user_id);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["email"], "alice@example.com");
        assert_ne!(body["token"], "fake-jwt-token");
        assert!(body.get("passwordHash").is_none());
    }
}

#[actix_web::test]
async fn issued_token_opens_the_profile() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    send!(
        app,
        post_json("/api/register", json!({"username": "alice", "password": "pw"}))
    );
    let (_, body) = send!(
        app,
        post_json("/api/login", json!({"login": "alice", "password": "pw"}))
    );
    let token = body["token"].as_str().unwrap().to_string();
    let user_id = user_id_of(&body);

    let request = with_bearer(
        TestRequest::get().uri(&format!("/api/user/{user_id}")),
        &token,
    );
    let (status, profile) = send!(app, request);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "alice");
}

#[actix_web::test]
async fn unknown_user_and_wrong_password_get_the_same_401() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    send!(
        app,
        post_json("/api/register", json!({"username": "alice", "password": "right"}))
    );

    let wrong_password = send!(
        app,
        post_json("/api/login", json!({"login": "alice", "password": "wrong"}))
    );
    let unknown_user = send!(
        app,
        post_json("/api/login", json!({"login": "mallory", "password": "right"}))
    );

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password.1, json!({"message": "invalid credentials"}));
}

#[actix_web::test]
async fn login_without_fields_is_400() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let (status, _) = send!(app, post_json("/api/login", json!({"login": "alice"})));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send!(app, post_json("/api/login", json!({"password": "pw"})));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
