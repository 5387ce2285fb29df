use actix_web::http::StatusCode;
use serde_json::json;

use crate::helpers::{post_json, spawn_app, user_id_of};

#[actix_web::test]
async fn register_returns_201_and_the_new_id() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let (status, body) = send!(
        app,
        post_json(
            "/api/register",
            json!({"username": "alice", "email": "alice@example.com", "password": "s3cret"})
        )
    );

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "registered");
    let user_id = user_id_of(&body);
    assert!(!test_app.password_hash(user_id).await.is_empty());
}

#[actix_web::test]
async fn register_without_username_or_password_is_400() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let cases = [
        json!({"password": "s3cret"}),
        json!({"username": "alice"}),
        json!({"username": "", "password": "s3cret"}),
    ];
    for case in cases {
        let (status, body) = send!(app, post_json("/api/register", case.clone()));
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {case}");
        assert_eq!(body["message"], "username and password required");
    }
}

#[actix_web::test]
async fn duplicate_username_is_409_whatever_the_email() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let (status, _) = send!(
        app,
        post_json(
            "/api/register",
            json!({"username": "alice", "email": "alice@example.com", "password": "pw"})
        )
    );
    assert_eq!(status, StatusCode::CREATED);

    for email in [json!("other@example.com"), json!(null)] {
        let (status, body) = send!(
            app,
            post_json(
                "/api/register",
                json!({"username": "alice", "email": email, "password": "pw"})
            )
        );
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "username or email already exists");
    }
}

#[actix_web::test]
async fn duplicate_email_is_409() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    send!(
        app,
        post_json(
            "/api/register",
            json!({"username": "alice", "email": "shared@example.com", "password": "pw"})
        )
    );
    let (status, _) = send!(
        app,
        post_json(
            "/api/register",
            json!({"username": "bob", "email": "shared@example.com", "password": "pw"})
        )
    );
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn malformed_json_is_400_with_a_message() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let request = actix_web::test::TestRequest::post()
        .uri("/api/register")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json");
    let (status, body) = send!(app, request);

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[actix_web::test]
async fn over_long_username_is_400() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let (status, body) = send!(
        app,
        post_json(
            "/api/register",
            json!({"username": "u".repeat(51), "password": "pw"})
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "username must be at most 50 characters");
}
