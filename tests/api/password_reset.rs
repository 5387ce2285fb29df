use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Duration;
use serde_json::json;

use crate::helpers::{post_json, spawn_app, token_from_email, user_id_of, TestApp};

fn register_alice() -> TestRequest {
    post_json(
        "/api/register",
        json!({"username": "alice", "email": "alice@example.com", "password": "old-pw"}),
    )
}

async fn emailed_token(test_app: &TestApp) -> String {
    let sent = test_app.wait_for_emails(1).await;
    let message = sent.last().expect("A reset email should have been sent");
    assert_eq!(message.to, "alice@example.com");
    assert!(message.text.contains("http://127.0.0.1:3000/reset.html?token="));
    token_from_email(message)
}

#[actix_web::test]
async fn forgot_password_answers_the_same_for_known_and_unknown_emails() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    let (status, body) = send!(app, register_alice());
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user_id_of(&body);

    let known = send!(
        app,
        post_json("/api/forgot-password", json!({"email": "alice@example.com"}))
    );
    let unknown = send!(
        app,
        post_json("/api/forgot-password", json!({"email": "nobody@example.com"}))
    );

    assert_eq!(known.0, StatusCode::OK);
    assert_eq!(known, unknown);
    assert_eq!(test_app.reset_tokens(user_id).await.len(), 1);
    assert_eq!(test_app.wait_for_emails(1).await.len(), 1);
}

#[actix_web::test]
async fn forgot_password_rejects_missing_or_malformed_email() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let (status, body) = send!(app, post_json("/api/forgot-password", json!({})));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "email required");

    let (status, body) = send!(
        app,
        post_json("/api/forgot-password", json!({"email": "not-an-email"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid email format");
}

#[actix_web::test]
async fn emailed_token_resets_the_password_once() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    send!(app, register_alice());

    send!(
        app,
        post_json("/api/forgot-password", json!({"email": "alice@example.com"}))
    );
    let token = emailed_token(&test_app).await;

    let (status, body) = send!(
        app,
        post_json("/api/reset-password", json!({"token": token, "password": "new-pw"}))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "password reset ok");

    let (status, _) = send!(
        app,
        post_json("/api/login", json!({"login": "alice", "password": "new-pw"}))
    );
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send!(
        app,
        post_json("/api/login", json!({"login": "alice", "password": "old-pw"}))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send!(
        app,
        post_json("/api/reset-password", json!({"token": token, "password": "third-pw"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "token already used");
}

#[actix_web::test]
async fn token_is_rejected_after_an_hour() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    send!(app, register_alice());

    send!(
        app,
        post_json("/api/forgot-password", json!({"email": "alice@example.com"}))
    );
    let token = emailed_token(&test_app).await;
    test_app.clock.advance(Duration::hours(1));

    let (status, body) = send!(
        app,
        post_json("/api/reset-password", json!({"token": token, "password": "new-pw"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "token expired");

    let (status, _) = send!(
        app,
        post_json("/api/login", json!({"login": "alice", "password": "old-pw"}))
    );
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unknown_token_is_invalid() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let (status, body) = send!(
        app,
        post_json(
            "/api/reset-password",
            json!({"token": "deadbeef", "password": "new-pw"})
        )
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid token");

    let (status, body) = send!(
        app,
        post_json("/api/reset-password", json!({"token": "deadbeef"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "token and password required");
}
