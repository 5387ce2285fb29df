use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use crate::helpers::{post_json, spawn_app, user_id_of, with_bearer};

fn register(username: &str, email: &str) -> TestRequest {
    post_json(
        "/api/register",
        json!({"username": username, "email": email, "password": "pw-1"}),
    )
}

fn login(username: &str, password: &str) -> TestRequest {
    post_json("/api/login", json!({"login": username, "password": password}))
}

fn token_of(body: &serde_json::Value) -> String {
    body["token"].as_str().expect("token should be a string").to_string()
}

#[actix_web::test]
async fn profile_requires_a_bearer_token() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    let (_, body) = send!(app, register("alice", "alice@example.com"));
    let user_id = user_id_of(&body);

    let (status, body) = send!(app, TestRequest::get().uri(&format!("/api/user/{user_id}")));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthenticated");

    let request = with_bearer(
        TestRequest::get().uri(&format!("/api/user/{user_id}")),
        "not.a.jwt",
    );
    let (status, _) = send!(app, request);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn token_of_another_user_is_rejected() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    let (_, alice) = send!(app, register("alice", "alice@example.com"));
    send!(app, register("bob", "bob@example.com"));
    let (_, bob) = send!(app, login("bob", "pw-1"));

    let alice_id = user_id_of(&alice);
    let request = with_bearer(
        TestRequest::get().uri(&format!("/api/user/{alice_id}")),
        &token_of(&bob),
    );
    let (status, _) = send!(app, request);
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = with_bearer(
        TestRequest::put().uri(&format!("/api/user/{alice_id}")),
        &token_of(&bob),
    )
    .set_json(json!({"fullName": "Mallory"}));
    let (status, _) = send!(app, request);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn own_profile_is_returned_without_the_hash() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    send!(app, register("alice", "alice@example.com"));
    let (_, session) = send!(app, login("alice", "pw-1"));
    let user_id = user_id_of(&session);

    let request = with_bearer(
        TestRequest::get().uri(&format!("/api/user/{user_id}")),
        &token_of(&session),
    );
    let (status, profile) = send!(app, request);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["id"], json!(user_id.0));
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["email"], "alice@example.com");
    assert!(profile.get("passwordHash").is_none());
    assert!(profile.get("password_hash").is_none());
}

#[actix_web::test]
async fn profile_update_keeps_fields_that_were_not_sent() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    send!(app, register("alice", "alice@example.com"));
    let (_, session) = send!(app, login("alice", "pw-1"));
    let user_id = user_id_of(&session);
    let token = token_of(&session);

    let request = with_bearer(
        TestRequest::put().uri(&format!("/api/user/{user_id}")),
        &token,
    )
    .set_json(json!({"fullName": "Alice Liddell", "city": "Oxford"}));
    let (status, profile) = send!(app, request);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["fullName"], "Alice Liddell");

    let request = with_bearer(
        TestRequest::put().uri(&format!("/api/user/{user_id}")),
        &token,
    )
    .set_json(json!({"phone": "555-0100"}));
    let (_, profile) = send!(app, request);
    assert_eq!(profile["phone"], "555-0100");
    assert_eq!(profile["fullName"], "Alice Liddell");
    assert_eq!(profile["city"], "Oxford");
    assert_eq!(profile["username"], "alice");
}

#[actix_web::test]
async fn password_change_needs_the_current_password() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    send!(app, register("alice", "alice@example.com"));
    let (_, session) = send!(app, login("alice", "pw-1"));
    let user_id = user_id_of(&session);
    let uri = format!("/api/user/{user_id}/credentials");

    let request = with_bearer(TestRequest::post().uri(&uri), &token_of(&session))
        .set_json(json!({"currentPassword": "wrong", "newPassword": "pw-2"}));
    let (status, body) = send!(app, request);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid credentials");

    let request = with_bearer(TestRequest::post().uri(&uri), &token_of(&session))
        .set_json(json!({"newPassword": "pw-2"}));
    let (status, body) = send!(app, request);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "current password required");

    let (status, _) = send!(app, login("alice", "pw-1"));
    assert_eq!(status, StatusCode::OK);

    let request = with_bearer(TestRequest::post().uri(&uri), &token_of(&session))
        .set_json(json!({"currentPassword": "pw-1", "newPassword": "pw-2"}));
    let (status, body) = send!(app, request);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "ok"}));

    let (status, _) = send!(app, login("alice", "pw-1"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send!(app, login("alice", "pw-2"));
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn username_change_cannot_take_an_existing_name() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    send!(app, register("alice", "alice@example.com"));
    send!(app, register("bob", "bob@example.com"));
    let (_, session) = send!(app, login("alice", "pw-1"));
    let uri = format!("/api/user/{}/credentials", user_id_of(&session));

    let request = with_bearer(TestRequest::post().uri(&uri), &token_of(&session))
        .set_json(json!({"newUsername": "bob"}));
    let (status, _) = send!(app, request);
    assert_eq!(status, StatusCode::CONFLICT);

    let request = with_bearer(TestRequest::post().uri(&uri), &token_of(&session))
        .set_json(json!({"newUsername": "alicia", "sendConfirmationEmail": true}));
    let (status, _) = send!(app, request);
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send!(app, login("alicia", "pw-1"));
    assert_eq!(status, StatusCode::OK);
    let sent = test_app.wait_for_emails(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
}

#[actix_web::test]
async fn empty_credential_change_is_400() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    send!(app, register("alice", "alice@example.com"));
    let (_, session) = send!(app, login("alice", "pw-1"));
    let uri = format!("/api/user/{}/credentials", user_id_of(&session));

    let request = with_bearer(TestRequest::post().uri(&uri), &token_of(&session))
        .set_json(json!({}));
    let (status, _) = send!(app, request);
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn non_numeric_user_id_gets_a_json_error() {
    let test_app = spawn_app();
    let app = init_app!(test_app);
    send!(app, register("alice", "alice@example.com"));
    let (_, session) = send!(app, login("alice", "pw-1"));

    let request = with_bearer(TestRequest::get().uri("/api/user/abc"), &token_of(&session));
    let (status, body) = send!(app, request);

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().starts_with("invalid path"));
}

#[actix_web::test]
async fn unknown_route_gets_a_json_error() {
    let test_app = spawn_app();
    let app = init_app!(test_app);

    let (status, body) = send!(app, TestRequest::get().uri("/api/nowhere"));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "not found"}));
}
