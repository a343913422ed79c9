//! Integration tests for user accounts.

use cloudbox_core::error::ErrorKind;
use cloudbox_entity::user::UserStatus;

use crate::helpers;

#[tokio::test]
async fn test_register_then_login() {
    let users = helpers::user_service();
    let user = users.register("alice", "correct horse").await.unwrap();
    assert_eq!(user.status, UserStatus::Active);
    assert_ne!(user.password_hash, "correct horse");

    let logged_in = users.login("ALICE", "correct horse").await.unwrap();
    assert_eq!(logged_in.id, user.id);
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let users = helpers::user_service();
    let user = users.register("bob", "hunter2hunter2").await.unwrap();

    let wrong_password = users.login("bob", "nope-nope").await.unwrap_err();
    let unknown_user = users.login("mallory", "hunter2hunter2").await.unwrap_err();
    users.delete_user(user.id).await.unwrap();
    let deleted_user = users.login("bob", "hunter2hunter2").await.unwrap_err();

    for err in [&wrong_password, &unknown_user, &deleted_user] {
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, wrong_password.message);
    }
}

#[tokio::test]
async fn test_usernames_are_unique_ignoring_case() {
    let users = helpers::user_service();
    users.register("Carol", "long enough pw").await.unwrap();

    let err = users.register("carol", "another long pw").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_register_validates_fields() {
    let users = helpers::user_service();

    let err = users.register("x", "long enough pw").await.unwrap_err();
    assert_eq!(err.field, Some("username"));

    let err = users.register("dave", "short").await.unwrap_err();
    assert_eq!(err.field, Some("password"));
}
