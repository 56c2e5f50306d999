//! Integration tests for login, logout, and whoami.


use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{failure, ok, read_session, user_json, write_session};
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer};

#[tokio::test]
async fn test_login_stores_session() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .and(body_json(json!({ "email": "admin@store.com", "password": "pw" })))
        .respond_with(ok(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "user": user_json("ADMIN"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env("VITRINE_API_URL", server.uri())
        .args(["login", "--email", "admin@store.com", "--password", "pw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as Ana Silva (ADMIN)"));

    let stored = read_session(home.path()).expect("session.json should exist");
    assert_eq!(stored["access_token"], "a1");
    assert_eq!(stored["refresh_token"], "r1");
}

#[tokio::test]
async fn test_login_reads_password_from_stdin() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .and(body_json(json!({ "email": "admin@store.com", "password": "secret" })))
        .respond_with(ok(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "user": user_json("STAFF"),
        })))
        .mount(&server)
        .await;

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env_remove("VITRINE_PASSWORD")
        .args(["--base-url", &server.uri(), "login", "--email", "admin@store.com"])
        .write_stdin("secret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("(STAFF)"));
}

#[tokio::test]
async fn test_login_as_customer_is_denied() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(ok(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "user": user_json("CUSTOMER"),
        })))
        .mount(&server)
        .await;

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env("VITRINE_API_URL", server.uri())
        .args(["login", "--email", "c@store.com", "--password", "pw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Access denied"));

    assert!(read_session(home.path()).is_none());
}

#[tokio::test]
async fn test_login_shows_backend_message() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/signin"))
        .respond_with(failure(401, "Invalid credentials"))
        .mount(&server)
        .await;

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env("VITRINE_API_URL", server.uri())
        .args(["login", "--email", "admin@store.com", "--password", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));
}

#[test]
fn test_logout_when_not_signed_in() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env("VITRINE_API_URL", "http://127.0.0.1:9")
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_logout_removes_corrupt_session_file() {
    let home = tempdir().unwrap();
    let session_path = home.path().join("session.json");
    std::fs::write(&session_path, "{not json").unwrap();

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env("VITRINE_API_URL", "http://127.0.0.1:9")
        .arg("logout")
        .assert()
        .success();

    assert!(!session_path.exists());
}

#[tokio::test]
async fn test_logout_notifies_backend_and_removes_session() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    write_session(home.path(), "a1", "r1");

    Mock::given(method("POST"))
        .and(path("/auth/signout"))
        .and(header("authorization", "Bearer a1"))
        .and(body_json(json!({ "allDevices": true })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env("VITRINE_API_URL", server.uri())
        .args(["logout", "--all-devices"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_whoami_shows_current_user() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    write_session(home.path(), "a1", "r1");

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ok(user_json("ADMIN")))
        .mount(&server)
        .await;

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env("VITRINE_API_URL", server.uri())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ana Silva"))
        .stdout(predicate::str::contains("admin@store.com"));
}

#[test]
fn test_whoami_without_session_fails() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env("VITRINE_API_URL", "http://127.0.0.1:9")
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("vitrine login"));
}

#[tokio::test]
async fn test_blank_base_url_flag_falls_back_to_config() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    write_session(home.path(), "a1", "r1");
    std::fs::write(
        home.path().join("config.toml"),
        format!("base_url = \"{}\"\n", server.uri()),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ok(user_json("ADMIN")))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("vitrine")
        .env("VITRINE_HOME", home.path())
        .env_remove("VITRINE_API_URL")
        .args(["--base-url", "", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("admin@store.com"));
}
