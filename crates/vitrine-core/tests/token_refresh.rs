//! Request pipeline: 401 recovery and single-flight refresh.


use std::sync::Arc;
use std::time::Duration;

use fixtures::{ok, signed_in_client, unauthorized};
use futures_util::future::join_all;
use serde_json::{Value, json};
use vitrine_core::api::{ApiRequest, RefreshState};
use vitrine_core::session::{Credentials, SessionStore};
use vitrine_core::{ApiErrorKind, ApiResult};
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tokens(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access,
        "refresh_token": refresh
    }))
}

#[tokio::test]
async fn test_attaches_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categories"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ok(json!([{ "id": "c1", "name": "Shirts" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let categories = client.list_categories().await.unwrap();

    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Shirts");
}

#[tokio::test]
async fn test_401_refreshes_and_retries_with_new_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer a2"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(tokens("a2", "r2"))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let products = client.list_products(&Default::default()).await.unwrap();

    assert!(products.is_empty());
    assert_eq!(
        client.store().credentials(),
        Some(Credentials::new("a2", "r2"))
    );
    assert_eq!(client.refresher().state(), RefreshState::Idle);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(unauthorized())
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer a2"))
        .respond_with(ok(json!({ "total": 3 })))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(tokens("a2", "r2").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let calls = (0..5).map(|_| {
        let client = client.clone();
        async move { client.execute::<Value>(ApiRequest::get("/orders")).await }
    });
    let results: Vec<ApiResult<Value>> = join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap(), json!({ "total": 3 }));
    }
    assert_eq!(client.store().access_token().as_deref(), Some("a2"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_401s_across_workers_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer a2"))
        .respond_with(ok(json!({ "total": 3 })))
        .expect(64)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(tokens("a2", "r2").set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let handles: Vec<_> = (0..64)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.execute::<Value>(ApiRequest::get("/orders")).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), json!({ "total": 3 }));
    }
    assert_eq!(
        client.store().credentials(),
        Some(Credentials::new("a2", "r2"))
    );
    assert_eq!(client.refresher().state(), RefreshState::Idle);
}

#[tokio::test]
async fn test_failed_refresh_rejects_all_waiters_and_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(unauthorized())
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "error": true, "message": "Refresh token revoked" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let calls = (0..3).map(|_| {
        let client = client.clone();
        async move { client.list_users(&Default::default()).await }
    });
    let results = join_all(calls).await;

    for result in results {
        let err = result.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::SessionExpired);
        assert!(err.requires_login());
    }
    assert!(client.store().load().is_none());
}

#[tokio::test]
async fn test_refresh_non_2xx_surfaces_unrecoverable_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/sessions"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let err = client.list_sessions().await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::SessionExpired);
    assert!(client.store().load().is_none());
}

#[tokio::test]
async fn test_missing_refresh_token_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/p1"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(tokens("a2", "r2"))
        .expect(0)
        .mount(&server)
        .await;

    let client = fixtures::client_for(&server, Arc::new(SessionStore::in_memory()));
    let err = client.get_product("p1").await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::SessionExpired);
    assert!(
        err.details
            .as_deref()
            .is_some_and(|d| d.contains("No refresh token"))
    );
}

#[tokio::test]
async fn test_second_401_after_retry_is_returned_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/products/p1"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(tokens("a2", "r2"))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let err = client.delete_product("p1").await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::HttpStatus);
    assert_eq!(err.status, Some(401));
    assert_eq!(err.to_string(), "Token expired");
    // The refresh itself succeeded, so the session survives.
    assert_eq!(client.store().access_token().as_deref(), Some("a2"));
}

#[tokio::test]
async fn test_settled_refresh_is_not_reused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(tokens("a2", "r2"))
        .expect(2)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    client.refresher().refresh().await.unwrap();
    assert_eq!(client.refresher().state(), RefreshState::Idle);
    let second = client.refresher().refresh().await.unwrap();

    assert_eq!(second, Credentials::new("a2", "r2"));
}

#[tokio::test]
async fn test_refresh_accepts_enveloped_token_pair() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ok(json!({ "access_token": "a3", "refresh_token": "r3" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let creds = client.refresher().refresh().await.unwrap();

    assert_eq!(creds, Credentials::new("a3", "r3"));
    assert_eq!(client.store().credentials(), Some(creds));
}

#[tokio::test]
async fn test_stale_token_401_retries_without_second_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(unauthorized().set_delay(Duration::from_millis(400)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analytics"))
        .and(header("authorization", "Bearer a2"))
        .respond_with(ok(json!({ "revenue": 100 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(tokens("a2", "r2"))
        .expect(1)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let slow = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .execute::<Value>(ApiRequest::get("/analytics"))
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    client.refresher().refresh().await.unwrap();

    let payload = slow.await.unwrap().unwrap();
    assert_eq!(payload, json!({ "revenue": 100 }));
}

#[tokio::test]
async fn test_backend_error_envelope_is_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "error": true, "message": "SKU already exists" })),
        )
        .mount(&server)
        .await;
    Mock::given(any())
        .and(path("/auth/refresh"))
        .respond_with(tokens("a2", "r2"))
        .expect(0)
        .mount(&server)
        .await;

    let client = signed_in_client(&server);
    let err = client
        .create_product(&Default::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Backend);
    assert_eq!(err.user_message(), "SKU already exists");
}
