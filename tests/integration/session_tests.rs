//! Session cookie acquisition against a mock marketplace origin

use crate::direct_pool;
use catalog_scout::session::{acquire_until_successful, fetch_session_cookie, spawn_refresh_loop};
use catalog_scout::SessionCookie;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COOKIE_NAME: &str = "access_token_web";

#[tokio::test]
async fn test_cookie_is_read_from_set_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header(
            "set-cookie",
            "access_token_web=eyJ0.token; Path=/; HttpOnly; Secure",
        ))
        .mount(&server)
        .await;

    let pool = direct_pool(Duration::from_secs(5));
    let cookie = fetch_session_cookie(&pool, &server.uri(), COOKIE_NAME)
        .await
        .unwrap();
    assert_eq!(cookie, "access_token_web=eyJ0.token");
}

#[tokio::test]
async fn test_missing_cookie_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "anon_id=1; Path=/"))
        .mount(&server)
        .await;

    let pool = direct_pool(Duration::from_secs(5));
    assert!(fetch_session_cookie(&pool, &server.uri(), COOKIE_NAME)
        .await
        .is_err());
}

#[tokio::test]
async fn test_acquire_retries_until_cookie_is_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "access_token_web=third; Path=/"),
        )
        .mount(&server)
        .await;

    let pool = direct_pool(Duration::from_secs(5));
    let cookie = acquire_until_successful(&pool, &server.uri(), COOKIE_NAME, &CancellationToken::new())
        .await;

    assert_eq!(cookie.as_deref(), Some("access_token_web=third"));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_acquire_gives_up_when_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let pool = direct_pool(Duration::from_secs(5));
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        canceller.cancel();
    });

    let cookie = acquire_until_successful(&pool, &server.uri(), COOKIE_NAME, &cancel).await;
    assert!(cookie.is_none());
}

#[tokio::test]
async fn test_refresh_loop_replaces_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "access_token_web=fresh; Path=/"),
        )
        .mount(&server)
        .await;

    let session = SessionCookie::fixed("access_token_web=stale");
    let cancel = CancellationToken::new();
    let refresh = spawn_refresh_loop(
        direct_pool(Duration::from_secs(5)),
        server.uri(),
        COOKIE_NAME.to_string(),
        session.clone(),
        Duration::from_millis(100),
        cancel.clone(),
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();
    refresh.await.unwrap();

    assert_eq!(session.current().as_deref(), Some("access_token_web=fresh"));
}
