//! Outcome classification and bootstrap against a mock marketplace

use crate::{direct_pool, marketplace_config};
use catalog_scout::scanner::{
    discover_frontier, fetch_item, find_highest_id, BackoffPolicy, FetchOutcome, HttpMarketplace,
};
use catalog_scout::SessionCookie;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_item(server: &MockServer, id: u64, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/items/{}", id)))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn fetch(server: &MockServer, id: u64) -> FetchOutcome {
    let pool = direct_pool(Duration::from_secs(5));
    fetch_item(pool.next_client(), &server.uri(), None, id).await
}

#[tokio::test]
async fn test_found_item_is_decoded() {
    let server = MockServer::start().await;
    mount_item(
        &server,
        1001,
        ResponseTemplate::new(200).set_body_json(json!({
            "item": {
                "id": 1001,
                "title": "Denim jacket",
                "brand_title": "Levi's",
                "price": {"amount": "25.0", "currency_code": "EUR"},
                "updated_at_ts": "2024-05-01T12:00:00+02:00",
                "is_reserved": false
            }
        })),
    )
    .await;

    match fetch(&server, 1001).await {
        FetchOutcome::Found(item) => {
            assert_eq!(item.id, 1001);
            assert_eq!(item.title.as_deref(), Some("Denim jacket"));
            assert_eq!(item.brand.as_deref(), Some("Levi's"));
            assert_eq!(item.price_text().as_deref(), Some("25.0"));
            assert!(item.published_at().is_some());
            assert!(item.extra.contains_key("is_reserved"));
        }
        other => panic!("expected Found, got {:?}", other),
    }
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;
    mount_item(&server, 2, ResponseTemplate::new(404)).await;
    mount_item(&server, 3, ResponseTemplate::new(403)).await;
    mount_item(&server, 4, ResponseTemplate::new(429)).await;
    mount_item(&server, 5, ResponseTemplate::new(500)).await;

    assert_eq!(fetch(&server, 2).await, FetchOutcome::NotFound);
    assert_eq!(fetch(&server, 3).await, FetchOutcome::Forbidden);
    assert_eq!(fetch(&server, 4).await, FetchOutcome::RateLimited);
    assert_eq!(
        fetch(&server, 5).await,
        FetchOutcome::OtherError("HTTP 500".to_string())
    );
}

#[tokio::test]
async fn test_malformed_body_is_other_error() {
    let server = MockServer::start().await;
    mount_item(
        &server,
        6,
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;
    mount_item(
        &server,
        7,
        ResponseTemplate::new(200).set_body_json(json!({ "item": { "title": "no id" } })),
    )
    .await;

    assert!(matches!(fetch(&server, 6).await, FetchOutcome::OtherError(_)));
    assert!(matches!(fetch(&server, 7).await, FetchOutcome::OtherError(_)));
}

#[tokio::test]
async fn test_timeout_is_other_error() {
    let server = MockServer::start().await;
    mount_item(
        &server,
        8,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "item": { "id": 8 } }))
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let pool = direct_pool(Duration::from_millis(200));
    let outcome = fetch_item(pool.next_client(), &server.uri(), None, 8).await;
    assert!(matches!(outcome, FetchOutcome::OtherError(_)));
}

#[tokio::test]
async fn test_session_cookie_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/items/9"))
        .and(header("cookie", "access_token_web=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "item": { "id": 9 } })))
        .mount(&server)
        .await;

    let pool = direct_pool(Duration::from_secs(5));
    let outcome = fetch_item(pool.next_client(), &server.uri(), Some("access_token_web=abc"), 9).await;
    assert!(matches!(outcome, FetchOutcome::Found(_)));

    // Without the cookie the mock does not match and wiremock answers 404
    let outcome = fetch_item(pool.next_client(), &server.uri(), None, 9).await;
    assert_eq!(outcome, FetchOutcome::NotFound);
}

#[tokio::test]
async fn test_bootstrap_picks_highest_listed_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .and(query_param("order", "newest_first"))
        .and(query_param("per_page", "96"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": 101 }, { "id": "980" }, { "id": 450 }, { "title": "no id" }]
        })))
        .mount(&server)
        .await;

    let api = HttpMarketplace::new(
        direct_pool(Duration::from_secs(5)),
        SessionCookie::new(),
        &marketplace_config(&server.uri()),
    )
    .unwrap();

    assert_eq!(find_highest_id(&api).await.unwrap(), 980);
}

#[tokio::test]
async fn test_bootstrap_retries_after_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/catalog/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [{ "id": 5000 }] })))
        .mount(&server)
        .await;

    let api = HttpMarketplace::new(
        direct_pool(Duration::from_secs(5)),
        SessionCookie::new(),
        &marketplace_config(&server.uri()),
    )
    .unwrap();
    let backoff = BackoffPolicy {
        initial: Duration::from_millis(10),
        max: Duration::from_millis(50),
    };

    let bootstrap = discover_frontier(&api, backoff, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(bootstrap.frontier, 5000);
    assert_eq!(bootstrap.attempts, 3);
}
