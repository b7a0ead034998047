//! Marketplace HTTP fetcher
//!
//! This module handles every request the scanner makes:
//! - Building HTTP clients, one per outbound proxy
//! - Rotating requests across those clients
//! - Fetching a single item by ID and classifying the response
//! - Fetching the newest-first catalog listing used during bootstrap

use crate::catalog::{CatalogItem, CatalogPage, ItemEnvelope};
use crate::config::{MarketplaceConfig, ProxyConfig};
use crate::session::SessionCookie;
use crate::ScoutError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, Proxy, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str = concat!("catalog-scout/", env!("CARGO_PKG_VERSION"));

/// Classified result of fetching one item
///
/// Not-found, forbidden and rate-limited responses are routine at scan volume,
/// so they are values rather than errors.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// HTTP 2xx with a parseable item payload
    Found(Box<CatalogItem>),

    /// HTTP 404: the ID does not exist (yet)
    NotFound,

    /// HTTP 403: the session cookie is likely stale
    Forbidden,

    /// HTTP 429
    RateLimited,

    /// Any other status, a malformed body, or a transport failure
    OtherError(String),
}

impl FetchOutcome {
    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::OtherError(_) => "other_error",
        }
    }
}

/// The two marketplace endpoints the scanner consumes
#[async_trait]
pub trait MarketplaceApi: Send + Sync + 'static {
    /// Fetches one item by ID
    async fn fetch_item(&self, id: u64) -> FetchOutcome;

    /// Fetches the newest-first catalog listing
    async fn fetch_catalog_page(&self) -> Result<CatalogPage, ScoutError>;
}

/// Builds an HTTP client, optionally routed through a proxy
///
/// # Arguments
///
/// * `timeout` - Total per-request timeout
/// * `proxy` - Proxy URL (`http`, `https`, `socks5`), or `None` for a direct client
pub fn build_http_client(timeout: Duration, proxy: Option<&str>) -> Result<Client, ScoutError> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy_url) = proxy {
        let proxy = Proxy::all(proxy_url).map_err(|source| ScoutError::Proxy {
            url: proxy_url.to_string(),
            source,
        })?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// A set of HTTP clients handed out round-robin
///
/// With no proxies configured the pool holds a single direct client.
#[derive(Debug, Clone)]
pub struct HttpPool {
    clients: Arc<Vec<Client>>,
    next: Arc<AtomicUsize>,
}

impl HttpPool {
    /// Builds one client per proxy, or a single direct client
    pub fn new(timeout: Duration, proxies: &ProxyConfig) -> Result<Self, ScoutError> {
        let clients = if proxies.urls.is_empty() {
            vec![build_http_client(timeout, None)?]
        } else {
            proxies
                .urls
                .iter()
                .map(|url| build_http_client(timeout, Some(url)))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self::from_clients(clients))
    }

    /// Wraps pre-built clients
    ///
    /// An empty list falls back to a default client.
    pub fn from_clients(mut clients: Vec<Client>) -> Self {
        if clients.is_empty() {
            clients.push(Client::new());
        }
        Self {
            clients: Arc::new(clients),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the next client in rotation
    pub fn next_client(&self) -> &Client {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }

    /// Number of clients (routes) in the pool, never zero
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

/// URL of the single-item endpoint
pub fn item_url(base_url: &str, id: u64) -> String {
    format!("{}/api/v2/items/{}", base_url.trim_end_matches('/'), id)
}

/// URL of the catalog listing endpoint
pub fn catalog_url(base_url: &str, per_page: u32, order: &str) -> Result<Url, ScoutError> {
    let endpoint = format!("{}/api/v2/catalog/items", base_url.trim_end_matches('/'));
    Ok(Url::parse_with_params(
        &endpoint,
        &[("per_page", per_page.to_string()), ("order", order.to_string())],
    )?)
}

/// Fetches one item and classifies the response
///
/// # Classification
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | 2xx, body parses | Found |
/// | 2xx, body malformed | OtherError |
/// | 404 | NotFound |
/// | 403 | Forbidden |
/// | 429 | RateLimited |
/// | other status | OtherError |
/// | timeout / connect / other transport failure | OtherError |
pub async fn fetch_item(
    client: &Client,
    base_url: &str,
    cookie: Option<&str>,
    id: u64,
) -> FetchOutcome {
    let url = item_url(base_url, id);

    let mut request = client.get(&url).header(ACCEPT, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return FetchOutcome::OtherError(describe_transport_error(&e)),
    };

    let status = response.status();
    match status {
        StatusCode::NOT_FOUND => return FetchOutcome::NotFound,
        StatusCode::FORBIDDEN => return FetchOutcome::Forbidden,
        StatusCode::TOO_MANY_REQUESTS => return FetchOutcome::RateLimited,
        s if !s.is_success() => return FetchOutcome::OtherError(format!("HTTP {}", s.as_u16())),
        _ => {}
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return FetchOutcome::OtherError(describe_transport_error(&e)),
    };

    match serde_json::from_str::<ItemEnvelope>(&body) {
        Ok(envelope) => FetchOutcome::Found(Box::new(envelope.item)),
        Err(e) => FetchOutcome::OtherError(format!("Malformed item payload: {}", e)),
    }
}

/// Fetches the newest-first catalog listing
pub async fn fetch_catalog_page(
    client: &Client,
    url: &Url,
    cookie: Option<&str>,
) -> Result<CatalogPage, ScoutError> {
    let mut request = client.get(url.clone()).header(ACCEPT, "application/json");
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }

    let response = request.send().await.map_err(|source| ScoutError::Http {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScoutError::UnexpectedStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| ScoutError::Http {
        url: url.to_string(),
        source,
    })?;

    serde_json::from_str(&body).map_err(|e| ScoutError::Payload {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// `MarketplaceApi` backed by real HTTP requests
///
/// Each request takes the next client from the pool and re-reads the current
/// session cookie.
#[derive(Debug, Clone)]
pub struct HttpMarketplace {
    pool: HttpPool,
    session: SessionCookie,
    base_url: String,
    catalog_url: Url,
}

impl HttpMarketplace {
    /// Creates a marketplace client
    pub fn new(
        pool: HttpPool,
        session: SessionCookie,
        config: &MarketplaceConfig,
    ) -> Result<Self, ScoutError> {
        Ok(Self {
            catalog_url: catalog_url(&config.base_url, config.per_page, &config.order)?,
            base_url: config.base_url.clone(),
            pool,
            session,
        })
    }
}

#[async_trait]
impl MarketplaceApi for HttpMarketplace {
    async fn fetch_item(&self, id: u64) -> FetchOutcome {
        let cookie = self.session.current();
        fetch_item(self.pool.next_client(), &self.base_url, cookie.as_deref(), id).await
    }

    async fn fetch_catalog_page(&self) -> Result<CatalogPage, ScoutError> {
        let cookie = self.session.current();
        fetch_catalog_page(self.pool.next_client(), &self.catalog_url, cookie.as_deref()).await
    }
}
