//! Marketplace session cookie handling
//!
//! Every item fetch needs a session cookie. This module provides:
//! - `SessionCookie`, a shared handle re-read by each request
//! - Acquisition of a fresh cookie from the marketplace origin's `Set-Cookie` headers
//! - A background refresh loop

use crate::scanner::HttpPool;
use crate::ScoutError;
use reqwest::header::SET_COOKIE;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Delay between attempts while no cookie has been obtained yet
const ACQUIRE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Shared, cheaply clonable session cookie
#[derive(Debug, Clone, Default)]
pub struct SessionCookie {
    inner: Arc<RwLock<Option<String>>>,
}

impl SessionCookie {
    /// Creates an empty handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle holding a fixed cookie
    pub fn fixed(cookie: impl Into<String>) -> Self {
        let handle = Self::new();
        handle.set(cookie);
        handle
    }

    /// Returns the current cookie, if one has been acquired
    pub fn current(&self) -> Option<String> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the current cookie
    pub fn set(&self, cookie: impl Into<String>) {
        let cookie = cookie.into();
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(cookie),
            Err(poisoned) => *poisoned.into_inner() = Some(cookie),
        }
    }
}

/// Extracts `name=value` for `cookie_name` from a list of `Set-Cookie` header values
///
/// Attributes after the first `;` (path, expiry, flags) are dropped.
pub fn extract_session_cookie<'a, I>(set_cookies: I, cookie_name: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    set_cookies.into_iter().find_map(|header| {
        let pair = header.split(';').next()?.trim();
        let (name, value) = pair.split_once('=')?;
        (name.trim() == cookie_name && !value.is_empty()).then(|| pair.to_string())
    })
}

/// Requests the marketplace origin and returns the session cookie it sets
pub async fn fetch_session_cookie(
    pool: &HttpPool,
    base_url: &str,
    cookie_name: &str,
) -> Result<String, ScoutError> {
    let response = pool
        .next_client()
        .get(base_url)
        .send()
        .await
        .map_err(|source| ScoutError::Http {
            url: base_url.to_string(),
            source,
        })?;

    let headers: Vec<&str> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    if headers.is_empty() {
        return Err(ScoutError::Session(format!(
            "No Set-Cookie headers from {} (HTTP {})",
            base_url,
            response.status().as_u16()
        )));
    }

    extract_session_cookie(headers, cookie_name).ok_or_else(|| {
        ScoutError::Session(format!("Cookie '{}' not set by {}", cookie_name, base_url))
    })
}

/// Keeps requesting a session cookie until one is obtained
///
/// Returns `None` only if `cancel` fires first.
pub async fn acquire_until_successful(
    pool: &HttpPool,
    base_url: &str,
    cookie_name: &str,
    cancel: &CancellationToken,
) -> Option<String> {
    loop {
        match fetch_session_cookie(pool, base_url, cookie_name).await {
            Ok(cookie) => {
                tracing::debug!("Fetched session cookie from {}", base_url);
                return Some(cookie);
            }
            Err(e) => tracing::debug!("Error fetching session cookie: {}", e),
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(ACQUIRE_RETRY_DELAY) => {}
        }
    }
}

/// Spawns a task that re-acquires the session cookie every `interval`
///
/// A failed refresh keeps the previous cookie.
pub fn spawn_refresh_loop(
    pool: HttpPool,
    base_url: String,
    cookie_name: String,
    session: SessionCookie,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; the caller already holds a fresh cookie
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match fetch_session_cookie(&pool, &base_url, &cookie_name).await {
                Ok(cookie) => {
                    session.set(cookie);
                    tracing::debug!("Refreshed session cookie");
                }
                Err(e) => tracing::debug!("Error refreshing session cookie: {}", e),
            }
        }
    })
}
