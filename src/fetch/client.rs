//! The retrying HTTP GET client shared by all scrapers.
//!
//! Every call is paced by the global rate limiter, served from the on-disk
//! cache when possible, and retried on transient failures. Callers receive
//! `None` once retries are exhausted and treat it as "this unit of work
//! failed, skip it"; fetch failures never propagate as errors.

use crate::fetch::cache::{CachedResponse, ResponseCache};
use crate::fetch::limiter::RateLimiter;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_START: Duration = Duration::from_secs(2);
const BACKOFF_CAP: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "smbc-harvest/1.0";

/// Rate-limited, cached, retrying GET wrapper around `reqwest::Client`.
///
/// One instance is constructed per run and shared by reference (`Arc`)
/// across every scraper and their spawned tasks.
pub struct HttpClient {
    client: Client,
    limiter: RateLimiter,
    cache: ResponseCache,
}

impl HttpClient {
    /// Builds the client with the run's cache directory and request rate.
    ///
    /// # Arguments
    ///
    /// * `cache_dir` - Directory for the persistent response cache
    /// * `rate` - Maximum requests per second (validated > 0 at config entry)
    pub fn new(cache_dir: &Path, rate: f64) -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;
        let cache = ResponseCache::open(cache_dir)?;

        tracing::info!(
            "HTTP client ready. Rate limit: {} req/s, cache: {}",
            rate,
            cache_dir.display()
        );

        Ok(Self {
            client,
            limiter: RateLimiter::new(rate),
            cache,
        })
    }

    /// Performs a rate-limited, cached, retrying GET request.
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Cache hit | Returned immediately, no pacing |
    /// | HTTP 429 / 5xx | Retry up to 3 attempts, backoff 2s then 4s |
    /// | Timeout / connection error | Same retry schedule |
    /// | Any other status (2xx/3xx/4xx) | Returned as-is on first attempt |
    /// | Other transport error | `None` immediately |
    /// | Retries exhausted | `None` |
    pub async fn get(&self, url: &str) -> Option<CachedResponse> {
        if let Some(hit) = self.cache.load(url) {
            tracing::trace!("Cache hit for {}", url);
            return Some(hit);
        }

        self.limiter.wait().await;

        let mut backoff = BACKOFF_START;
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(BACKOFF_CAP);
            }
            tracing::debug!("GET {} (attempt {})", url, attempt);

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    tracing::warn!("GET {} failed ({}), will retry", url, e);
                    continue;
                }
                Err(e) => {
                    tracing::error!("Unexpected error fetching {}: {}", url, e);
                    return None;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                tracing::warn!("GET {} returned {}, will retry", url, status);
                continue;
            }

            let final_url = response.url().to_string();
            let body = match response.bytes().await {
                Ok(bytes) => bytes.to_vec(),
                Err(e) => {
                    tracing::warn!("Failed to read body from {} ({}), will retry", url, e);
                    continue;
                }
            };

            let cached = CachedResponse {
                status: status.as_u16(),
                final_url,
                body,
            };
            if cached.is_success() {
                if let Err(e) = self.cache.store(url, &cached) {
                    tracing::warn!("Failed to cache response for {}: {}", url, e);
                }
            }
            return Some(cached);
        }

        tracing::error!("Giving up on {} after {} attempts", url, MAX_ATTEMPTS);
        None
    }
}
