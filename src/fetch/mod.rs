//! Shared network layer: rate limiter, on-disk response cache, and the
//! retrying GET client every scraper depends on for network I/O.

mod cache;
mod client;
mod limiter;

pub use cache::{CachedResponse, ResponseCache};
pub use client::HttpClient;
pub use limiter::RateLimiter;
