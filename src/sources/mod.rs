//! Source scrapers.
//!
//! Each scraper exclusively owns the construction and validation of the
//! records it emits; there is no shared record store across sources. The
//! ID-range scrapers (smbc, wiki) share the bounded fan-out below; the
//! search aggregator runs its queries strictly sequentially; the local
//! ingest never touches the network.

pub mod local;
pub mod ohnorobot;
pub mod smbc;
pub mod wiki;

use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Maximum number of in-flight per-ID scrapes.
pub(crate) const MAX_IN_FLIGHT: usize = 8;

/// Dispatches one unit of work per ID under a bounded concurrency limit and
/// collects results as they complete.
///
/// Tasks are spawned in ID order but may finish in any order; the returned
/// vector is in completion order and callers sort it explicitly. A unit that
/// returns `None` contributes nothing; a unit that panics is caught at the
/// join boundary and logged, so one bad page never aborts a range scrape.
pub(crate) async fn scrape_ids_bounded<T, F, Fut>(
    ids: RangeInclusive<u32>,
    scrape_one: F,
) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Option<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let mut tasks = JoinSet::new();

    for id in ids {
        let semaphore = semaphore.clone();
        let unit = scrape_one(id);
        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return None;
            };
            unit.await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(result)) => results.push(result),
            Ok(None) => {}
            Err(e) => tracing::error!("Scrape task failed: {}", e),
        }
    }
    results
}
