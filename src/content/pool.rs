//! Bounded concurrent enrichment of feed items.
//!
//! Every dispatched job produces exactly one [`FetchResult`], whatever the
//! outcome. Results come back in completion order and are correlated with
//! their item purely by index in [`merge_results`].

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::feed::FetchError;

pub const DEFAULT_POOL_SIZE: usize = 3;

/// Result of enriching one item.
#[derive(Debug)]
pub struct FetchResult {
    pub index: usize,
    pub result: Result<String, FetchError>,
}

/// How jobs are launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// At most `n` fetches in flight at once.
    Pool(usize),
    /// One task per job, launched `delay` apart.
    Stagger(Duration),
}

impl Dispatch {
    /// `pool_size == 1` with a non-zero stagger selects stagger mode; anything
    /// else is a pool of `max(pool_size, 1)` workers.
    pub fn from_settings(pool_size: usize, stagger: Duration) -> Self {
        if pool_size == 1 && !stagger.is_zero() {
            Dispatch::Stagger(stagger)
        } else {
            Dispatch::Pool(pool_size.max(1))
        }
    }
}

/// Runs `work` for every `(index, url)` job and returns one result per job.
pub async fn run_jobs<F, Fut>(jobs: Vec<(usize, String)>, dispatch: Dispatch, work: F) -> Vec<FetchResult>
where
    F: Fn(usize, String) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<String, FetchError>> + Send + 'static,
{
    if jobs.is_empty() {
        return Vec::new();
    }

    match dispatch {
        Dispatch::Pool(size) => {
            tracing::debug!(jobs = jobs.len(), workers = size, "Dispatching to worker pool");
            stream::iter(jobs)
                .map(|(index, url)| {
                    let work = work.clone();
                    async move {
                        FetchResult {
                            index,
                            result: work(index, url).await,
                        }
                    }
                })
                .buffer_unordered(size)
                .collect()
                .await
        }
        Dispatch::Stagger(delay) => staggered(jobs, delay, work).await,
    }
}

async fn staggered<F, Fut>(jobs: Vec<(usize, String)>, delay: Duration, work: F) -> Vec<FetchResult>
where
    F: Fn(usize, String) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<String, FetchError>> + Send + 'static,
{
    let total = jobs.len();
    tracing::debug!(jobs = total, delay_ms = delay.as_millis() as u64, "Dispatching staggered");
    let (tx, mut rx) = mpsc::channel(total);

    for (launched, (index, url)) in jobs.into_iter().enumerate() {
        if launched > 0 {
            tokio::time::sleep(delay).await;
        }
        let tx = tx.clone();
        let work = work.clone();
        tokio::spawn(async move {
            let result = work(index, url).await;
            // Capacity equals the job count, so this never waits
            let _ = tx.send(FetchResult { index, result }).await;
        });
    }
    drop(tx);

    let mut results = Vec::with_capacity(total);
    while results.len() < total {
        match rx.recv().await {
            Some(result) => results.push(result),
            None => {
                // A task panicked before sending
                tracing::warn!(
                    received = results.len(),
                    expected = total,
                    "Result channel closed early"
                );
                break;
            }
        }
    }
    results
}

/// Places each successful result into the slot of its item index.
///
/// Errors and out-of-range indices leave their slot `None`; errors are
/// logged as a passthrough warning.
pub fn merge_results(results: Vec<FetchResult>, item_count: usize) -> Vec<Option<String>> {
    let mut slots: Vec<Option<String>> = vec![None; item_count];

    for FetchResult { index, result } in results {
        match result {
            Ok(content) => match slots.get_mut(index) {
                Some(slot) => *slot = Some(content),
                None => {
                    tracing::warn!(index, item_count, "Discarding result for unknown item");
                }
            },
            Err(e) => {
                tracing::warn!(index, error = %e, "Failed to enrich item, passing it through");
            }
        }
    }
    slots
}
