//! Poll-cycle orchestration: semaphore-bounded concurrent dispatch over a device batch, with
//! cancellation support.
//!
//! A cancellation token plus structured concurrency via `tokio::task::JoinSet`, in place of a
//! shutdown-flag polling loop.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Runs `poll_one(item)` for every item in `batch`, with at most `max_concurrent` running at
/// once, collecting per-item outcomes without letting one failure abort the rest of the batch
/// (spec §4.1: "collecting per-device failures without failing the batch").
///
/// Cancellation: if `cancel` fires, no new polls are dispatched and already-spawned tasks are
/// left to finish within their own I/O timeout budget, matching "each collector must return
/// within its own I/O timeout budget" (spec §4.1 contract).
pub async fn run_cycle<T, F, Fut, R>(
    batch: Vec<T>,
    max_concurrent: usize,
    cancel: CancellationToken,
    poll_one: F,
) -> Vec<R>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let poll_one = Arc::new(poll_one);
    let mut tasks = JoinSet::new();

    for item in batch {
        if cancel.is_cancelled() {
            break;
        }
        let semaphore = semaphore.clone();
        let poll_one = poll_one.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            poll_one(item).await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(r) => results.push(r),
            Err(e) => tracing::error!(error = %e, "poll task panicked"),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_every_item_and_collects_results() {
        let results = run_cycle(vec![1, 2, 3, 4, 5], 2, CancellationToken::new(), |n| async move {
            n * 10
        })
        .await;
        let mut sorted = results;
        sorted.sort();
        assert_eq!(sorted, vec![10, 20, 30, 40, 50]);
    }

    #[tokio::test]
    async fn respects_concurrency_cap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let batch: Vec<usize> = (0..20).collect();
        let in_flight_c = in_flight.clone();
        let max_seen_c = max_seen.clone();

        run_cycle(batch, 3, CancellationToken::new(), move |_n| {
            let in_flight = in_flight_c.clone();
            let max_seen = max_seen_c.clone();
            async move {
                let cur = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(cur, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn cancellation_stops_new_dispatch() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = run_cycle(vec![1, 2, 3], 2, cancel, |n| async move { n }).await;
        assert!(results.is_empty());
    }
}
