//! Bounded worker pool.
//!
//! A counting semaphore caps the number of in-flight tasks and a `JoinSet`
//! waits for all of them. Workers share no mutable state.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Pool size used when the caller has no better idea: the CPU count.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Run `f` over every item with at most `limit` tasks alive at once.
///
/// Results come back in input order. A panicking task re-raises its panic
/// on the caller once all tasks have been joined.
pub async fn for_each_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let f = Arc::new(f);
    let mut set = JoinSet::new();

    for (idx, item) in items.into_iter().enumerate() {
        // acquire before spawning so at most `limit` tasks exist
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let f = Arc::clone(&f);
        set.spawn(async move {
            let res = (*f)(item).await;
            drop(permit);
            (idx, res)
        });
    }

    let mut results = Vec::with_capacity(set.len());
    let mut panic = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(pair) => results.push(pair),
            Err(err) if err.is_panic() => {
                tracing::error!("worker task panicked");
                panic.get_or_insert(err.into_panic());
            }
            Err(err) => tracing::warn!("worker task cancelled: {}", err),
        }
    }
    if let Some(payload) = panic {
        std::panic::resume_unwind(payload);
    }

    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, r)| r).collect()
}
