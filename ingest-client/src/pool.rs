//! Bounded worker pool.
//!
//! A fixed number of workers drain a shared cursor over the task list, so
//! fast workers claim more tasks than slow ones. Results are written into an
//! index-addressed buffer, keeping `result[i]` aligned with `items[i]` no
//! matter which worker finished first.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::try_join_all;
use tracing::trace;

/// Run `op` over every item with at most `limit` operations in flight.
///
/// Each item is processed exactly once. The first error aborts the whole
/// invocation: sibling workers are dropped and their results discarded.
/// A `limit` of zero is treated as one; a limit above `items.len()` is
/// clamped to it.
pub async fn parallel_limit<T, R, E, F, Fut>(items: &[T], limit: usize, op: F) -> Result<Vec<R>, E>
where
    F: Fn(&T, usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let workers = limit.clamp(1, items.len());
    let cursor = AtomicUsize::new(0);

    let worker_outputs = try_join_all((0..workers).map(|worker_id| {
        let cursor = &cursor;
        let op = &op;
        async move {
            let mut completed = Vec::new();
            loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(item) = items.get(index) else {
                    break;
                };
                trace!(worker_id, index, "Worker claimed task");
                completed.push((index, op(item, index).await?));
            }
            Ok::<_, E>(completed)
        }
    }))
    .await?;

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();
    for (index, result) in worker_outputs.into_iter().flatten() {
        slots[index] = Some(result);
    }

    // Every index below len is claimed by exactly one worker, and a worker
    // only stops after the cursor passes the end.
    Ok(slots.into_iter().flatten().collect())
}
