//! # Best-Effort Background Tasks
//!
//! Work whose outcome nobody waits for, such as priming the backend's models.
//! The caller gets no handle: failures are logged here and go no further.

use log::{debug, warn};
use std::future::Future;

/// Launch `task` on the current tokio runtime and forget about it.
///
/// An `Err` from the task is logged at `warn` under `label`. A panic inside the
/// task is contained by the runtime and also logged. Must be called from
/// within a runtime.
pub fn spawn_best_effort<F>(label: &'static str, task: F)
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        match task.await {
            Ok(()) => debug!("[{}] finished", label),
            Err(e) => warn!("[{}] failed: {:#}", label, e),
        }
    });

    // Watch for panics without handing the join handle to the caller.
    tokio::spawn(async move {
        if let Err(e) = handle.await {
            if e.is_panic() {
                warn!("[{}] panicked", label);
            }
        }
    });
}
