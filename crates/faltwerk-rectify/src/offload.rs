// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async offload for the correction pipelines. The correctors themselves are
// synchronous and CPU-bound; callers living inside an async runtime hand a
// whole correction to the blocking pool instead of stalling their executor.

use faltwerk_core::error::{FaltwerkError, Result};
use tracing::info_span;

/// Run a CPU-bound correction on the blocking thread pool.
///
/// `op` names the operation for the worker span so log lines emitted by the
/// correction carry their context. A panicking task surfaces as
/// [`FaltwerkError::Worker`] rather than unwinding into the caller.
pub async fn offload<T, F>(op: &'static str, task: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let span = info_span!("correction_worker", op);
    tokio::task::spawn_blocking(move || span.in_scope(task))
        .await
        .map_err(|err| FaltwerkError::Worker(format!("{op}: {err}")))
}
