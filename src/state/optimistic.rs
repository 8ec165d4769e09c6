use std::future::Future;

use crate::error::AppResult;

/// Runs a remote mutation behind an optimistic local change
///
/// `apply` runs before the remote call is started. If the call fails, `rollback`
/// reverts the local change and the error is returned to the caller, which
/// decides how to notify.
pub async fn optimistic<T, A, C, Fut, R>(apply: A, remote_call: C, rollback: R) -> AppResult<T>
where
    A: FnOnce(),
    C: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
    R: FnOnce(),
{
    apply();

    match remote_call().await {
        Ok(value) => Ok(value),
        Err(e) => {
            if e.requires_rollback() {
                tracing::warn!(error = %e, category = %e.category(), "Remote mutation failed, rolling back");
                rollback();
            }
            Err(e)
        }
    }
}
