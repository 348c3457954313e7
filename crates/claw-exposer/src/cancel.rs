//! Caller-driven cancellation of collaborator calls.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ExposerError, Result};

/// Runs `fut` until it completes or `cancel` fires.
///
/// An already-cancelled token wins even if `fut` is immediately ready, so a
/// caller that gave up never receives a resolution result.
pub(crate) async fn run_cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ExposerError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Fails with [`ExposerError::Cancelled`] if the caller already gave up.
pub(crate) fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ExposerError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let out = run_cancellable(&cancel, async { 7 }).await.expect("completed");
        assert_eq!(out, 7);
        assert!(ensure_active(&cancel).is_ok());
    }

    #[tokio::test]
    async fn cancelled_token_wins_over_ready_future() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run_cancellable(&cancel, async { 7 }).await;
        assert!(matches!(result, Err(ExposerError::Cancelled)));
        assert!(ensure_active(&cancel).is_err());
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_future() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = run_cancellable(&cancel, std::future::pending::<()>()).await;
        assert!(matches!(result, Err(ExposerError::Cancelled)));
    }
}
