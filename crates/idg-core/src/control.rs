//! Session cancellation signal.
//!
//! One `CancelHandle` per session, held by the orchestrator; every task
//! (dispatcher, workers, retry loops) holds a `CancelToken`. Raising is
//! one-way. Dropping the handle counts as raised, so tasks never outlive an
//! abandoned session.

use tokio::sync::watch;

/// Creates a connected handle/token pair in the "not raised" state.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelToken(rx))
}

#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn raise(&self) {
        self.0.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken(self.0.subscribe())
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    pub fn is_raised(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }

    /// Resolves once the signal is raised or the handle is gone.
    pub async fn raised(&mut self) {
        let _ = self.0.wait_for(|raised| *raised).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn raise_wakes_waiters() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_raised());
        let mut waiter = token.clone();
        let task = tokio::spawn(async move { waiter.raised().await });
        handle.raise();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter woke")
            .unwrap();
        assert!(token.is_raised());
    }

    #[tokio::test]
    async fn dropped_handle_counts_as_raised() {
        let (handle, mut token) = cancel_pair();
        drop(handle);
        assert!(token.is_raised());
        tokio::time::timeout(Duration::from_secs(1), token.raised())
            .await
            .expect("resolves without a handle");
    }
}
