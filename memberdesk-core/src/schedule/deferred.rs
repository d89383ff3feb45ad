//! Cancellable deferred action

use std::time::Duration;
use tokio::task::JoinHandle;

/// A closure scheduled to run once after a delay.
///
/// Cancelling, or dropping the handle, aborts the timer task, so the closure
/// never runs after its owner is gone. Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct DeferredAction {
    handle: Option<JoinHandle<()>>,
}

impl DeferredAction {
    /// Schedule `action` to run after `delay`
    pub fn schedule<F>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Whether the action has neither run nor been cancelled
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the action if it has not run yet
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for DeferredAction {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let action = DeferredAction::schedule(Duration::from_secs(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1_999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(action.is_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!action.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let mut action = DeferredAction::schedule(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        action.cancel();
        assert!(!action.is_pending());
        // Cancelling twice is harmless.
        action.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_prevents_run() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        drop(DeferredAction::schedule(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
