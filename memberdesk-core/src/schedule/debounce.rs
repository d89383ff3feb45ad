//! Trailing-edge debouncing

use super::deferred::DeferredAction;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Coalesces bursts of calls: the callback runs once, `delay` after the last
/// call of a burst, with the value passed to that last call. Nothing fires on
/// the leading edge.
pub struct Debouncer<T> {
    delay: Duration,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    pending: Mutex<Option<DeferredAction>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delay,
            callback: Arc::new(callback),
            pending: Mutex::new(None),
        }
    }

    /// Record a call, restarting the window. Must be called inside a tokio
    /// runtime.
    pub fn call(&self, value: T) {
        let callback = self.callback.clone();
        let next = DeferredAction::schedule(self.delay, move || callback(value));

        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        // Dropping the previous action aborts it.
        *pending = Some(next);
    }

    /// Discard a pending fire, if any
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(mut action) = pending.take() {
            action.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        pending.as_ref().is_some_and(DeferredAction::is_pending)
    }
}

/// Delay of the load-more debouncer
pub const LOAD_MORE_DELAY: Duration = Duration::from_millis(50);

/// Distance from the bottom, in pixels, at which more items are requested
pub const LOAD_MORE_THRESHOLD: f64 = 50.0;

/// Scroll position of a list viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub client_height: f64,
    pub scroll_height: f64,
    pub scroll_top: f64,
}

impl ScrollMetrics {
    pub fn near_bottom(&self) -> bool {
        self.client_height + self.scroll_top > self.scroll_height - LOAD_MORE_THRESHOLD
    }
}

/// Requests the next page when a list is scrolled close to its end.
///
/// Scroll events are debounced; only the last event of a burst is checked.
pub struct LoadMoreTrigger {
    debouncer: Debouncer<ScrollMetrics>,
}

impl LoadMoreTrigger {
    pub fn new<F>(on_load_more: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            debouncer: Debouncer::new(LOAD_MORE_DELAY, move |metrics: ScrollMetrics| {
                if metrics.near_bottom() {
                    on_load_more();
                }
            }),
        }
    }

    pub fn on_scroll(&self, metrics: ScrollMetrics) {
        self.debouncer.call(metrics);
    }

    pub fn cancel(&self) {
        self.debouncer.cancel();
    }
}
