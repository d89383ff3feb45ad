//! Timer-driven actions tied to the lifetime of their owner
//!
//! - [`DeferredAction`]: run a closure once after a delay, cancellable
//! - [`Debouncer`]: trailing-edge coalescing of bursts of calls
//! - [`LoadMoreTrigger`]: debounced "scrolled near the bottom" detection

mod debounce;
mod deferred;

pub use debounce::{Debouncer, LoadMoreTrigger, ScrollMetrics, LOAD_MORE_DELAY, LOAD_MORE_THRESHOLD};
pub use deferred::DeferredAction;
