//! Observer callbacks for router events.
//!
//! Router components report what they did — a retry, a cooldown promotion, a
//! cache sweep — by notifying a [`Listeners`] list. Every entry is a plain
//! closure over the event type; there is no listener trait to implement.
//! Callbacks are observational only: the routing pipeline never waits on
//! them, reads nothing back from them, and keeps going when one panics.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An ordered list of callbacks observing one event type.
pub struct Listeners<E> {
    callbacks: Vec<Callback<E>>,
}

impl<E> Listeners<E> {
    /// An empty list.
    pub fn new() -> Self {
        Self { callbacks: Vec::new() }
    }

    /// Appends a callback. Callbacks run in subscription order.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
    }

    /// Returns true if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Returns the number of subscribed callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}

impl<E: fmt::Debug> Listeners<E> {
    /// Runs every callback against `event`.
    ///
    /// A panicking callback is caught so the ones after it still run; the
    /// panic is reported through `tracing` and `metrics` when those
    /// features are enabled, and swallowed otherwise.
    pub fn notify(&self, event: &E) {
        for callback in &self.callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    event = ?event,
                    event_kind = std::any::type_name::<E>(),
                    "event callback panicked"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "llm_router_event_callback_panics_total",
                    "event_kind" => std::any::type_name::<E>()
                )
                .increment(1);
            }
        }
    }
}

impl<E> Clone for Listeners<E> {
    fn clone(&self) -> Self {
        Self { callbacks: self.callbacks.clone() }
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}
