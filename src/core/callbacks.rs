//! Observer lists for dispatch, response and error events.
//!
//! Observers return [`AppResult`]; an `Err` or a panic from one observer is
//! logged and the remaining observers still run. Failures are never retried.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use super::{AppResult, ErrorKind, RequesterId, Tick};

/// Observer fired when a request is dispatched: `(requester, prompt_size, tick)`.
pub type QueryObserver = Box<dyn Fn(RequesterId, usize, Tick) -> AppResult<()> + Send + Sync>;

/// Observer fired when a response is parsed:
/// `(requester, latency_seconds, response_size, tick)`.
pub type ResponseObserver =
    Box<dyn Fn(RequesterId, f64, usize, Tick) -> AppResult<()> + Send + Sync>;

/// Observer fired on any failure: `(requester, kind, message, tick)`.
pub type ErrorObserver =
    Box<dyn Fn(RequesterId, ErrorKind, &str, Tick) -> AppResult<()> + Send + Sync>;

/// Ordered observer lists.
#[derive(Default)]
pub struct CallbackBus {
    on_query: Vec<QueryObserver>,
    on_response: Vec<ResponseObserver>,
    on_error: Vec<ErrorObserver>,
}

impl CallbackBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dispatch observer.
    pub fn on_query<F>(&mut self, observer: F)
    where
        F: Fn(RequesterId, usize, Tick) -> AppResult<()> + Send + Sync + 'static,
    {
        self.on_query.push(Box::new(observer));
    }

    /// Append a response observer.
    pub fn on_response<F>(&mut self, observer: F)
    where
        F: Fn(RequesterId, f64, usize, Tick) -> AppResult<()> + Send + Sync + 'static,
    {
        self.on_response.push(Box::new(observer));
    }

    /// Append an error observer.
    pub fn on_error<F>(&mut self, observer: F)
    where
        F: Fn(RequesterId, ErrorKind, &str, Tick) -> AppResult<()> + Send + Sync + 'static,
    {
        self.on_error.push(Box::new(observer));
    }

    /// Number of registered observers, across all three lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.on_query.len() + self.on_response.len() + self.on_error.len()
    }

    /// True if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify dispatch observers.
    pub fn fire_query(&self, requester: RequesterId, prompt_size: usize, tick: Tick) {
        for observer in &self.on_query {
            isolate("on_query", || observer(requester, prompt_size, tick));
        }
    }

    /// Notify response observers.
    pub fn fire_response(&self, requester: RequesterId, latency_secs: f64, size: usize, tick: Tick) {
        for observer in &self.on_response {
            isolate("on_response", || observer(requester, latency_secs, size, tick));
        }
    }

    /// Notify error observers.
    pub fn fire_error(&self, requester: RequesterId, kind: ErrorKind, message: &str, tick: Tick) {
        for observer in &self.on_error {
            isolate("on_error", || observer(requester, kind, message, tick));
        }
    }
}

impl std::fmt::Debug for CallbackBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackBus")
            .field("on_query", &self.on_query.len())
            .field("on_response", &self.on_response.len())
            .field("on_error", &self.on_error.len())
            .finish()
    }
}

fn isolate<F>(list: &'static str, call: F)
where
    F: FnOnce() -> AppResult<()>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(callback = list, error = %e, "callback error"),
        Err(panic) => error!(callback = list, panic = panic_message(&*panic), "callback panicked"),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
