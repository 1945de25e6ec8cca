//! Deterministic client for tests and demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::{ClientError, LlmClient};

/// Response used when the table has no entry for a prompt.
pub const DEFAULT_RESPONSE: &str = "{}";

/// Message of injected failures unless overridden.
pub const DEFAULT_ERROR_MESSAGE: &str = "mock error";

/// Dynamic response builder: `(system_prompt, user_message) -> response`.
pub type ResponseFn = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

enum Responses {
    Table(HashMap<(String, String), String>),
    Function(ResponseFn),
}

/// Client answering from a fixed table or a function, with optional
/// simulated latency and random failures.
///
/// The failure draw happens before the latency, so a failing call returns
/// immediately.
pub struct MockClient {
    responses: Responses,
    latency: Duration,
    error_rate: f64,
    error_message: String,
    rng: Mutex<StdRng>,
    calls: AtomicU64,
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClient {
    /// A client with an empty response table: every call answers `"{}"`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_responses(Responses::Table(HashMap::new()))
    }

    /// A client computing each response with `respond`.
    #[must_use]
    pub fn from_fn<F>(respond: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self::with_responses(Responses::Function(Box::new(respond)))
    }

    fn with_responses(responses: Responses) -> Self {
        Self {
            responses,
            latency: Duration::ZERO,
            error_rate: 0.0,
            error_message: DEFAULT_ERROR_MESSAGE.to_owned(),
            rng: Mutex::new(StdRng::from_os_rng()),
            calls: AtomicU64::new(0),
        }
    }

    /// Answer `response` to the exact `(system, user)` pair.
    ///
    /// Has no effect on a client built with [`from_fn`](Self::from_fn).
    #[must_use]
    pub fn with_response(
        mut self,
        system: impl Into<String>,
        user: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        if let Responses::Table(table) = &mut self.responses {
            table.insert((system.into(), user.into()), response.into());
        }
        self
    }

    /// Delay every successful call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail each call with probability `rate`, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_error_rate(mut self, rate: f64) -> Self {
        self.error_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }

    /// Message carried by injected failures.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Seed the failure draw for reproducible runs.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of calls received so far, failed ones included.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn should_fail(&self) -> bool {
        self.error_rate > 0.0 && self.rng.lock().random::<f64>() < self.error_rate
    }

    fn respond(&self, system_prompt: &str, user_message: &str) -> String {
        match &self.responses {
            Responses::Function(respond) => respond(system_prompt, user_message),
            Responses::Table(table) => table
                .get(&(system_prompt.to_owned(), user_message.to_owned()))
                .cloned()
                .unwrap_or_else(|| DEFAULT_RESPONSE.to_owned()),
        }
    }
}

#[async_trait]
impl LlmClient for MockClient {
    async fn query(&self, system_prompt: &str, user_message: &str) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if self.should_fail() {
            return Err(ClientError::new(self.error_message.clone()));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.respond(system_prompt, user_message))
    }
}

impl std::fmt::Debug for MockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let responses = match &self.responses {
            Responses::Table(table) => format!("table({})", table.len()),
            Responses::Function(_) => "function".to_owned(),
        };
        f.debug_struct("MockClient")
            .field("responses", &responses)
            .field("latency", &self.latency)
            .field("error_rate", &self.error_rate)
            .field("error_message", &self.error_message)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}
