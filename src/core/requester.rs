//! Per-requester scheduling record.

use serde::{Deserialize, Serialize};

/// Identifier of a requester (the host's entity id).
pub type RequesterId = u64;

/// Simulation tick number.
pub type Tick = u64;

/// Where a requester currently sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequesterStatus {
    /// Not in flight and not cooling down.
    Idle,
    /// A request is in flight.
    Pending,
    /// Retry budget exhausted; ineligible until the cooldown deadline.
    Cooling,
}

/// Scheduling record attached to one requester.
///
/// The names are resolved against the registry on every dispatch attempt, so
/// registry edits take effect immediately. Live fields are written only by the
/// scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterState {
    /// Role definition name.
    pub role: String,
    /// Personality definition name.
    pub personality: String,
    /// Context builder name.
    pub context: String,
    /// Parser name; `None` or an empty name selects the default JSON parser.
    pub parser: Option<String>,
    /// Minimum ticks between dispatches. 0 means every tick.
    pub query_interval: u64,
    /// Higher values dispatch first.
    pub priority: i32,
    /// Consecutive failures tolerated before a cooldown starts.
    pub max_retries: u32,
    /// Length of a cooldown, in ticks.
    pub cooldown_ticks: u64,
    /// Tick of the most recent dispatch.
    pub last_query_tick: Tick,
    /// True while a request is in flight.
    pub pending: bool,
    /// Failures since the last success.
    pub consecutive_errors: u32,
    /// Tick at which the current cooldown ends.
    pub cooldown_until: Tick,
}

impl RequesterState {
    /// Create a requester with default scheduling knobs.
    pub fn new(
        role: impl Into<String>,
        personality: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            personality: personality.into(),
            context: context.into(),
            parser: None,
            query_interval: 100,
            priority: 0,
            max_retries: 3,
            cooldown_ticks: 200,
            last_query_tick: 0,
            pending: false,
            consecutive_errors: 0,
            cooldown_until: 0,
        }
    }

    /// Name of the parser to run, or `None` for the default parser.
    ///
    /// An empty name selects the default parser.
    #[must_use]
    pub fn parser_name(&self) -> Option<&str> {
        self.parser.as_deref().filter(|name| !name.is_empty())
    }

    /// Use the named parser instead of the default one.
    #[must_use]
    pub fn with_parser(mut self, parser: impl Into<String>) -> Self {
        self.parser = Some(parser.into());
        self
    }

    /// Set the dispatch interval.
    #[must_use]
    pub const fn with_query_interval(mut self, ticks: u64) -> Self {
        self.query_interval = ticks;
        self
    }

    /// Set the dispatch priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the cooldown length.
    #[must_use]
    pub const fn with_cooldown_ticks(mut self, ticks: u64) -> Self {
        self.cooldown_ticks = ticks;
        self
    }

    /// True while the cooldown deadline lies ahead of `tick`.
    #[must_use]
    pub const fn in_cooldown(&self, tick: Tick) -> bool {
        self.cooldown_until > tick
    }

    /// True if the requester may be dispatched on `tick`.
    #[must_use]
    pub const fn is_eligible(&self, tick: Tick) -> bool {
        if self.pending || self.in_cooldown(tick) {
            return false;
        }
        self.query_interval == 0
            || tick.saturating_sub(self.last_query_tick) >= self.query_interval
    }

    /// Current lifecycle position.
    #[must_use]
    pub const fn status(&self, tick: Tick) -> RequesterStatus {
        if self.pending {
            RequesterStatus::Pending
        } else if self.in_cooldown(tick) {
            RequesterStatus::Cooling
        } else {
            RequesterStatus::Idle
        }
    }

    /// Count a recoverable failure observed on `tick`.
    ///
    /// Once the retry budget is reached the cooldown deadline is (re)computed
    /// from `tick`. Returns true if a cooldown was set.
    pub fn record_failure(&mut self, tick: Tick) -> bool {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        if self.consecutive_errors >= self.max_retries {
            self.cooldown_until = tick.saturating_add(self.cooldown_ticks);
            return true;
        }
        false
    }

    /// Count a success: the failure streak ends.
    pub const fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }
}
