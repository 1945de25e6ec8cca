//! The client capability the scheduler drives on its worker pool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ClientError;

/// An assembled request: system text plus user text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Role and personality text.
    pub system: String,
    /// Requester-specific context text.
    pub user: String,
}

impl Prompt {
    /// Create a prompt.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Size reported to `on_query` observers, in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.system.len() + self.user.len()
    }
}

/// String-in/string-out backend the scheduler issues requests against.
///
/// Calls run on a dedicated worker thread, driven by that thread's own
/// single-threaded tokio runtime, so implementations may await network I/O or
/// simply block. They must not touch requester state: the scheduler's tick
/// thread is the only writer.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use tick_llm::core::{ClientError, LlmClient};
///
/// struct Echo;
///
/// #[async_trait]
/// impl LlmClient for Echo {
///     async fn query(&self, _system: &str, user: &str) -> Result<String, ClientError> {
///         Ok(format!("{{\"echo\": {user:?}}}"))
///     }
/// }
/// ```
#[async_trait]
pub trait LlmClient: Send + Sync + 'static {
    /// Send a prompt and return the raw response text.
    async fn query(&self, system_prompt: &str, user_message: &str) -> Result<String, ClientError>;
}
