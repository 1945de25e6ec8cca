//! Executor abstraction run on worker threads.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ClientError, LlmClient, Prompt, TaskMetadata};

/// Executor trait for worker pools.
///
/// Result types need not be serializable; they only cross from the worker
/// thread back to the submitting thread.
///
/// # Threading
///
/// On native platforms, this method is called from a dedicated worker thread
/// with its own single-threaded tokio runtime, so blocking inside it stalls
/// only that worker.
#[async_trait]
pub trait WorkerExecutor<P, R>: Send + Sync + Clone + 'static
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Execute a task payload and return the result.
    async fn execute(&self, payload: P, meta: TaskMetadata) -> R;
}

/// One client call: the client that was active at dispatch plus the prompt.
///
/// Carrying the client in the job lets the registry swap clients between
/// ticks without touching requests already in flight.
#[derive(Clone)]
pub struct QueryJob {
    /// Client to call.
    pub client: Arc<dyn LlmClient>,
    /// Assembled prompt.
    pub prompt: Prompt,
}

impl std::fmt::Debug for QueryJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryJob")
            .field("prompt_size", &self.prompt.size())
            .finish_non_exhaustive()
    }
}

/// Executor that runs [`QueryJob`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor;

#[async_trait]
impl WorkerExecutor<QueryJob, Result<String, ClientError>> for QueryExecutor {
    async fn execute(&self, job: QueryJob, meta: TaskMetadata) -> Result<String, ClientError> {
        tracing::trace!(
            request_id = %meta.request_id,
            requester = meta.requester,
            "calling client"
        );
        job.client.query(&job.prompt.system, &job.prompt.user).await
    }
}
