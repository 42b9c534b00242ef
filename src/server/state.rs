//! Shared handler state and the per-request deadline.

use crate::manager::LogManager;
use crate::policy::access::ApiKeyPolicy;
use crate::LicenseLogError;
use std::sync::Arc;
use std::time::Duration;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    manager: Arc<LogManager>,
    policy: ApiKeyPolicy,
    deadline: Duration,
}

impl AppState {
    /// Build state from a manager; the policy and deadline come from its config.
    pub fn new(manager: Arc<LogManager>) -> Self {
        let policy = ApiKeyPolicy::new(&manager.config().api_key);
        let deadline = manager.config().request_timeout;
        Self {
            manager,
            policy,
            deadline,
        }
    }

    /// Override the per-request deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// The API key policy.
    pub fn policy(&self) -> &ApiKeyPolicy {
        &self.policy
    }

    /// Whether debug-only routes are enabled.
    pub fn debug(&self) -> bool {
        self.manager.config().debug
    }

    /// Run a store-bound operation off the async runtime under the deadline.
    ///
    /// An operation that outlives the deadline keeps running to completion
    /// on its blocking thread; only the response is abandoned.
    pub async fn run<T, F>(&self, op: F) -> Result<T, LicenseLogError>
    where
        F: FnOnce(&LogManager) -> Result<T, LicenseLogError> + Send + 'static,
        T: Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        let task = tokio::task::spawn_blocking(move || op(&manager));

        match tokio::time::timeout(self.deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(LicenseLogError::Storage(format!(
                "store task failed: {}",
                join_err
            ))),
            Err(_) => Err(LicenseLogError::Timeout {
                after_ms: u64::try_from(self.deadline.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
