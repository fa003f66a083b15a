//! Task dispatch and supervision
//!
//! The [`TaskExecutive`] runs each task on its own tokio task and tracks the
//! ones in flight by name, so a supervisor can abort a slew or an exposure
//! without holding on to the handle it dispatched.
//!
//! Tasks never retry on their own. [`TaskExecutive::run_with_retry`] is the
//! place where a [`RetryPolicy`] decides, per failure code, whether another
//! attempt is worth making.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS};
use crate::error::{ErrorCode, TaskError};
use crate::task::{lock, SharedTask, TaskState};

/// Which failures to retry, how often, and how long to wait in between
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts including the first run
    pub max_attempts: u32,
    /// Pause between attempts (milliseconds)
    pub backoff_ms: u64,
    /// Failure codes worth another attempt
    pub retryable: Vec<ErrorCode>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            retryable: vec![
                ErrorCode::Timeout,
                ErrorCode::ConnectFailure,
                ErrorCode::ResponseWaitFailure,
            ],
        }
    }
}

impl RetryPolicy {
    /// Run once, never retry
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn with_retryable(mut self, code: ErrorCode) -> Self {
        if !self.retryable.contains(&code) {
            self.retryable.push(code);
        }
        self
    }

    pub fn is_retryable(&self, code: ErrorCode) -> bool {
        self.retryable.contains(&code)
    }
}

/// Worker result for one dispatched run
pub type TaskJoin = JoinHandle<Result<TaskState, TaskError>>;

/// Spawns tasks and tracks the ones in flight
#[derive(Debug, Clone, Default)]
pub struct TaskExecutive {
    in_flight: Arc<Mutex<HashMap<String, SharedTask>>>,
}

impl TaskExecutive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise the task if needed and run it on its own worker
    ///
    /// Fails without spawning when a task of the same name is in flight or
    /// the task cannot be initialised. Must be called inside a tokio runtime.
    pub fn dispatch(&self, task: SharedTask) -> Result<TaskJoin, TaskError> {
        let name = task.name().to_string();
        {
            let mut in_flight = lock(&self.in_flight);
            if in_flight.contains_key(&name) {
                return Err(TaskError::AlreadyRunning(name));
            }
            in_flight.insert(name.clone(), Arc::clone(&task));
        }

        if task.state() == TaskState::Created {
            if let Err(err) = task.init() {
                lock(&self.in_flight).remove(&name);
                return Err(err);
            }
        }

        debug!("Dispatching task '{}'", name);
        let in_flight = Arc::clone(&self.in_flight);
        Ok(tokio::spawn(async move {
            let result = task.perform().await;
            lock(&in_flight).remove(task.name());
            result
        }))
    }

    /// Abort the named in-flight task
    pub fn abort(&self, name: &str) -> bool {
        let task = lock(&self.in_flight).get(name).cloned();
        match task {
            Some(task) => task.abort(),
            None => false,
        }
    }

    /// Abort every in-flight task that allows it; returns how many were aborted
    pub fn abort_all(&self) -> usize {
        let tasks: Vec<SharedTask> = lock(&self.in_flight).values().cloned().collect();
        let aborted = tasks.iter().filter(|task| task.abort()).count();
        if aborted > 0 {
            info!("Aborted {} of {} in-flight task(s)", aborted, tasks.len());
        }
        aborted
    }

    /// Names of in-flight tasks, sorted
    pub fn in_flight(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.in_flight).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_idle(&self) -> bool {
        lock(&self.in_flight).is_empty()
    }

    /// Run a task, resetting and re-running it while its failures are retryable
    ///
    /// Returns the state of the last attempt.
    pub async fn run_with_retry(
        &self,
        task: SharedTask,
        policy: &RetryPolicy,
    ) -> Result<TaskState, TaskError> {
        let mut attempt = 1;
        loop {
            let worker = self.dispatch(Arc::clone(&task))?;
            let state = worker.await.map_err(|err| TaskError::Worker {
                task: task.name().to_string(),
                reason: err.to_string(),
            })??;

            if state != TaskState::Failed {
                return Ok(state);
            }
            let code = match task.error() {
                Some(error) => error.code,
                None => return Ok(state),
            };
            if !policy.is_retryable(code) {
                debug!("Task '{}': {} is not retryable", task.name(), code);
                return Ok(state);
            }
            if attempt >= policy.max_attempts {
                warn!(
                    "Task '{}': giving up after {} attempt(s), last failure {}",
                    task.name(),
                    attempt,
                    code
                );
                return Ok(state);
            }

            info!(
                "Task '{}': attempt {} failed with {}, retrying in {} ms",
                task.name(),
                attempt,
                code,
                policy.backoff_ms
            );
            tokio::time::sleep(Duration::from_millis(policy.backoff_ms)).await;
            task.reset()?;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_classification() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(ErrorCode::Timeout));
        assert!(policy.is_retryable(ErrorCode::ConnectFailure));
        assert!(policy.is_retryable(ErrorCode::ResponseWaitFailure));

        assert!(!policy.is_retryable(ErrorCode::DispatchFailure));
        assert!(!policy.is_retryable(ErrorCode::GeneralProtocolException));
        assert!(!policy.is_retryable(ErrorCode::ConnectionResourceNotFound));
        assert!(!policy.is_retryable(ErrorCode::Remote(3)));
    }

    #[test]
    fn with_retryable_does_not_duplicate() {
        let policy = RetryPolicy::default()
            .with_retryable(ErrorCode::Timeout)
            .with_retryable(ErrorCode::Remote(7));
        assert_eq!(policy.retryable.len(), 4);
        assert!(policy.is_retryable(ErrorCode::Remote(7)));
    }

    #[test]
    fn never_runs_once() {
        assert_eq!(RetryPolicy::never().max_attempts, 1);
    }
}
