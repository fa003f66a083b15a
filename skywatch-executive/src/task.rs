//! Supervised remote command execution
//!
//! ## Lifecycle
//!
//! ```text
//!   Created ──init──→ Initialized ──perform──→ Started ──→ AwaitingResponse ──┬──→ Done
//!      ▲                                                                      ├──→ Failed
//!      └──────────────────────────── reset ───────────────────────────────────┴──→ Aborted
//! ```
//!
//! - `init` asks the [`TaskHandler`] for its [`Command`] and fixes the bounded
//!   wait: `base_timeout_ms × fudge_factor + pad_ms`.
//! - `perform` opens a channel, sends the command and waits for replies. Every
//!   [`Ack`] restarts the wait using the remote estimate and the same formula;
//!   a [`Response`] ends it. If the wait expires the task fails with
//!   [`ErrorCode::Timeout`].
//! - `abort` is honoured only when the handler reports `can_abort()`. The
//!   worker is woken and asks the remote side to cancel. An abort that lands
//!   while connecting or sending stops the command from going out.
//! - `reset` returns a finished task to `Created` once its worker has exited;
//!   the run count survives.
//!
//! ## Notifications
//!
//! Every run that reaches a terminal state produces exactly one of
//! `sig_task_done`, `sig_task_failed` or `sig_task_aborted`. The terminal
//! transition happens under the task's lock and only the caller that performs
//! it notifies, so a reply racing an abort cannot produce two callbacks.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::{self, Instant};

use crate::connector::{Ack, Command, CommandChannel, CommandConnector, Reply, Response};
use crate::constants::{time_to_complete, DEFAULT_FUDGE_FACTOR, DEFAULT_PAD_MS, MESSAGE_ACK};
use crate::error::{ErrorCode, ErrorIndicator, TaskError};

/// Task handle shared between the executive, its worker and managers
pub type SharedTask = Arc<Task>;

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Created,
    Initialized,
    Started,
    AwaitingResponse,
    Done,
    Failed,
    Aborted,
}

impl TaskState {
    /// Done, Failed or Aborted
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Aborted)
    }

    /// A worker owns the task
    pub fn is_running(self) -> bool {
        matches!(self, Self::Started | Self::AwaitingResponse)
    }

    fn is_live(self) -> bool {
        self == Self::Initialized || self.is_running()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Initialized => "initialized",
            Self::Started => "started",
            Self::AwaitingResponse => "awaiting response",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Per-task timing and connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Multiplier on base and acknowledged completion times
    pub fudge_factor: f64,
    /// Fixed allowance added to every bounded wait (milliseconds)
    pub pad_ms: u64,
    /// Pause before the command is dispatched (milliseconds)
    pub startup_delay_ms: u64,
    /// Keep the channel open after a run for the next one
    pub keep_alive: bool,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            fudge_factor: DEFAULT_FUDGE_FACTOR,
            pad_ms: DEFAULT_PAD_MS,
            startup_delay_ms: 0,
            keep_alive: false,
        }
    }
}

/// Behaviour specific to one kind of task
///
/// Hooks run on whichever thread drives the transition: `on_abort` on the
/// caller of [`Task::abort`], the others on the task's worker.
pub trait TaskHandler: Send {
    /// Build the outgoing command
    fn on_init(&mut self) -> Result<Command, String>;

    /// Expected duration of the command before any acknowledgement
    fn base_timeout_ms(&self) -> u64;

    /// Whether [`Task::abort`] may interrupt this task
    fn can_abort(&self) -> bool {
        true
    }

    fn on_ack(&mut self, _ack: &Ack) {}

    fn on_done(&mut self, _response: &Response) {}

    fn on_failure(&mut self, _error: &ErrorIndicator) {}

    fn on_abort(&mut self) {}
}

/// Receiver of task outcomes
pub trait TaskManager: Send + Sync {
    fn sig_task_done(&self, task: &TaskReport);

    fn sig_task_failed(&self, task: &TaskReport);

    fn sig_task_aborted(&self, task: &TaskReport);

    /// Progress message; acknowledgements use [`MESSAGE_ACK`]
    fn sig_message(&self, _task: &TaskReport, _category: i32, _payload: &serde_json::Value) {}
}

/// Manager that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogManager;

impl TaskManager for LogManager {
    fn sig_task_done(&self, task: &TaskReport) {
        info!("Task '{}' done (run {})", task.name, task.run_count);
    }

    fn sig_task_failed(&self, task: &TaskReport) {
        match &task.error {
            Some(error) => warn!("Task '{}' failed: {}", task.name, error),
            None => warn!("Task '{}' failed", task.name),
        }
    }

    fn sig_task_aborted(&self, task: &TaskReport) {
        info!("Task '{}' aborted", task.name);
    }
}

/// Snapshot handed to managers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub name: String,
    pub state: TaskState,
    pub run_count: u32,
    pub time_to_complete_ms: u64,
    pub error: Option<ErrorIndicator>,
    /// Payload of the successful response
    #[serde(default)]
    pub payload: serde_json::Value,
}

enum Outcome {
    Done(Response),
    Failed(ErrorIndicator),
    Aborted,
}

#[derive(Debug)]
struct TaskCore {
    state: TaskState,
    command: Option<Command>,
    time_to_complete_ms: u64,
    error: Option<ErrorIndicator>,
    payload: serde_json::Value,
    run_count: u32,
    disposed: bool,
    /// A `perform` call owns the task, possibly already past its terminal state
    worker_active: bool,
}

/// Clears `worker_active` however `perform` exits, including when dropped
struct WorkerGuard<'a>(&'a Task);

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        lock(&self.0.core).worker_active = false;
    }
}

/// One remote command under supervision
pub struct Task {
    name: String,
    config: TaskConfig,
    handler: Mutex<Box<dyn TaskHandler>>,
    connector: Arc<dyn CommandConnector>,
    manager: Arc<dyn TaskManager>,
    core: Mutex<TaskCore>,
    abort_signal: Notify,
    channel: Mutex<Option<Box<dyn CommandChannel>>>,
}

impl Task {
    pub fn new<H: TaskHandler + 'static>(
        name: impl Into<String>,
        handler: H,
        connector: Arc<dyn CommandConnector>,
    ) -> Self {
        Self {
            name: name.into(),
            config: TaskConfig::default(),
            handler: Mutex::new(Box::new(handler)),
            connector,
            manager: Arc::new(LogManager),
            core: Mutex::new(TaskCore {
                state: TaskState::Created,
                command: None,
                time_to_complete_ms: 0,
                error: None,
                payload: serde_json::Value::Null,
                run_count: 0,
                disposed: false,
                worker_active: false,
            }),
            abort_signal: Notify::new(),
            channel: Mutex::new(None),
        }
    }

    pub fn with_manager(mut self, manager: Arc<dyn TaskManager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn with_config(mut self, config: TaskConfig) -> Self {
        self.config = config;
        self
    }

    pub fn shared(self) -> SharedTask {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn state(&self) -> TaskState {
        lock(&self.core).state
    }

    /// Number of times `perform` has started, across resets
    pub fn run_count(&self) -> u32 {
        lock(&self.core).run_count
    }

    /// Current bounded wait (milliseconds)
    pub fn time_to_complete_ms(&self) -> u64 {
        lock(&self.core).time_to_complete_ms
    }

    pub fn error(&self) -> Option<ErrorIndicator> {
        lock(&self.core).error.clone()
    }

    pub fn can_abort(&self) -> bool {
        lock(&self.handler).can_abort()
    }

    pub fn report(&self) -> TaskReport {
        self.snapshot(&lock(&self.core))
    }

    /// Build the command and fix the bounded wait
    pub fn init(&self) -> Result<(), TaskError> {
        self.check(TaskState::Created, "init")?;

        let (command, base_ms) = {
            let mut handler = lock(&self.handler);
            let command = handler.on_init().map_err(|reason| TaskError::Init {
                task: self.name.clone(),
                reason,
            })?;
            (command, handler.base_timeout_ms())
        };
        let ttc = time_to_complete(base_ms, self.config.fudge_factor, self.config.pad_ms);

        let mut core = lock(&self.core);
        if core.state != TaskState::Created {
            return Err(self.invalid(core.state, "init"));
        }
        debug!(
            "Task '{}': {} on '{}', time to complete {} ms",
            self.name, command.name, command.resource, ttc
        );
        core.command = Some(command);
        core.time_to_complete_ms = ttc;
        core.state = TaskState::Initialized;
        Ok(())
    }

    /// Run the command to a terminal state
    ///
    /// Returns the terminal state. Remote and transport failures are not
    /// errors here: they end the run in [`TaskState::Failed`] and reach the
    /// manager. `Err` is reserved for lifecycle misuse.
    pub async fn perform(&self) -> Result<TaskState, TaskError> {
        let (command, ttc) = {
            let mut core = lock(&self.core);
            if core.disposed {
                return Err(TaskError::Disposed(self.name.clone()));
            }
            let command = match (core.state, core.command.clone()) {
                (TaskState::Initialized, Some(command)) => command,
                (state, _) => return Err(self.invalid(state, "perform")),
            };
            core.state = TaskState::Started;
            core.run_count += 1;
            core.worker_active = true;
            (command, core.time_to_complete_ms)
        };
        let _worker = WorkerGuard(self);
        info!(
            "Task '{}': run {} dispatching {} to '{}'",
            self.name,
            self.run_count(),
            command.name,
            command.resource
        );

        if self.config.startup_delay_ms > 0 && !self.startup_delay().await {
            return Ok(self.state());
        }

        let cached = lock(&self.channel).take();
        let mut channel = match cached {
            Some(channel) => channel,
            None => {
                let connected = tokio::select! {
                    biased;
                    _ = self.aborted() => None,
                    result = self.connector.connect(&command.resource) => Some(result),
                };
                match connected {
                    None => {
                        debug!("Task '{}': aborted while connecting", self.name);
                        return Ok(self.state());
                    }
                    Some(Ok(channel)) => channel,
                    Some(Err(err)) => {
                        self.finish(Outcome::Failed(ErrorIndicator::from_connect(
                            &command.resource,
                            err,
                        )));
                        return Ok(self.state());
                    }
                }
            }
        };

        // An abort that landed while connecting wins here, before anything is sent
        let sent = tokio::select! {
            biased;
            _ = self.aborted() => None,
            result = channel.send(&command) => Some(result),
        };
        match sent {
            None => {
                debug!("Task '{}': aborted before dispatch completed", self.name);
                if let Err(err) = channel.cancel().await {
                    warn!("Task '{}': cancel failed: {}", self.name, err);
                }
                return Ok(self.state());
            }
            Some(Err(err)) => {
                let error = ErrorIndicator::new(
                    ErrorCode::DispatchFailure,
                    format!("cannot send {} to '{}'", command.name, command.resource),
                )
                .with_cause(err);
                self.finish(Outcome::Failed(error));
                return Ok(self.state());
            }
            Some(Ok(())) => {}
        }

        {
            let mut core = lock(&self.core);
            if core.state == TaskState::Started {
                core.state = TaskState::AwaitingResponse;
            }
        }

        self.await_replies(channel.as_mut(), ttc).await;

        let state = self.state();
        if state == TaskState::Aborted {
            if let Err(err) = channel.cancel().await {
                warn!("Task '{}': cancel failed: {}", self.name, err);
            }
        } else if self.config.keep_alive && self.channel_reusable() {
            *lock(&self.channel) = Some(channel);
        }
        Ok(state)
    }

    /// Abort a live task; no-op unless the handler allows it
    ///
    /// Returns `true` when this call moved the task to `Aborted`.
    pub fn abort(&self) -> bool {
        if !self.can_abort() {
            debug!("Task '{}': abort ignored, task cannot be aborted", self.name);
            return false;
        }
        if !self.finish(Outcome::Aborted) {
            return false;
        }
        self.abort_signal.notify_one();
        true
    }

    /// Return a finished or unstarted task to `Created`
    pub fn reset(&self) -> Result<(), TaskError> {
        let mut core = lock(&self.core);
        if core.disposed {
            return Err(TaskError::Disposed(self.name.clone()));
        }
        if core.state.is_running() || core.worker_active {
            return Err(self.invalid(core.state, "reset"));
        }
        core.state = TaskState::Created;
        core.command = None;
        core.time_to_complete_ms = 0;
        core.error = None;
        core.payload = serde_json::Value::Null;
        Ok(())
    }

    /// Release the kept-alive channel and refuse further runs
    pub fn dispose(&self) {
        if self.state().is_running() {
            self.abort();
        }
        lock(&self.core).disposed = true;
        lock(&self.channel).take();
        debug!("Task '{}' disposed", self.name);
    }

    /// Sleep out the startup delay; `false` if aborted meanwhile
    async fn startup_delay(&self) -> bool {
        let delay = Duration::from_millis(self.config.startup_delay_ms);
        tokio::select! {
            biased;
            _ = self.aborted() => false,
            _ = time::sleep(delay) => true,
        }
    }

    /// Resolves once the task is `Aborted`
    ///
    /// Stale permits left by an earlier run's abort are skipped. An abort
    /// between the state check and the wait leaves a permit, so it is not lost.
    async fn aborted(&self) {
        loop {
            if self.state() == TaskState::Aborted {
                return;
            }
            self.abort_signal.notified().await;
        }
    }

    async fn await_replies(&self, channel: &mut dyn CommandChannel, mut ttc: u64) {
        let started = Instant::now();
        let mut deadline = started + Duration::from_millis(ttc);

        loop {
            tokio::select! {
                biased;
                _ = self.aborted() => return,
                reply = time::timeout_at(deadline, channel.next_reply()) => match reply {
                    Err(_) => {
                        let waited = started.elapsed().as_millis();
                        let error = ErrorIndicator::new(
                            ErrorCode::Timeout,
                            format!("no reply within {} ms (waited {} ms)", ttc, waited),
                        );
                        self.finish(Outcome::Failed(error));
                        return;
                    }
                    Ok(Ok(Reply::Ack(ack))) => {
                        ttc = time_to_complete(
                            ack.time_to_complete_ms,
                            self.config.fudge_factor,
                            self.config.pad_ms,
                        );
                        deadline = Instant::now() + Duration::from_millis(ttc);
                        self.acknowledge(&ack, ttc);
                    }
                    Ok(Ok(Reply::Done(response))) => {
                        let outcome = if response.success {
                            Outcome::Done(response)
                        } else {
                            Outcome::Failed(ErrorIndicator::new(
                                ErrorCode::Remote(response.error_code),
                                response.error_message,
                            ))
                        };
                        self.finish(outcome);
                        return;
                    }
                    Ok(Err(err)) => {
                        self.finish(Outcome::Failed(ErrorIndicator::from_wait(err)));
                        return;
                    }
                },
            }
        }
    }

    fn acknowledge(&self, ack: &Ack, ttc: u64) {
        let report = {
            let mut core = lock(&self.core);
            if core.state.is_terminal() {
                return;
            }
            core.time_to_complete_ms = ttc;
            self.snapshot(&core)
        };
        debug!(
            "Task '{}': ack, {} ms remaining, waiting up to {} ms",
            self.name, ack.time_to_complete_ms, ttc
        );
        lock(&self.handler).on_ack(ack);
        let payload = serde_json::json!({
            "time_to_complete_ms": ack.time_to_complete_ms,
            "message": ack.message,
        });
        self.manager.sig_message(&report, MESSAGE_ACK, &payload);
    }

    /// Move a live task to its terminal state and notify once
    fn finish(&self, outcome: Outcome) -> bool {
        let report = {
            let mut core = lock(&self.core);
            if !core.state.is_live() {
                return false;
            }
            match &outcome {
                Outcome::Done(response) => {
                    core.state = TaskState::Done;
                    core.payload = response.payload.clone();
                }
                Outcome::Failed(error) => {
                    core.state = TaskState::Failed;
                    core.error = Some(error.clone());
                }
                Outcome::Aborted => core.state = TaskState::Aborted,
            }
            self.snapshot(&core)
        };

        {
            let mut handler = lock(&self.handler);
            match &outcome {
                Outcome::Done(response) => handler.on_done(response),
                Outcome::Failed(error) => handler.on_failure(error),
                Outcome::Aborted => handler.on_abort(),
            }
        }

        match outcome {
            Outcome::Done(_) => {
                info!("Task '{}' done", self.name);
                self.manager.sig_task_done(&report);
            }
            Outcome::Failed(error) => {
                warn!("Task '{}' failed: {}", self.name, error);
                self.manager.sig_task_failed(&report);
            }
            Outcome::Aborted => {
                info!("Task '{}' aborted", self.name);
                self.manager.sig_task_aborted(&report);
            }
        }
        true
    }

    /// Healthy after a completed exchange
    fn channel_reusable(&self) -> bool {
        let core = lock(&self.core);
        match core.state {
            TaskState::Done => true,
            TaskState::Failed => matches!(
                core.error.as_ref().map(|e| e.code),
                Some(ErrorCode::Remote(_))
            ),
            _ => false,
        }
    }

    fn check(&self, expected: TaskState, operation: &'static str) -> Result<(), TaskError> {
        let core = lock(&self.core);
        if core.disposed {
            return Err(TaskError::Disposed(self.name.clone()));
        }
        if core.state != expected {
            return Err(self.invalid(core.state, operation));
        }
        Ok(())
    }

    fn invalid(&self, state: TaskState, operation: &'static str) -> TaskError {
        TaskError::InvalidState {
            task: self.name.clone(),
            state,
            operation,
        }
    }

    fn snapshot(&self, core: &TaskCore) -> TaskReport {
        TaskReport {
            name: self.name.clone(),
            state: core.state,
            run_count: core.run_count,
            time_to_complete_ms: core.time_to_complete_ms,
            error: core.error.clone(),
            payload: core.payload.clone(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("core", &*lock(&self.core))
            .finish()
    }
}

pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("recovering poisoned lock");
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use async_trait::async_trait;

    struct Park;

    #[async_trait]
    impl CommandConnector for Park {
        async fn connect(&self, resource: &str) -> Result<Box<dyn CommandChannel>, ConnectorError> {
            Err(ConnectorError::ResourceNotFound(resource.to_string()))
        }
    }

    struct Slew {
        base_ms: u64,
        abortable: bool,
    }

    impl TaskHandler for Slew {
        fn on_init(&mut self) -> Result<Command, String> {
            Ok(Command::new("tcs", "SLEW"))
        }

        fn base_timeout_ms(&self) -> u64 {
            self.base_ms
        }

        fn can_abort(&self) -> bool {
            self.abortable
        }
    }

    fn slew(abortable: bool) -> Task {
        Task::new(
            "slew",
            Slew {
                base_ms: 20_000,
                abortable,
            },
            Arc::new(Park),
        )
    }

    #[test]
    fn init_fixes_time_to_complete() {
        let task = slew(true);
        task.init().unwrap();
        assert_eq!(task.state(), TaskState::Initialized);
        assert_eq!(task.time_to_complete_ms(), 32_000);
    }

    #[test]
    fn init_twice_is_rejected() {
        let task = slew(true);
        task.init().unwrap();
        assert!(matches!(
            task.init(),
            Err(TaskError::InvalidState {
                state: TaskState::Initialized,
                operation: "init",
                ..
            })
        ));
    }

    #[test]
    fn abort_before_perform() {
        let task = slew(true);
        assert!(!task.abort());
        task.init().unwrap();
        assert!(task.abort());
        assert_eq!(task.state(), TaskState::Aborted);
        assert!(!task.abort());
    }

    #[test]
    fn abort_is_noop_when_not_abortable() {
        let task = slew(false);
        task.init().unwrap();
        assert!(!task.abort());
        assert_eq!(task.state(), TaskState::Initialized);
    }

    #[tokio::test]
    async fn unknown_resource_fails_run() {
        let task = slew(true);
        task.init().unwrap();
        assert_eq!(task.perform().await.unwrap(), TaskState::Failed);
        assert_eq!(
            task.error().unwrap().code,
            ErrorCode::ConnectionResourceNotFound
        );
        assert_eq!(task.run_count(), 1);
    }

    #[tokio::test]
    async fn reset_keeps_run_count() {
        let task = slew(true);
        task.init().unwrap();
        task.perform().await.unwrap();
        task.reset().unwrap();
        assert_eq!(task.state(), TaskState::Created);
        assert_eq!(task.error(), None);
        assert_eq!(task.run_count(), 1);
    }

    #[tokio::test]
    async fn perform_requires_init() {
        let task = slew(true);
        assert!(matches!(
            task.perform().await,
            Err(TaskError::InvalidState {
                operation: "perform",
                ..
            })
        ));
    }

    #[test]
    fn disposed_task_refuses_init() {
        let task = slew(true);
        task.dispose();
        assert_eq!(task.init(), Err(TaskError::Disposed("slew".into())));
    }
}
