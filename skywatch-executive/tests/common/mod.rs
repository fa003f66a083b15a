//! Common test utilities for task integration tests
//!
//! This module provides:
//! - A scripted connector whose channels replay canned replies on a timeline
//! - A recording manager capturing every callback, and one that aborts its
//!   task from inside the acknowledgement callback
//! - A configurable task handler

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use skywatch_executive::{
    Ack, Command, CommandChannel, CommandConnector, ConnectorError, Reply, Response, SharedTask,
    Task, TaskConfig, TaskHandler, TaskManager, TaskReport,
};

/// One reply, delivered `after_ms` after the previous one (or the send)
pub struct Step {
    pub after_ms: u64,
    pub reply: Result<Reply, ConnectorError>,
}

pub fn ack_after(after_ms: u64, time_to_complete_ms: u64) -> Step {
    Step {
        after_ms,
        reply: Ok(Reply::Ack(Ack::new(time_to_complete_ms))),
    }
}

pub fn done_after(after_ms: u64) -> Step {
    Step {
        after_ms,
        reply: Ok(Reply::Done(Response::success(serde_json::json!({"ok": true})))),
    }
}

pub fn failure_after(after_ms: u64, code: i32, message: &str) -> Step {
    Step {
        after_ms,
        reply: Ok(Reply::Done(Response::failure(code, message))),
    }
}

pub fn error_after(after_ms: u64, err: ConnectorError) -> Step {
    Step {
        after_ms,
        reply: Err(err),
    }
}

/// What one `connect` call yields
pub enum Script {
    /// Connecting fails
    Refuse(ConnectorError),
    /// Connecting succeeds; sending fails
    RejectSend(ConnectorError),
    /// Replies in order, then silence
    Replies(Vec<Step>),
    /// Like `Replies`, with connecting and sending each taking a while
    Slow {
        connect_ms: u64,
        send_ms: u64,
        replies: Vec<Step>,
    },
}

/// Shared record of what the connector and its channels were asked to do
pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    journal: Journal,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            journal: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.journal().iter().filter(|e| e.starts_with(entry)).count()
    }
}

#[async_trait]
impl CommandConnector for ScriptedConnector {
    async fn connect(&self, resource: &str) -> Result<Box<dyn CommandChannel>, ConnectorError> {
        self.journal.lock().unwrap().push(format!("connect {}", resource));
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            None => Err(ConnectorError::Connect("no script left".into())),
            Some(Script::Refuse(err)) => Err(err),
            Some(Script::RejectSend(err)) => Ok(Box::new(ScriptedChannel {
                send_error: Some(err),
                send_ms: 0,
                steps: VecDeque::new(),
                ready_at: None,
                journal: self.journal.clone(),
            })),
            Some(Script::Replies(steps)) => Ok(Box::new(ScriptedChannel {
                send_error: None,
                send_ms: 0,
                steps: steps.into(),
                ready_at: None,
                journal: self.journal.clone(),
            })),
            Some(Script::Slow {
                connect_ms,
                send_ms,
                replies,
            }) => {
                tokio::time::sleep(Duration::from_millis(connect_ms)).await;
                Ok(Box::new(ScriptedChannel {
                    send_error: None,
                    send_ms,
                    steps: replies.into(),
                    ready_at: None,
                    journal: self.journal.clone(),
                }))
            }
        }
    }
}

struct ScriptedChannel {
    send_error: Option<ConnectorError>,
    send_ms: u64,
    steps: VecDeque<Step>,
    ready_at: Option<Instant>,
    journal: Journal,
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    async fn send(&mut self, command: &Command) -> Result<(), ConnectorError> {
        if self.send_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.send_ms)).await;
        }
        self.journal.lock().unwrap().push(format!("send {}", command.name));
        match self.send_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn next_reply(&mut self) -> Result<Reply, ConnectorError> {
        let after_ms = match self.steps.front() {
            Some(step) => step.after_ms,
            None => return std::future::pending().await,
        };
        let at = *self
            .ready_at
            .get_or_insert_with(|| Instant::now() + Duration::from_millis(after_ms));
        tokio::time::sleep_until(at).await;

        self.ready_at = None;
        match self.steps.pop_front() {
            Some(step) => step.reply,
            None => std::future::pending().await,
        }
    }

    async fn cancel(&mut self) -> Result<(), ConnectorError> {
        self.journal.lock().unwrap().push("cancel".into());
        Ok(())
    }
}

/// Manager recording `(callback, report)` pairs
#[derive(Default)]
pub struct RecordingManager {
    calls: Mutex<Vec<(String, TaskReport)>>,
}

impl RecordingManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Callback names in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn reports(&self) -> Vec<TaskReport> {
        self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    /// Terminal notifications only
    pub fn terminal(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != "message")
            .collect()
    }

    fn record(&self, call: &str, task: &TaskReport) {
        self.calls.lock().unwrap().push((call.to_string(), task.clone()));
    }
}

impl TaskManager for RecordingManager {
    fn sig_task_done(&self, task: &TaskReport) {
        self.record("done", task);
    }

    fn sig_task_failed(&self, task: &TaskReport) {
        self.record("failed", task);
    }

    fn sig_task_aborted(&self, task: &TaskReport) {
        self.record("aborted", task);
    }

    fn sig_message(&self, task: &TaskReport, category: i32, _payload: &serde_json::Value) {
        assert_eq!(category, skywatch_executive::MESSAGE_ACK);
        self.record("message", task);
    }
}

/// Records like [`RecordingManager`] and aborts the task on its first ack
pub struct AbortOnAck {
    pub recording: Arc<RecordingManager>,
    task: Mutex<Option<SharedTask>>,
    pub aborted: Mutex<Option<bool>>,
}

impl AbortOnAck {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            recording: RecordingManager::new(),
            task: Mutex::new(None),
            aborted: Mutex::new(None),
        })
    }

    pub fn attach(&self, task: SharedTask) {
        *self.task.lock().unwrap() = Some(task);
    }
}

impl TaskManager for AbortOnAck {
    fn sig_task_done(&self, task: &TaskReport) {
        self.recording.sig_task_done(task);
    }

    fn sig_task_failed(&self, task: &TaskReport) {
        self.recording.sig_task_failed(task);
    }

    fn sig_task_aborted(&self, task: &TaskReport) {
        self.recording.sig_task_aborted(task);
    }

    fn sig_message(&self, task: &TaskReport, category: i32, payload: &serde_json::Value) {
        self.recording.sig_message(task, category, payload);
        let target = self.task.lock().unwrap().take();
        if let Some(target) = target {
            *self.aborted.lock().unwrap() = Some(target.abort());
        }
    }
}

/// Handler sending one fixed command
pub struct CommandHandler {
    pub command: Command,
    pub base_ms: u64,
    pub abortable: bool,
    pub hooks: Arc<Mutex<Vec<&'static str>>>,
}

impl CommandHandler {
    pub fn new(resource: &str, name: &str, base_ms: u64) -> Self {
        Self {
            command: Command::new(resource, name),
            base_ms,
            abortable: true,
            hooks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn not_abortable(mut self) -> Self {
        self.abortable = false;
        self
    }
}

impl TaskHandler for CommandHandler {
    fn on_init(&mut self) -> Result<Command, String> {
        self.hooks.lock().unwrap().push("init");
        Ok(self.command.clone())
    }

    fn base_timeout_ms(&self) -> u64 {
        self.base_ms
    }

    fn can_abort(&self) -> bool {
        self.abortable
    }

    fn on_ack(&mut self, _ack: &Ack) {
        self.hooks.lock().unwrap().push("ack");
    }

    fn on_done(&mut self, _response: &Response) {
        self.hooks.lock().unwrap().push("done");
    }

    fn on_failure(&mut self, _error: &skywatch_executive::ErrorIndicator) {
        self.hooks.lock().unwrap().push("failure");
    }

    fn on_abort(&mut self) {
        self.hooks.lock().unwrap().push("abort");
    }
}

/// Task named `name` slewing the telescope, wired to a connector and manager
pub fn slew_task(
    connector: Arc<ScriptedConnector>,
    manager: Arc<RecordingManager>,
    base_ms: u64,
) -> Task {
    Task::new("slew", CommandHandler::new("tcs", "SLEW", base_ms), connector)
        .with_manager(manager)
}

pub fn keep_alive() -> TaskConfig {
    TaskConfig {
        keep_alive: true,
        ..TaskConfig::default()
    }
}
