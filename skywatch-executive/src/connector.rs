//! Remote command contract
//!
//! The executive does not know how commands reach the telescope control system
//! or the instrument computers. A [`CommandConnector`] opens a
//! [`CommandChannel`] to a named resource; the channel carries one command out
//! and a stream of replies back:
//!
//! ```text
//!   send(command) ──→ remote
//!                     remote ──→ Ack { time_to_complete_ms }   (zero or more)
//!                     remote ──→ Done(Response)                (exactly one)
//! ```
//!
//! A failing `next_reply` ends the exchange; the task classifies the error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

/// Outgoing command, built by a task's `on_init` hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Resource the connector should open (e.g. "tcs", "camera")
    pub resource: String,
    /// Command verb
    pub name: String,
    /// Command arguments, opaque to the executive
    #[serde(default)]
    pub args: serde_json::Value,
}

impl Command {
    pub fn new(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            name: name.into(),
            args: serde_json::Value::Null,
        }
    }

    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }
}

/// Remote progress report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    /// Remote estimate of how much longer the command will take
    pub time_to_complete_ms: u64,
    #[serde(default)]
    pub message: Option<String>,
}

impl Ack {
    pub fn new(time_to_complete_ms: u64) -> Self {
        Self {
            time_to_complete_ms,
            message: None,
        }
    }
}

/// Terminal reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Response {
    pub fn success(payload: serde_json::Value) -> Self {
        Self {
            success: true,
            error_code: 0,
            error_message: String::new(),
            payload,
        }
    }

    pub fn failure(error_code: i32, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_code,
            error_message: error_message.into(),
            payload: serde_json::Value::Null,
        }
    }
}

/// One message from the remote side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Ack(Ack),
    Done(Response),
}

/// Opens channels to remote resources
#[async_trait]
pub trait CommandConnector: Send + Sync {
    /// Open a channel to `resource`
    ///
    /// Return [`ConnectorError::ResourceNotFound`] when the resource is unknown
    /// so the failure is classified as not retryable.
    async fn connect(&self, resource: &str) -> Result<Box<dyn CommandChannel>, ConnectorError>;
}

/// One open exchange with a remote resource
#[async_trait]
pub trait CommandChannel: Send {
    /// Send the command
    async fn send(&mut self, command: &Command) -> Result<(), ConnectorError>;

    /// Wait for the next reply
    ///
    /// Must be cancel-safe: the caller bounds it with a timeout and may drop
    /// the future at any point.
    async fn next_reply(&mut self) -> Result<Reply, ConnectorError>;

    /// Ask the remote side to stop working on the command
    async fn cancel(&mut self) -> Result<(), ConnectorError>;
}
