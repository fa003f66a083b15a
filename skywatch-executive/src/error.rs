//! Error types for remote commands and task supervision
//!
//! Two layers:
//!
//! - [`ConnectorError`] is what a [`CommandConnector`](crate::CommandConnector)
//!   or [`CommandChannel`](crate::CommandChannel) reports. It describes the
//!   transport and knows nothing about tasks.
//! - [`ErrorIndicator`] is what a failed task carries. Its [`ErrorCode`] is the
//!   classification managers use to decide between retrying and giving up.
//!
//! [`TaskError`] covers misuse of the task lifecycle itself (performing a task
//! that was never initialised, resetting one that is still running, ...).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("wait failed: {0}")]
    Wait(String),

    #[error("cancelled")]
    Cancelled,
}

/// Lifecycle misuse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task '{task}': cannot {operation} while {state}")]
    InvalidState {
        task: String,
        state: crate::TaskState,
        operation: &'static str,
    },

    #[error("task '{0}' has been disposed")]
    Disposed(String),

    #[error("task '{task}': init failed: {reason}")]
    Init { task: String, reason: String },

    #[error("task '{0}' is already in flight")]
    AlreadyRunning(String),

    #[error("task '{task}': worker stopped: {reason}")]
    Worker { task: String, reason: String },
}

/// Failure classification carried by a failed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The connector does not know the command's resource
    ConnectionResourceNotFound,
    /// The resource exists but no channel could be opened
    ConnectFailure,
    /// The command could not be sent
    DispatchFailure,
    /// The channel broke while waiting for a reply
    ResponseWaitFailure,
    /// The remote side replied with something unintelligible
    GeneralProtocolException,
    /// Nothing arrived before the time-to-complete expired
    Timeout,
    /// The remote side completed the command unsuccessfully, with its own code
    Remote(i32),
}

impl ErrorCode {
    /// Stable numeric value; remote failures keep the remote code
    pub fn code(&self) -> i32 {
        match self {
            Self::ConnectionResourceNotFound => 601,
            Self::ConnectFailure => 602,
            Self::DispatchFailure => 603,
            Self::ResponseWaitFailure => 604,
            Self::GeneralProtocolException => 605,
            Self::Timeout => 606,
            Self::Remote(code) => *code,
        }
    }

    /// Symbolic name as it appears in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionResourceNotFound => "CONNECTION_RESOURCE_NOT_FOUND",
            Self::ConnectFailure => "CONNECT_FAILURE",
            Self::DispatchFailure => "DISPATCH_FAILURE",
            Self::ResponseWaitFailure => "RESPONSE_WAIT_FAILURE",
            Self::GeneralProtocolException => "GENERAL_PROTOCOL_EXCEPTION",
            Self::Timeout => "TIMEOUT_ERROR",
            Self::Remote(_) => "REMOTE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Why a task failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorIndicator {
    pub code: ErrorCode,
    pub message: String,
    /// Underlying transport error, when there was one
    pub cause: Option<String>,
}

impl ErrorIndicator {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Classify a failure to open a channel
    pub(crate) fn from_connect(resource: &str, err: ConnectorError) -> Self {
        let code = match err {
            ConnectorError::ResourceNotFound(_) => ErrorCode::ConnectionResourceNotFound,
            _ => ErrorCode::ConnectFailure,
        };
        Self::new(code, format!("cannot connect to '{}'", resource)).with_cause(err)
    }

    /// Classify a failure while waiting for replies
    pub(crate) fn from_wait(err: ConnectorError) -> Self {
        let code = match err {
            ConnectorError::Protocol(_) => ErrorCode::GeneralProtocolException,
            _ => ErrorCode::ResponseWaitFailure,
        };
        Self::new(code, "reply stream failed").with_cause(err)
    }
}

impl fmt::Display for ErrorIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}
