//! Supervised remote commands for Skywatch
//!
//! ## Overview
//!
//! The monitoring engine in `skywatch-core` decides *that* something must
//! happen (close the dome, park the telescope, stop an exposure). This crate
//! makes it happen: each remote command runs as a [`Task`] with a bounded
//! wait, acknowledgement-based extension, abort and a classified failure.
//!
//! ```text
//! MonitorEvent ──→ EventRouter ──→ TaskExecutive ──→ Task ──→ CommandConnector
//!                                        │             │
//!                                   RetryPolicy    TaskManager callbacks
//! ```
//!
//! ## Timing
//!
//! A task waits at most `base × 1.1 + 10000` ms for a reply. Every
//! acknowledgement restarts that wait from the remote side's own estimate
//! with the same formula. Silence until the bound always fails the task with
//! `TIMEOUT_ERROR`; it is never treated as success.
//!
//! ## Failure Classification
//!
//! | Code                              | Retried by default |
//! |-----------------------------------|--------------------|
//! | `CONNECTION_RESOURCE_NOT_FOUND`   | no                 |
//! | `CONNECT_FAILURE`                 | yes                |
//! | `DISPATCH_FAILURE`                | no                 |
//! | `RESPONSE_WAIT_FAILURE`           | yes                |
//! | `GENERAL_PROTOCOL_EXCEPTION`      | no                 |
//! | `TIMEOUT_ERROR`                   | yes                |
//! | remote failure                    | no                 |
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use skywatch_executive::{Command, CommandConnector, RetryPolicy, Task, TaskExecutive, TaskHandler};
//!
//! struct CloseDome;
//!
//! impl TaskHandler for CloseDome {
//!     fn on_init(&mut self) -> Result<Command, String> {
//!         Ok(Command::new("dome", "CLOSE"))
//!     }
//!
//!     fn base_timeout_ms(&self) -> u64 {
//!         90_000
//!     }
//!
//!     fn can_abort(&self) -> bool {
//!         false
//!     }
//! }
//!
//! # async fn run(connector: Arc<dyn CommandConnector>) -> Result<(), skywatch_executive::TaskError> {
//! let executive = TaskExecutive::new();
//! let task = Task::new("close_dome", CloseDome, connector).shared();
//! let state = executive.run_with_retry(task, &RetryPolicy::default()).await?;
//! println!("dome: {}", state);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod connector;
pub mod constants;
pub mod error;
pub mod executive;
pub mod router;
pub mod task;

pub use connector::{Ack, Command, CommandChannel, CommandConnector, Reply, Response};
pub use constants::MESSAGE_ACK;
pub use error::{ConnectorError, ErrorCode, ErrorIndicator, TaskError};
pub use executive::{RetryPolicy, TaskExecutive, TaskJoin};
pub use router::{EventRouter, TaskFactory};
pub use task::{
    LogManager, SharedTask, Task, TaskConfig, TaskHandler, TaskManager, TaskReport, TaskState,
};
