//! From monitor events to tasks
//!
//! Monitors post symbolic events (`CLOSE_DOME`, `ENCLOSURE_FAULT`); the
//! [`EventRouter`] maps each event identifier to a factory building the task
//! that responds to it and dispatches that task on a [`TaskExecutive`].
//!
//! ```text
//! Monitor ──→ ChannelSink ──→ EventRouter::run ──→ TaskExecutive::dispatch
//! ```
//!
//! Events without a route are logged and dropped.

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use skywatch_core::MonitorEvent;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::executive::{TaskExecutive, TaskJoin};
use crate::task::SharedTask;

/// Builds the task responding to one event
pub type TaskFactory = Box<dyn Fn(&MonitorEvent) -> SharedTask + Send + Sync>;

/// Dispatches a task for every routed event
pub struct EventRouter {
    executive: TaskExecutive,
    routes: HashMap<String, TaskFactory>,
}

impl EventRouter {
    pub fn new(executive: TaskExecutive) -> Self {
        Self {
            executive,
            routes: HashMap::new(),
        }
    }

    /// Respond to `event_id` with tasks built by `factory`
    pub fn route<F>(mut self, event_id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&MonitorEvent) -> SharedTask + Send + Sync + 'static,
    {
        self.routes.insert(event_id.into(), Box::new(factory));
        self
    }

    pub fn executive(&self) -> &TaskExecutive {
        &self.executive
    }

    /// Dispatch the task routed to `event`, if any
    pub fn handle(&self, event: &MonitorEvent) -> Option<TaskJoin> {
        let Some(factory) = self.routes.get(&event.event_id) else {
            debug!("No route for event {}", event);
            return None;
        };
        let task = factory(event);
        match self.executive.dispatch(task) {
            Ok(worker) => Some(worker),
            Err(err) => {
                warn!("Event {} not handled: {}", event.event_id, err);
                None
            }
        }
    }

    /// Handle events until every sender is dropped; returns the number dispatched
    pub async fn run(self, mut events: UnboundedReceiver<MonitorEvent>) -> usize {
        let mut dispatched = 0;
        while let Some(event) = events.recv().await {
            if self.handle(&event).is_some() {
                dispatched += 1;
            }
        }
        dispatched
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<&String> = self.routes.keys().collect();
        routes.sort();
        f.debug_struct("EventRouter")
            .field("executive", &self.executive)
            .field("routes", &routes)
            .finish()
    }
}
