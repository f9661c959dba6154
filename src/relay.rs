//! Event relay between running tasks and their observers.
//!
//! [`ProgressRelay`] wraps a [`tokio::sync::broadcast`] channel. Stage code
//! publishes and returns immediately; observers consume on their own tasks, so
//! a handler never runs on the pipeline's stack.
//!
//! ## Rules
//! - **Per-task order**: events of one task are delivered in the order produced.
//! - **Terminal last**: `UploadCompleted` is the last event a task publishes.
//! - **Lag**: receivers that fall behind get `RecvError::Lagged(n)`.
//! - **No persistence**: events published with no receivers are dropped.

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::types::{TaskEvent, TaskId};

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 1000;

/// Broadcast relay for task events
///
/// Cheap to clone; every clone publishes into the same channel. One relay is
/// normally shared by all tasks of an application.
#[derive(Clone, Debug)]
pub struct ProgressRelay {
    tx: broadcast::Sender<TaskEvent>,
}

impl Default for ProgressRelay {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ProgressRelay {
    /// Create a relay with the given capacity (clamped to at least 1)
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all subsequent events
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    /// All subsequent events as a stream; lagged gaps are skipped
    pub fn stream(&self) -> impl Stream<Item = TaskEvent> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(event),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!("event stream lagged, skipped {} events", skipped);
                    None
                }
            }
        })
    }

    /// Events of one task, ending after its `UploadCompleted`
    pub fn task_stream(&self, id: TaskId) -> impl Stream<Item = TaskEvent> + Send + 'static {
        let mut done = false;
        self.stream()
            .filter(move |event| futures::future::ready(event.task_id() == id))
            .take_while(move |event| {
                let keep = !done;
                done = event.is_completed();
                futures::future::ready(keep)
            })
    }

    /// Publish an event to all receivers
    pub(crate) fn publish(&self, event: TaskEvent) {
        // send() fails only when nobody is listening
        self.tx.send(event).ok();
    }

    /// Number of live receivers
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
