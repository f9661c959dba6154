//! The worker task: one item moving through prepare, transform, upload and
//! post-upload.
//!
//! `WorkerTask` is a cheap handle (all state behind one `Arc`) so a UI can hold
//! a copy and query status while the pipeline runs on a spawned tokio task.
//! Its methods are organized by concern:
//! - [`constructors`] - Factory profiles for every job kind
//! - [`control`] - Execution harness (start/run/stop/dispose) and completion
//! - [`stages`] - Pre-flight, content transform, file and text stages
//! - [`upload`] - Upload attempts with retry and destination failover
//! - [`after_upload`] - Post-upload action chain
//!
//! ## Lifecycle
//!
//! `InQueue → Preparing → Working → (Stopping →) Completed`. A stop request
//! while queued completes the task immediately. Replay tasks built from
//! history sit in `History` and never run.

mod after_upload;
mod constructors;
mod control;
mod stages;
mod upload;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::TaskSettings;
use crate::payload::Payload;
use crate::result::UploadResult;
use crate::services::{CapturedImage, Services, Uploader};
use crate::types::{TaskEvent, TaskId, TaskInfo, TaskJob, TaskSnapshot, TaskStatus};

/// Human-readable status lines
pub mod status_text {
    /// Content job or text upload getting ready
    pub const PREPARING: &str = "Preparing";
    /// Any other job getting ready
    pub const STARTING: &str = "Starting";
    /// Fetching remote content
    pub const DOWNLOADING: &str = "Downloading";
    /// Upload stage running
    pub const UPLOADING: &str = "Uploading";
    /// Stop requested while busy
    pub const STOPPING: &str = "Stopping";
    /// Finished after a stop request
    pub const STOPPED: &str = "Stopped";
    /// Finished normally
    pub const DONE: &str = "Done";
}

/// Content owned by the task until it finishes
#[derive(Default)]
pub(crate) struct Resources {
    pub(crate) payload: Option<Payload>,
    pub(crate) image: Option<CapturedImage>,
    pub(crate) text: Option<String>,
}

impl Resources {
    fn is_empty(&self) -> bool {
        self.payload.is_none() && self.image.is_none() && self.text.is_none()
    }
}

pub(crate) struct Shared {
    pub(crate) id: TaskId,
    pub(crate) settings: Arc<TaskSettings>,
    pub(crate) services: Services,
    /// Stop flag; set once, shared with uploaders
    pub(crate) stop: CancellationToken,
    pub(crate) request_setting_update: AtomicBool,
    /// Guards the terminal event
    pub(crate) completed: AtomicBool,
    /// Held while an event is published; completion takes it too
    pub(crate) publish: Mutex<()>,
    pub(crate) status: Mutex<TaskStatus>,
    pub(crate) info: Mutex<TaskInfo>,
    pub(crate) resources: Mutex<Resources>,
    /// Uploader of the in-flight attempt, for stop requests
    pub(crate) uploader: Mutex<Option<Arc<dyn Uploader>>>,
}

/// Handle to one task (cloneable - all state is Arc-wrapped)
#[derive(Clone)]
pub struct WorkerTask {
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for WorkerTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerTask")
            .field("id", &self.shared.id)
            .field("status", &self.status())
            .field("stop_requested", &self.stop_requested())
            .finish()
    }
}

/// Lock a mutex, recovering the data if a panicking holder poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WorkerTask {
    pub(crate) fn from_parts(
        status: TaskStatus,
        info: TaskInfo,
        resources: Resources,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: TaskId::next(),
                settings,
                services,
                stop: CancellationToken::new(),
                request_setting_update: AtomicBool::new(false),
                completed: AtomicBool::new(false),
                publish: Mutex::new(()),
                status: Mutex::new(status),
                info: Mutex::new(info),
                resources: Mutex::new(resources),
                uploader: Mutex::new(None),
            }),
        }
    }

    /// Task ID
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Current lifecycle state
    pub fn status(&self) -> TaskStatus {
        *lock(&self.shared.status)
    }

    /// `InQueue` or working
    pub fn is_busy(&self) -> bool {
        self.status().is_busy()
    }

    /// `Preparing`, `Working` or `Stopping`
    pub fn is_working(&self) -> bool {
        self.status().is_working()
    }

    /// Whether a stop has been requested
    pub fn stop_requested(&self) -> bool {
        self.shared.stop.is_cancelled()
    }

    /// Whether the user declined the first-upload warning and settings should be revisited
    pub fn request_setting_update(&self) -> bool {
        self.shared.request_setting_update.load(Ordering::SeqCst)
    }

    /// Settings snapshot the task was created with
    pub fn settings(&self) -> &TaskSettings {
        &self.shared.settings
    }

    /// Copy of the task record
    pub fn info(&self) -> TaskInfo {
        lock(&self.shared.info).clone()
    }

    /// Copy of the upload result
    pub fn result(&self) -> UploadResult {
        lock(&self.shared.info).result.clone()
    }

    /// Point-in-time copy of the task
    pub fn snapshot(&self) -> TaskSnapshot {
        let status = self.status();
        TaskSnapshot {
            id: self.shared.id,
            status,
            stop_requested: self.stop_requested(),
            info: self.info(),
        }
    }

    /// Whether the task will run the upload stage
    pub fn is_upload_job(&self) -> bool {
        let job = lock(&self.shared.info).job;
        match job {
            TaskJob::ContentJob => self.shared.settings.after_capture.upload_image_to_host,
            TaskJob::HistoryReplay => false,
            _ => true,
        }
    }

    /// Subscribe to events of every task sharing this task's relay
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.shared.services.relay.subscribe()
    }

    /// Events of this task only, ending after `UploadCompleted`
    pub fn events(&self) -> impl futures::Stream<Item = TaskEvent> + Send + 'static {
        self.shared.services.relay.task_stream(self.shared.id)
    }

    /// Run `f` against the task record
    pub(crate) fn with_info<R>(&self, f: impl FnOnce(&mut TaskInfo) -> R) -> R {
        f(&mut lock(&self.shared.info))
    }

    /// Append an error to the result
    pub(crate) fn record_error(&self, error: impl std::fmt::Display) {
        let message = error.to_string();
        tracing::warn!(task_id = %self.shared.id, error = %message, "task error recorded");
        self.with_info(|info| info.result.add_error(message));
    }

    /// Move to `next` if the lifecycle allows it
    pub(crate) fn set_status(&self, next: TaskStatus) -> bool {
        let mut status = lock(&self.shared.status);
        if status.can_transition_to(next) {
            *status = next;
            true
        } else {
            tracing::debug!(
                task_id = %self.shared.id,
                from = ?*status,
                to = ?next,
                "status transition refused"
            );
            false
        }
    }

    pub(crate) fn set_status_text(&self, text: &str) {
        self.with_info(|info| info.status_text = text.to_string());
    }

    /// Publish a non-terminal event; nothing is published after completion
    pub(crate) fn emit(&self, make: impl FnOnce(TaskSnapshot) -> TaskEvent) {
        let _publishing = lock(&self.shared.publish);
        if self.shared.completed.load(Ordering::SeqCst) {
            return;
        }
        self.shared.services.relay.publish(make(self.snapshot()));
    }

    pub(crate) fn emit_status_changed(&self) {
        self.emit(|task| TaskEvent::StatusChanged { task });
    }
}
