//! Execution harness: start, run, stop, dispose and completion

use std::sync::atomic::Ordering;
use tokio::task::JoinHandle;

use super::{WorkerTask, lock, status_text};
use crate::error::Error;
use crate::types::{TaskEvent, TaskJob, TaskStatus};

/// Completes the task when dropped, so the terminal event fires even if the
/// pipeline panics or its tokio task is aborted.
struct CompletionGuard {
    task: WorkerTask,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.task.finish();
    }
}

impl WorkerTask {
    /// Run the task on a spawned tokio task
    ///
    /// Returns `None` without doing anything if the task is not `InQueue` or a
    /// stop was already requested. The `Preparing` status change is published
    /// before this returns.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if !self.begin() {
            return None;
        }
        let task = self.clone();
        Some(tokio::spawn(async move { task.execute().await }))
    }

    /// Run the task to completion on the caller's task
    ///
    /// Returns `false` without doing anything if the task is not `InQueue` or a
    /// stop was already requested.
    pub async fn run(&self) -> bool {
        if !self.begin() {
            return false;
        }
        self.execute().await;
        true
    }

    /// Request a cooperative stop
    ///
    /// A queued task completes immediately. A busy task moves to `Stopping`
    /// and its in-flight uploader is asked to abort; stages check the flag at
    /// their boundaries.
    pub fn stop(&self) {
        self.shared.stop.cancel();

        let mut status = lock(&self.shared.status);
        match *status {
            TaskStatus::InQueue => {
                drop(status);
                tracing::debug!(task_id = %self.shared.id, "stopped before start");
                self.finish();
            }
            TaskStatus::Preparing | TaskStatus::Working => {
                if let Some(uploader) = lock(&self.shared.uploader).as_ref() {
                    uploader.stop_upload();
                }
                // Status and text change together under the status lock
                *status = TaskStatus::Stopping;
                self.set_status_text(status_text::STOPPING);
                drop(status);
                tracing::info!(task_id = %self.shared.id, "stop requested");
                self.emit_status_changed();
            }
            _ => {}
        }
    }

    /// Release the payload and any in-memory content
    ///
    /// Safe to call any number of times.
    pub fn dispose(&self) {
        let released = std::mem::take(&mut *lock(&self.shared.resources));
        if !released.is_empty() {
            tracing::trace!(task_id = %self.shared.id, "task resources released");
        }
    }

    fn begin(&self) -> bool {
        {
            let mut status = lock(&self.shared.status);
            if *status != TaskStatus::InQueue || self.shared.stop.is_cancelled() {
                return false;
            }
            *status = TaskStatus::Preparing;
        }

        let job = lock(&self.shared.info).job;
        let text = match job {
            TaskJob::ContentJob | TaskJob::TextUpload => status_text::PREPARING,
            _ => status_text::STARTING,
        };
        self.set_status_text(text);
        tracing::info!(task_id = %self.shared.id, job = ?job, "task started");
        self.emit_status_changed();
        true
    }

    async fn execute(&self) {
        let _guard = CompletionGuard { task: self.clone() };

        self.with_info(|info| info.start_time = Some(chrono::Utc::now()));

        let prepared = match self.run_stages().await {
            Ok(true) => true,
            Ok(false) => {
                // Empty transform result, declined prompt or failed fetch
                self.shared.stop.cancel();
                false
            }
            Err(e) => {
                self.record_error(&e);
                false
            }
        };

        let upload_ok = prepared && !self.stop_requested() && self.upload_stage().await;

        self.dispose();
        self.delete_file_if_configured();

        let expected = self.with_info(|info| info.result.is_url_expected);
        if upload_ok && expected && !self.stop_requested() {
            let url_empty = self.with_info(|info| info.result.url.is_empty());
            if url_empty {
                self.record_error(Error::EmptyUrl);
            } else {
                self.after_upload().await;
            }
        }

        self.with_info(|info| info.end_time = Some(chrono::Utc::now()));
    }

    fn delete_file_if_configured(&self) {
        if !self.shared.settings.after_capture.delete_file {
            return;
        }
        let (job, path) = self.with_info(|info| (info.job, info.file_path.clone()));
        if job != TaskJob::ContentJob {
            return;
        }
        if let Some(path) = path
            && path.is_file()
        {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "local file deleted"),
                Err(e) => self.record_error(Error::Io(e)),
            }
        }
    }

    /// Release resources, mark completed and publish `UploadCompleted`, once
    pub(crate) fn finish(&self) {
        if self.shared.completed.load(Ordering::SeqCst) {
            return;
        }

        self.dispose();

        // Nothing is published between marking completion and the terminal event
        let _publishing = lock(&self.shared.publish);
        if self.shared.completed.swap(true, Ordering::SeqCst) {
            return;
        }

        let stopped = {
            let mut status = lock(&self.shared.status);
            *status = TaskStatus::Completed;
            let stopped = self.stop_requested();
            self.set_status_text(if stopped {
                status_text::STOPPED
            } else {
                status_text::DONE
            });
            stopped
        };

        let snapshot = self.snapshot();
        tracing::info!(
            task_id = %self.shared.id,
            stopped,
            errors = snapshot.info.result.errors.len(),
            "task completed"
        );
        self.shared
            .services
            .relay
            .publish(TaskEvent::UploadCompleted { task: snapshot });
    }
}
