//! Per-attempt context handed to uploaders

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::types::{Progress, TaskId};

type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;
type UrlFn = Arc<dyn Fn(&str) + Send + Sync>;

/// What an uploader may read from and report back to its task
#[derive(Clone)]
pub struct UploadContext {
    task_id: TaskId,
    buffer_size: usize,
    accept_invalid_certificates: bool,
    stop: CancellationToken,
    progress: Option<ProgressFn>,
    early_url: Option<UrlFn>,
}

impl fmt::Debug for UploadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadContext")
            .field("task_id", &self.task_id)
            .field("buffer_size", &self.buffer_size)
            .field("accept_invalid_certificates", &self.accept_invalid_certificates)
            .field("stop_requested", &self.stop.is_cancelled())
            .field("early_url", &self.early_url.is_some())
            .finish()
    }
}

impl UploadContext {
    /// Context with no progress or early-URL hooks
    pub fn new(task_id: TaskId, buffer_size: usize, stop: CancellationToken) -> Self {
        Self {
            task_id,
            buffer_size,
            accept_invalid_certificates: false,
            stop,
            progress: None,
            early_url: None,
        }
    }

    /// Let the uploader skip TLS certificate validation
    pub fn with_invalid_certificates(mut self, accept: bool) -> Self {
        self.accept_invalid_certificates = accept;
        self
    }

    /// Receive progress reports
    pub fn with_progress(mut self, f: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }

    /// Receive the URL as soon as the uploader knows it
    pub fn with_early_url(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.early_url = Some(Arc::new(f));
        self
    }

    /// Task the upload belongs to
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Read/write buffer size in bytes
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Whether invalid TLS certificates are accepted
    pub fn accept_invalid_certificates(&self) -> bool {
        self.accept_invalid_certificates
    }

    /// Report transfer progress
    pub fn report_progress(&self, progress: Progress) {
        if let Some(f) = &self.progress {
            f(progress);
        }
    }

    /// Hand over the result URL before the upload finishes
    pub fn copy_url_early(&self, url: &str) {
        if let Some(f) = &self.early_url
            && !url.is_empty()
        {
            f(url);
        }
    }

    /// Whether the task has been asked to stop
    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Stop the task from inside the uploader (e.g. the user cancelled a prompt)
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Token resolved when the task stops, for `select!` in transfer loops
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }
}
