//! Core types for upload-task

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{DestinationConfig, ImageDestination, TextDestination};
use crate::result::UploadResult;

/// Unique identifier for a task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

impl TaskId {
    /// Allocate the next process-unique id
    pub fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a task was created to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskJob {
    /// Captured or loaded content going through the after-capture steps
    ContentJob,
    /// Caller-supplied payload uploaded as-is
    DataUpload,
    /// File uploaded from disk
    FileUpload,
    /// Text materialized into a payload and uploaded
    TextUpload,
    /// URL handed to the shortener
    ShortenUrl,
    /// URL handed to the sharing service
    ShareUrl,
    /// Remote content fetched to disk, then uploaded
    DownloadUpload,
    /// Record rebuilt from history; never runs
    HistoryReplay,
}

/// Kind of content a task carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Image content
    Image,
    /// Text content
    Text,
    /// Arbitrary file
    File,
    /// A URL (shorten/share jobs)
    Url,
}

/// Task lifecycle state
///
/// Moves forward only: `InQueue → Preparing → Working → (Stopping →) Completed`.
/// `History` is assigned at construction to replay records and never changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, waiting to start
    InQueue,
    /// Running the stages before upload
    Preparing,
    /// Upload stage has begun
    Working,
    /// Stop requested while busy
    Stopping,
    /// Finished (success, stop or failure)
    Completed,
    /// Replay-only record
    History,
}

impl TaskStatus {
    /// `Preparing`, `Working` or `Stopping`
    pub fn is_working(self) -> bool {
        matches!(
            self,
            TaskStatus::Preparing | TaskStatus::Working | TaskStatus::Stopping
        )
    }

    /// `InQueue` or working
    pub fn is_busy(self) -> bool {
        self == TaskStatus::InQueue || self.is_working()
    }

    /// Whether moving to `next` respects the lifecycle order
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::History, _) | (_, TaskStatus::History) => false,
            (TaskStatus::Completed, _) => false,
            (_, TaskStatus::Completed) => true,
            (from, to) => to > from,
        }
    }
}

/// Last-known transfer progress, replaced wholesale on each update
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Bytes sent so far
    pub position: u64,
    /// Total bytes to send (0 if unknown)
    pub length: u64,
    /// Current speed in bytes per second
    pub speed_bps: u64,
}

impl Progress {
    /// Progress percentage (0.0 to 100.0)
    pub fn percentage(&self) -> f32 {
        if self.length == 0 {
            return 0.0;
        }
        ((self.position as f64 / self.length as f64) * 100.0).min(100.0) as f32
    }
}

/// Persisted history entry used to rebuild a replay-only task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Local file path
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// File name
    pub file_name: String,
    /// Result URL
    #[serde(default)]
    pub url: String,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: String,
    /// Deletion URL
    #[serde(default)]
    pub deletion_url: String,
    /// Shortened URL
    #[serde(default)]
    pub shortened_url: String,
    /// When the upload finished (UTC)
    pub time: DateTime<Utc>,
}

/// Mutable task state carried through every stage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Job profile
    pub job: TaskJob,
    /// Content kind
    pub data_type: DataType,
    /// Human-readable status line
    pub status_text: String,
    /// Local file, once one exists
    pub file_path: Option<PathBuf>,
    /// Name the content is uploaded under
    pub file_name: String,
    /// Thumbnail written next to the file, if any
    pub thumbnail_file_path: Option<PathBuf>,
    /// Active destinations; failover replaces these on retry
    pub destinations: DestinationConfig,
    /// Upload outcome
    pub result: UploadResult,
    /// Last progress snapshot
    pub progress: Option<Progress>,
    /// When execution started
    pub start_time: Option<DateTime<Utc>>,
    /// When execution finished (upload time)
    pub end_time: Option<DateTime<Utc>>,
}

impl TaskInfo {
    pub(crate) fn new(job: TaskJob, data_type: DataType, destinations: DestinationConfig) -> Self {
        Self {
            job,
            data_type,
            status_text: String::new(),
            file_path: None,
            file_name: String::new(),
            thumbnail_file_path: None,
            destinations,
            result: UploadResult::default(),
            progress: None,
            start_time: None,
            end_time: None,
        }
    }

    /// Point the task at a new local file; the file name follows the path
    pub fn set_file_path(&mut self, path: PathBuf) {
        if let Some(name) = path.file_name() {
            self.file_name = name.to_string_lossy().into_owned();
        }
        self.file_path = Some(path);
    }

    /// Uploader kind the content is dispatched to
    ///
    /// Images and text whose destination is the file uploader go to the file
    /// uploader; everything else goes to the uploader of its own kind.
    pub fn upload_destination(&self) -> DataType {
        match self.data_type {
            DataType::Image if self.destinations.image == ImageDestination::FileUploader => {
                DataType::File
            }
            DataType::Text if self.destinations.text == TextDestination::FileUploader => {
                DataType::File
            }
            other => other,
        }
    }

    /// When the upload finished, as recorded at the end of execution
    pub fn upload_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }
}

/// Point-in-time copy of a task delivered with every event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task ID
    pub id: TaskId,
    /// Status at the time of the event
    pub status: TaskStatus,
    /// Whether a stop had been requested
    pub stop_requested: bool,
    /// Task record
    pub info: TaskInfo,
}

/// Event emitted during a task's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Status or status text changed
    StatusChanged {
        /// Task state
        task: TaskSnapshot,
    },

    /// Upload stage is about to send data
    UploadStarted {
        /// Task state
        task: TaskSnapshot,
    },

    /// Uploader reported progress
    UploadProgressChanged {
        /// Task state
        task: TaskSnapshot,
    },

    /// Terminal event; fires exactly once per task
    UploadCompleted {
        /// Task state
        task: TaskSnapshot,
    },

    /// Post-upload chain asked for a QR code of the result
    QrCodeRequested {
        /// Task ID
        id: TaskId,
        /// Text to encode
        text: String,
    },
}

impl TaskEvent {
    /// ID of the task that produced the event
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::StatusChanged { task }
            | TaskEvent::UploadStarted { task }
            | TaskEvent::UploadProgressChanged { task }
            | TaskEvent::UploadCompleted { task } => task.id,
            TaskEvent::QrCodeRequested { id, .. } => *id,
        }
    }

    /// Whether this is the terminal event
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskEvent::UploadCompleted { .. })
    }
}
