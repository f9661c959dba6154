//! # upload-task
//!
//! Single-task execution pipeline for capture-and-upload applications.
//!
//! ## Design Philosophy
//!
//! upload-task is designed to be:
//! - **One task, start to finish** - Prepare, transform, upload with retry and
//!   failover, then run the post-upload actions
//! - **Collaborator-driven** - Uploaders, image codecs, clipboard and dialogs
//!   are traits supplied by the host application
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Cooperative** - A stop request is honoured at stage boundaries and
//!   aborts an in-flight upload
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use upload_task::{NoOpUploaderFactory, Services, TaskSettings, WorkerTask};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Arc::new(TaskSettings::default());
//!     let services = Services::new(Arc::new(NoOpUploaderFactory));
//!
//!     let task = WorkerTask::text_upload("hello", settings, services)?;
//!
//!     // Subscribe to events
//!     let mut events = task.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     if let Some(handle) = task.start() {
//!         handle.await?;
//!     }
//!     println!("Result: {}", task.result());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Task-owned content stream
pub mod payload;
/// Event relay to observers
pub mod relay;
/// Upload outcome
pub mod result;
/// Retry planning with fixed backoff and failover
pub mod retry;
/// Collaborator traits and default implementations
pub mod services;
/// The worker task (decomposed into focused submodules)
pub mod task;
/// Result format templates
pub mod template;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{
    DestinationConfig, FileCollisionAction, ImageDestination, TaskSettings, TextDestination,
};
pub use error::{
    DownloadError, Error, PostUploadError, Result, TransformError, UploadError,
};
pub use payload::Payload;
pub use relay::ProgressRelay;
pub use result::UploadResult;
pub use retry::{IsRetryable, RetryPolicy};
pub use services::{NoOpUploaderFactory, Services, UploadContext, Uploader, UploaderFactory};
pub use task::WorkerTask;
pub use types::{
    DataType, HistoryRecord, Progress, TaskEvent, TaskId, TaskInfo, TaskJob, TaskSnapshot,
    TaskStatus,
};
