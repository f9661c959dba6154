//! Error types for upload-task
//!
//! This module provides the error handling for the library, including:
//! - Domain-specific error types (Transform, Upload, Download, PostUpload)
//! - Machine-readable error codes for consumers that record task failures
//! - Context information (destination, step name, URL, etc.)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for upload-task operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for upload-task
///
/// Stage code converts these into entries of the task's result error list at
/// the stage boundary; they never unwind past the execution harness.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "text_file_extension")
        key: Option<String>,
    },

    /// Content transform produced nothing (effects, annotation, encoding)
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    /// Upload attempt failed
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// Remote source could not be fetched before upload
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// One isolated post-upload step failed
    #[error("post-upload error: {0}")]
    PostUpload(#[from] PostUploadError),

    /// Upload reported success but produced no URL
    #[error("URL is empty")]
    EmptyUrl,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External program execution failed
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported by the configured collaborator
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Content transform errors
#[derive(Debug, Error)]
pub enum TransformError {
    /// Applying image effects resulted in an empty image
    #[error("applying image effects resulted in an empty image")]
    EffectsEmpty,

    /// Annotation was cancelled or produced no image
    #[error("annotation produced no image")]
    AnnotationEmpty,

    /// Encoding the image into the target format failed
    #[error("failed to encode image: {reason}")]
    EncodeFailed {
        /// The reason encoding failed
        reason: String,
    },

    /// A file needed by the content job could not be opened
    #[error("failed to open {path}: {reason}")]
    OpenFailed {
        /// The file that could not be opened
        path: PathBuf,
        /// The reason opening failed
        reason: String,
    },
}

/// Upload errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// The uploader raised an error for this attempt
    #[error("upload to {destination} failed: {reason}")]
    Failed {
        /// The destination the attempt was sent to
        destination: String,
        /// The reason the upload failed
        reason: String,
    },

    /// Uploader reported an HTTP status it could not handle
    #[error("upload to {destination} returned status {status}")]
    Status {
        /// The destination the attempt was sent to
        destination: String,
        /// HTTP status code
        status: u16,
    },

    /// The upload was aborted by a stop request
    #[error("upload aborted")]
    Aborted,
}

/// Remote fetch errors for download-then-upload jobs
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The source URL could not be parsed
    #[error("invalid source URL {url}: {reason}")]
    InvalidUrl {
        /// The URL as supplied
        url: String,
        /// The reason the URL was rejected
        reason: String,
    },

    /// The remote server answered with a non-success status
    #[error("download of {url} failed with status {status}")]
    Status {
        /// The URL being fetched
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// No destination path could be resolved for the downloaded file
    #[error("no destination path for {file_name}")]
    NoDestination {
        /// The file name that could not be placed
        file_name: String,
    },
}

/// Post-upload action errors
#[derive(Debug, Error)]
pub enum PostUploadError {
    /// A single post-upload step failed; the chain continues
    #[error("{step} failed: {reason}")]
    Step {
        /// Step name (e.g., "shorten_url")
        step: &'static str,
        /// The reason the step failed
        reason: String,
    },
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Transform(_) => "transform_failure",
            Error::Upload(_) => "upload_error",
            Error::Download(_) => "download_error",
            Error::PostUpload(_) => "post_upload_step_error",
            Error::EmptyUrl => "empty_url",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::Other(_) => "internal_error",
        }
    }

    /// Shorthand for a failed post-upload step
    pub(crate) fn step(step: &'static str, reason: impl std::fmt::Display) -> Self {
        Error::PostUpload(PostUploadError::Step {
            step,
            reason: reason.to_string(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(Error::EmptyUrl.error_code(), "empty_url");
        assert_eq!(
            Error::Transform(TransformError::EffectsEmpty).error_code(),
            "transform_failure"
        );
        assert_eq!(
            Error::Upload(UploadError::Aborted).error_code(),
            "upload_error"
        );
        assert_eq!(
            Error::step("open_url", "no handler").error_code(),
            "post_upload_step_error"
        );
    }

    #[test]
    fn step_error_message_names_the_step() {
        let err = Error::step("shorten_url", "service unavailable");
        assert_eq!(
            err.to_string(),
            "post-upload error: shorten_url failed: service unavailable"
        );
    }

    #[test]
    fn upload_failure_message_includes_destination() {
        let err = Error::Upload(UploadError::Failed {
            destination: "imgur".to_string(),
            reason: "connection reset".to_string(),
        });
        assert!(err.to_string().contains("imgur"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn io_errors_convert_with_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert_eq!(err.error_code(), "io_error");
    }
}
