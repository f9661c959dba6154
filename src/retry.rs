//! Upload retry planning with fixed backoff and destination failover
//!
//! The upload engine makes one initial attempt and then up to
//! `max_upload_fail_retry` retries while the latest attempt is erroring. Each
//! retry either substitutes the next secondary destination (failover) or waits
//! a fixed delay and tries the same destination again. The delay never grows
//! and carries no jitter.
//!
//! # Example
//!
//! ```
//! use upload_task::config::TaskSettings;
//! use upload_task::retry::{AttemptPlan, RetryPolicy};
//!
//! let policy = RetryPolicy::from_settings(&TaskSettings::default());
//! assert_eq!(policy.plan(0), AttemptPlan::Initial);
//! assert!(policy.should_retry(1, true));
//! assert!(!policy.should_retry(2, true));
//! ```

use crate::config::TaskSettings;
use crate::error::{DownloadError, Error, UploadError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, server busy, connection reset) should return `true`.
/// Permanent failures (bad configuration, rejected content) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            Error::Upload(UploadError::Failed { .. }) => true,
            Error::Upload(UploadError::Status { status, .. }) => is_transient_status(*status),
            // A stop request is final
            Error::Upload(UploadError::Aborted) => false,
            Error::Download(DownloadError::Status { status, .. }) => is_transient_status(*status),
            Error::Download(_) => false,
            Error::ExternalTool(msg) => {
                msg.contains("timeout") || msg.contains("busy") || msg.contains("temporary")
            }
            Error::Config { .. }
            | Error::Transform(_)
            | Error::PostUpload(_)
            | Error::EmptyUrl
            | Error::Serialization(_)
            | Error::NotSupported(_)
            | Error::Other(_) => false,
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

/// What to do before a given attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptPlan {
    /// First attempt against the primary destinations
    Initial,
    /// Substitute the secondary destinations at `secondary_index`
    Failover {
        /// Index into the secondary destination lists
        secondary_index: usize,
    },
    /// Wait, then retry the same destination
    Backoff(Duration),
}

/// Retry bound and strategy captured from a settings snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (0 disables retry)
    pub max_retries: u32,
    /// Fixed wait before a same-destination retry
    pub delay: Duration,
    /// Substitute secondary destinations instead of waiting
    pub failover: bool,
}

impl RetryPolicy {
    /// Build the policy from a settings snapshot
    pub fn from_settings(settings: &TaskSettings) -> Self {
        Self {
            max_retries: settings.upload.max_upload_fail_retry,
            delay: settings.upload.retry_delay,
            failover: settings.destinations.use_secondary_uploaders,
        }
    }

    /// Plan for the attempt with index `retry` (0 = initial)
    ///
    /// Retry `k` uses secondary destination `k - 1`.
    pub fn plan(&self, retry: u32) -> AttemptPlan {
        if retry == 0 {
            AttemptPlan::Initial
        } else if self.failover {
            AttemptPlan::Failover {
                secondary_index: (retry - 1) as usize,
            }
        } else {
            AttemptPlan::Backoff(self.delay)
        }
    }

    /// Whether attempt `retry` should run given the previous attempt's outcome
    pub fn should_retry(&self, retry: u32, previous_erroring: bool) -> bool {
        previous_erroring && retry <= self.max_retries
    }

    /// Upper bound on the number of attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Sleep for `delay` unless the task is cancelled first
///
/// Returns `true` if the full delay elapsed, `false` if cancellation cut it short.
pub async fn wait_backoff(delay: Duration, stop: &CancellationToken) -> bool {
    tokio::select! {
        _ = stop.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
