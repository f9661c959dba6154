//! Upload stage: confirmations, dispatch and the retry loop

use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::{WorkerTask, lock, status_text};
use crate::error::{Error, UploadError};
use crate::retry::{AttemptPlan, IsRetryable, RetryPolicy, wait_backoff};
use crate::services::{UploadContext, Uploader};
use crate::types::{DataType, TaskEvent, TaskStatus};

impl WorkerTask {
    /// Run the upload stage
    ///
    /// Returns `true` if the final attempt finished without errors.
    pub(crate) async fn upload_stage(&self) -> bool {
        if !self.is_upload_job() {
            self.with_info(|info| info.result.is_url_expected = false);
            return false;
        }

        if !self.confirm_upload() {
            self.with_info(|info| info.result.is_url_expected = false);
            return false;
        }

        if self.set_status(TaskStatus::Working) {
            self.set_status_text(status_text::UPLOADING);
            self.emit_status_changed();
        }

        let info = self.info();
        if self.shared.settings.after_capture.show_before_upload_window
            && !self.shared.services.confirmation.confirm_before_upload(&info)
        {
            tracing::info!(task_id = %self.shared.id, "upload declined before sending");
            self.with_info(|info| info.result.is_url_expected = false);
            return false;
        }

        self.emit(|task| TaskEvent::UploadStarted { task });

        let policy = RetryPolicy::from_settings(&self.shared.settings);
        let mut erroring = self.attempt(0, &policy).await;

        let mut retry = 1;
        while policy.should_retry(retry, erroring) && !self.stop_requested() {
            tracing::info!(
                task_id = %self.shared.id,
                retry,
                max_retries = policy.max_retries,
                "retrying upload"
            );
            erroring = self.attempt(retry, &policy).await;
            retry += 1;
        }

        !erroring && !self.stop_requested()
    }

    /// First-upload warning and large-file check; `false` stops the task
    fn confirm_upload(&self) -> bool {
        let upload = &self.shared.settings.upload;
        let confirmation = &self.shared.services.confirmation;

        if upload.show_upload_warning && !confirmation.confirm_first_upload() {
            tracing::info!(task_id = %self.shared.id, "first upload warning declined");
            self.shared
                .request_setting_update
                .store(true, Ordering::SeqCst);
            self.stop();
        }

        if !self.stop_requested()
            && let Some(threshold) = upload.large_file_threshold()
        {
            let size = lock(&self.shared.resources)
                .payload
                .as_ref()
                .and_then(|payload| payload.len().ok())
                .unwrap_or(0);
            if size > threshold && !confirmation.confirm_large_file(size, threshold) {
                tracing::info!(task_id = %self.shared.id, size, threshold, "large file upload declined");
                self.stop();
            }
        }

        !self.stop_requested()
    }

    /// Run attempt `retry`; returns whether it was erroring
    async fn attempt(&self, retry: u32, policy: &RetryPolicy) -> bool {
        match policy.plan(retry) {
            AttemptPlan::Initial => {}
            AttemptPlan::Failover { secondary_index } => {
                self.with_info(|info| {
                    info.destinations = info.destinations.with_secondary(secondary_index);
                });
                tracing::debug!(task_id = %self.shared.id, secondary_index, "switched to secondary destinations");
            }
            AttemptPlan::Backoff(delay) => {
                if !wait_backoff(delay, &self.shared.stop).await {
                    return false;
                }
            }
        }

        if self.stop_requested() {
            return false;
        }

        let Some(uploader) = self.resolve_uploader() else {
            return false;
        };
        *lock(&self.shared.uploader) = Some(Arc::clone(&uploader));

        let erroring = self.send(&uploader, retry).await;

        let collected = uploader.errors();
        let erroring = erroring || !collected.is_empty();
        if !collected.is_empty() {
            self.with_info(|info| info.result.errors.extend(collected));
        }

        *lock(&self.shared.uploader) = None;
        erroring
    }

    /// Uploader for the task's current destination, if one is configured
    fn resolve_uploader(&self) -> Option<Arc<dyn Uploader>> {
        let factory = &self.shared.services.uploaders;
        self.with_info(|info| match info.upload_destination() {
            DataType::Image => factory.image_uploader(&info.destinations.image),
            DataType::Text => factory.text_uploader(&info.destinations.text),
            DataType::File => {
                let destination = match info.data_type {
                    DataType::Image => &info.destinations.image_file,
                    DataType::Text => &info.destinations.text_file,
                    _ => &info.destinations.file,
                };
                factory.file_uploader(destination)
            }
            DataType::Url => None,
        })
    }

    async fn send(&self, uploader: &Arc<dyn Uploader>, retry: u32) -> bool {
        let Some(mut payload) = lock(&self.shared.resources).payload.take() else {
            self.record_error(UploadError::Failed {
                destination: uploader.name().to_string(),
                reason: "no content to upload".to_string(),
            });
            return true;
        };

        if retry > 0
            && let Err(e) = payload.rewind()
        {
            self.record_error(Error::Io(e));
            lock(&self.shared.resources).payload = Some(payload);
            return true;
        }

        let ctx = self.upload_context();
        let file_name = self.with_info(|info| info.file_name.clone());
        tracing::debug!(
            task_id = %self.shared.id,
            destination = uploader.name(),
            file_name = %file_name,
            retry,
            "sending payload"
        );

        let outcome = tokio::select! {
            _ = self.shared.stop.cancelled() => None,
            result = uploader.upload(&mut payload, &file_name, &ctx) => Some(result),
        };

        lock(&self.shared.resources).payload = Some(payload);

        match outcome {
            None => {
                uploader.stop_upload();
                tracing::debug!(task_id = %self.shared.id, "upload cut short by stop request");
                false
            }
            Some(Ok(result)) => {
                let erroring = result.is_error();
                self.with_info(|info| info.result.absorb(result));
                erroring
            }
            Some(Err(e)) => {
                let retryable = e.is_retryable();
                let e = match e {
                    Error::Upload(e) => Error::Upload(e),
                    other => Error::Upload(UploadError::Failed {
                        destination: uploader.name().to_string(),
                        reason: other.to_string(),
                    }),
                };
                tracing::warn!(task_id = %self.shared.id, retryable, error = %e, "upload attempt failed");
                self.record_error(&e);
                true
            }
        }
    }

    fn upload_context(&self) -> UploadContext {
        let settings = &self.shared.settings;
        let progress_task = self.clone();
        let ctx = UploadContext::new(
            self.shared.id,
            settings.upload.buffer_size(),
            self.shared.stop.clone(),
        )
        .with_invalid_certificates(settings.upload.accept_invalid_ssl_certificates)
        .with_progress(move |progress| {
            progress_task.with_info(|info| info.progress = Some(progress));
            progress_task.emit(|task| TaskEvent::UploadProgressChanged { task });
        });

        if settings.after_upload.copy_url_to_clipboard && settings.advanced.early_copy_url {
            let clipboard = Arc::clone(&self.shared.services.clipboard);
            let id = self.shared.id;
            ctx.with_early_url(move |url| {
                if let Err(e) = clipboard.copy_text(url) {
                    tracing::warn!(task_id = %id, error = %e, "early URL copy failed");
                }
            })
        } else {
            ctx
        }
    }
}
