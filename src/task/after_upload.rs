//! Post-upload action chain
//!
//! Steps run in a fixed order: force https, shorten, share, copy, open and
//! QR code. A failing step records a `PostUploadError` and the chain moves on.

use super::WorkerTask;
use crate::error::Error;
use crate::template;
use crate::types::{TaskEvent, TaskJob};

impl WorkerTask {
    pub(crate) async fn after_upload(&self) {
        let settings = &self.shared.settings;
        let tasks = &settings.after_upload;
        let advanced = &settings.advanced;
        let job = self.with_info(|info| info.job);

        if advanced.result_force_https {
            self.with_info(|info| info.result.force_https());
        }

        let url = self.with_info(|info| info.result.url.clone());
        let auto_shorten =
            advanced.auto_shorten_url_length > 0 && url.len() > advanced.auto_shorten_url_length;
        if job != TaskJob::ShareUrl
            && (tasks.use_url_shortener || job == TaskJob::ShortenUrl || auto_shorten)
        {
            self.shorten(&url).await;
        }

        if job != TaskJob::ShortenUrl && (tasks.share_url || job == TaskJob::ShareUrl) {
            let text = self.with_info(|info| info.result.to_string());
            self.share(&text).await;
            if job == TaskJob::ShareUrl {
                self.with_info(|info| info.result.is_url_expected = false);
            }
        }

        if tasks.copy_url_to_clipboard {
            let text = self.formatted(&advanced.clipboard_content_format);
            if !text.is_empty()
                && let Err(e) = self.shared.services.clipboard.copy_text(&text)
            {
                self.record_error(Error::step("copy_url", e));
            }
        }

        if tasks.open_url {
            let text = self.formatted(&advanced.open_url_format);
            if !text.is_empty()
                && let Err(e) = self.shared.services.shell.open_url(&text)
            {
                self.record_error(Error::step("open_url", e));
            }
        }

        if tasks.show_qr_code {
            let text = self.with_info(|info| info.result.to_string());
            if !text.is_empty() {
                self.emit(|task| TaskEvent::QrCodeRequested { id: task.id, text });
            }
        }

        tracing::debug!(task_id = %self.shared.id, "post-upload chain finished");
    }

    /// Render `format` against the task, or the plain result if it is empty
    fn formatted(&self, format: &str) -> String {
        self.with_info(|info| {
            if format.is_empty() {
                info.result.to_string()
            } else {
                template::render(format, info)
            }
        })
    }

    async fn shorten(&self, url: &str) {
        let destination = self.with_info(|info| info.destinations.url_shortener.clone());
        let Some(shortener) = self.shared.services.uploaders.url_shortener(&destination) else {
            tracing::debug!(task_id = %self.shared.id, destination = %destination, "no URL shortener configured");
            return;
        };

        match shortener.shorten_url(url).await {
            Ok(result) => {
                for error in &result.errors {
                    self.record_error(Error::step("shorten_url", error));
                }
                if !result.shortened_url.is_empty() {
                    tracing::info!(task_id = %self.shared.id, service = shortener.name(), "URL shortened");
                    self.with_info(|info| info.result.shortened_url = result.shortened_url);
                }
            }
            Err(e) => self.record_error(Error::step("shorten_url", e)),
        }
    }

    async fn share(&self, url: &str) {
        if url.is_empty() {
            return;
        }
        let destination = self.with_info(|info| info.destinations.url_sharing_service.clone());
        let Some(service) = self.shared.services.uploaders.sharing_service(&destination) else {
            tracing::debug!(task_id = %self.shared.id, destination = %destination, "no sharing service configured");
            return;
        };

        match service.share_url(url).await {
            Ok(()) => tracing::info!(task_id = %self.shared.id, service = service.name(), "URL shared"),
            Err(e) => self.record_error(Error::step("share_url", e)),
        }
    }
}
