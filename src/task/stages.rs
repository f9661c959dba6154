//! Stages that run before upload

use std::path::Path;
use std::sync::Arc;

use super::{WorkerTask, lock, status_text};
use crate::error::{DownloadError, Error, Result, TransformError};
use crate::payload::Payload;
use crate::services::FileAction;
use crate::types::TaskJob;
use crate::utils::{change_extension, check_file_path, create_parent_dir};

impl WorkerTask {
    /// Pre-flight, transform, file side effects, text and rewind
    ///
    /// `Ok(false)` means the task should stop without recording an error.
    pub(crate) async fn run_stages(&self) -> Result<bool> {
        if !self.preflight().await? {
            return Ok(false);
        }

        let job = self.with_info(|info| info.job);
        match job {
            TaskJob::ContentJob => {
                if self.stop_requested() || !self.after_capture()? {
                    return Ok(false);
                }
                if self.stop_requested() {
                    return Ok(false);
                }
                self.file_jobs().await;
            }
            TaskJob::TextUpload => {
                if self.stop_requested() {
                    return Ok(false);
                }
                self.text_jobs()?;
            }
            TaskJob::FileUpload
                if self
                    .shared
                    .settings
                    .advanced
                    .use_after_capture_tasks_during_file_upload =>
            {
                if self.stop_requested() {
                    return Ok(false);
                }
                self.file_jobs().await;
            }
            _ => {}
        }

        if self.is_upload_job()
            && let Some(payload) = lock(&self.shared.resources).payload.as_mut()
        {
            payload.rewind()?;
        }

        Ok(true)
    }

    async fn preflight(&self) -> Result<bool> {
        if self.is_upload_job()
            && self.shared.settings.advanced.auto_clear_clipboard
            && let Err(e) = self.shared.services.clipboard.clear()
        {
            tracing::warn!(task_id = %self.shared.id, error = %e, "failed to clear clipboard");
        }

        if self.with_info(|info| info.job) == TaskJob::DownloadUpload {
            return Ok(self.download_source().await);
        }
        Ok(true)
    }

    /// Fetch the source URL into the capture folder and open it as the payload
    async fn download_source(&self) -> bool {
        let settings = &self.shared.settings;
        let (url, file_name) = self.with_info(|info| {
            let url = info.result.url.trim().to_string();
            info.result.url.clear();
            (url, info.file_name.clone())
        });

        let Some(path) =
            check_file_path(&settings.capture_folder, &file_name, settings.file_collision)
        else {
            self.record_error(DownloadError::NoDestination { file_name });
            return false;
        };
        self.with_info(|info| info.set_file_path(path.clone()));

        self.set_status_text(status_text::DOWNLOADING);
        self.emit_status_changed();
        tracing::info!(task_id = %self.shared.id, url = %url, path = %path.display(), "downloading source");

        let download = self.shared.services.downloader.download(
            &url,
            &path,
            settings.upload.accept_invalid_ssl_certificates,
        );
        let result = tokio::select! {
            _ = self.shared.stop.cancelled() => return false,
            result = download => result,
        };

        if let Err(e) = result {
            self.record_error(&e);
            return false;
        }

        match Payload::open(&path) {
            Ok(payload) => {
                lock(&self.shared.resources).payload = Some(payload);
                true
            }
            Err(e) => {
                self.record_error(Error::Io(e));
                false
            }
        }
    }

    /// Effects, annotation, clipboard/printer, encoding, saving and thumbnail
    fn after_capture(&self) -> Result<bool> {
        let Some(mut image) = lock(&self.shared.resources).image.take() else {
            return Ok(true);
        };

        let settings = &self.shared.settings;
        let tasks = &settings.after_capture;
        let images = &self.shared.services.images;
        let file_name = self.with_info(|info| info.file_name.clone());

        if tasks.add_image_effects {
            match images.apply_effects(image, settings) {
                Some(next) if !next.is_empty() => image = next,
                _ => {
                    tracing::warn!(task_id = %self.shared.id, "{}", TransformError::EffectsEmpty);
                    return Ok(false);
                }
            }
        }

        if tasks.annotate_image {
            match images.annotate(image, &file_name) {
                Some(next) if !next.is_empty() => image = next,
                _ => {
                    tracing::debug!(task_id = %self.shared.id, "{}", TransformError::AnnotationEmpty);
                    return Ok(false);
                }
            }
        }

        if tasks.copy_image_to_clipboard {
            match self.shared.services.clipboard.copy_image(&image) {
                Ok(()) => tracing::debug!(task_id = %self.shared.id, "image copied to clipboard"),
                Err(e) => self.record_error(&e),
            }
        }

        if tasks.send_image_to_printer
            && let Err(e) = images.print(&image)
        {
            self.record_error(&e);
        }

        if !tasks.needs_encoding() {
            return Ok(true);
        }

        let encoded = match images.encode(&image, &settings.image) {
            Ok(encoded) if !encoded.bytes.is_empty() => encoded,
            Ok(_) => {
                tracing::warn!(task_id = %self.shared.id, "image encoding produced no data");
                return Ok(false);
            }
            Err(e) => {
                self.record_error(TransformError::EncodeFailed {
                    reason: e.to_string(),
                });
                return Ok(false);
            }
        };

        let file_name = change_extension(&file_name, &encoded.extension);
        self.with_info(|info| info.file_name = file_name.clone());

        if tasks.save_image_to_file
            && let Some(path) =
                check_file_path(&settings.capture_folder, &file_name, settings.file_collision)
        {
            match write_file(&path, &encoded.bytes) {
                Ok(()) => {
                    tracing::info!(task_id = %self.shared.id, path = %path.display(), "image saved to file");
                    self.with_info(|info| info.set_file_path(path));
                }
                Err(e) => self.record_error(Error::Io(e)),
            }
        }

        if tasks.save_image_to_file_with_dialog {
            self.save_with_dialog(&file_name, &encoded.bytes);
        }

        if tasks.save_thumbnail_image_to_file {
            let (folder, name) = self.with_info(|info| match &info.file_path {
                Some(path) => (
                    path.parent().map(Path::to_path_buf).unwrap_or_default(),
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| info.file_name.clone()),
                ),
                None => (settings.capture_folder.clone(), info.file_name.clone()),
            });

            match images.create_thumbnail(&image, &folder, &name, &settings.image) {
                Ok(Some(thumbnail)) => {
                    tracing::debug!(task_id = %self.shared.id, path = %thumbnail.display(), "thumbnail saved");
                    self.with_info(|info| info.thumbnail_file_path = Some(thumbnail));
                }
                Ok(None) => {}
                Err(e) => self.record_error(&e),
            }
        }

        lock(&self.shared.resources).payload = Some(Payload::from_bytes(encoded.bytes));
        Ok(true)
    }

    /// Ask for a location until a write succeeds or the dialog is cancelled
    fn save_with_dialog(&self, file_name: &str, bytes: &[u8]) {
        let folder = self.shared.settings.capture_folder.clone();
        while let Some(path) = self
            .shared
            .services
            .save_dialog
            .choose_save_path(&folder, file_name)
        {
            self.with_info(|info| info.set_file_path(path.clone()));
            match write_file(&path, bytes) {
                Ok(()) => {
                    tracing::info!(task_id = %self.shared.id, path = %path.display(), "image saved with dialog");
                    break;
                }
                Err(e) => {
                    tracing::warn!(task_id = %self.shared.id, path = %path.display(), error = %e, "save failed, asking again")
                }
            }
        }
    }

    /// File actions, then clipboard copy and reveal; each step is independent
    async fn file_jobs(&self) {
        let tasks = &self.shared.settings.after_capture;
        let Some(mut path) = self.with_info(|info| info.file_path.clone()) else {
            return;
        };
        if !path.is_file() {
            return;
        }

        if tasks.perform_actions {
            let actions = self.file_actions();
            if !actions.is_empty() {
                lock(&self.shared.resources).payload = None;

                for action in actions {
                    match action.run(&path).await {
                        Ok(next) => path = next,
                        Err(e) => {
                            tracing::warn!(task_id = %self.shared.id, action = action.name(), error = %e, "file action failed");
                            self.record_error(&e);
                        }
                    }
                }

                self.with_info(|info| info.set_file_path(path.clone()));
                match Payload::open(&path) {
                    Ok(payload) => lock(&self.shared.resources).payload = Some(payload),
                    Err(e) => self.record_error(TransformError::OpenFailed {
                        path: path.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
        }

        let clipboard = &self.shared.services.clipboard;
        let copied = if tasks.copy_file_to_clipboard {
            Some(clipboard.copy_file(&path))
        } else if tasks.copy_file_path_to_clipboard {
            Some(clipboard.copy_text(&path.to_string_lossy()))
        } else {
            None
        };
        if let Some(Err(e)) = copied {
            self.record_error(&e);
        }

        if tasks.show_in_explorer
            && let Err(e) = self.shared.services.shell.open_folder_with_file(&path)
        {
            self.record_error(&e);
        }
    }

    /// Active external programs followed by extra service actions
    fn file_actions(&self) -> Vec<Arc<dyn FileAction>> {
        self.shared
            .settings
            .external_programs
            .iter()
            .filter(|program| program.is_active)
            .map(|program| Arc::new(program.clone()) as Arc<dyn FileAction>)
            .chain(self.shared.services.file_actions.iter().cloned())
            .collect()
    }

    /// Optionally persist the text, then encode it as the payload
    fn text_jobs(&self) -> Result<()> {
        let Some(text) = lock(&self.shared.resources).text.take() else {
            return Ok(());
        };
        if text.is_empty() {
            return Ok(());
        }

        let settings = &self.shared.settings;
        if settings.advanced.text_task_save_as_file {
            let file_name = self.with_info(|info| info.file_name.clone());
            if let Some(path) =
                check_file_path(&settings.capture_folder, &file_name, settings.file_collision)
            {
                write_file(&path, text.as_bytes())?;
                tracing::info!(task_id = %self.shared.id, path = %path.display(), "text saved to file");
                self.with_info(|info| info.set_file_path(path));
            }
        }

        lock(&self.shared.resources).payload = Some(Payload::from_text(&text));
        Ok(())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    create_parent_dir(path)?;
    std::fs::write(path, bytes)
}
