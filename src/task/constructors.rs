//! Factory profiles for every job kind
//!
//! Each constructor validates the settings snapshot and returns a task in
//! `InQueue` (or `History` for replay records).

use std::path::Path;
use std::sync::Arc;

use super::{Resources, WorkerTask, lock};
use crate::config::TaskSettings;
use crate::error::{DownloadError, Result, TransformError};
use crate::payload::Payload;
use crate::services::{CapturedImage, Services};
use crate::types::{DataType, HistoryRecord, TaskInfo, TaskJob, TaskStatus};
use crate::utils::{
    append_extension, extension_of, file_name_from_url, find_data_type, generate_file_name,
    url_decode, valid_file_name,
};

/// Extension given to in-memory images until encoding picks the real one
const PLACEHOLDER_IMAGE_EXTENSION: &str = "bmp";

impl WorkerTask {
    /// Content job for an in-memory image
    pub fn image_upload(
        image: CapturedImage,
        custom_name: Option<&str>,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Result<Self> {
        settings.validate()?;

        let mut info = new_info(TaskJob::ContentJob, DataType::Image, &settings);
        info.file_name = match custom_name.filter(|n| !n.is_empty()) {
            Some(name) => append_extension(name, PLACEHOLDER_IMAGE_EXTENSION),
            None => generate_file_name(
                &settings,
                PLACEHOLDER_IMAGE_EXTENSION,
                Some((image.width, image.height)),
            ),
        };

        let resources = Resources {
            image: Some(image),
            ..Resources::default()
        };
        Ok(Self::queued(info, resources, settings, services))
    }

    /// Upload a caller-supplied payload as-is
    pub fn data_upload(
        data_type: DataType,
        payload: Payload,
        file_name: &str,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Result<Self> {
        settings.validate()?;

        let mut info = new_info(TaskJob::DataUpload, data_type, &settings);
        info.file_name = file_name.to_string();
        if let Some(path) = payload.path() {
            info.file_path = Some(path.to_path_buf());
        }

        let resources = Resources {
            payload: Some(payload),
            ..Resources::default()
        };
        Ok(Self::queued(info, resources, settings, services))
    }

    /// Upload a file from disk
    ///
    /// Image files go through the content job instead when
    /// `process_images_during_file_upload` is set.
    pub fn file_upload(
        path: &Path,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Result<Self> {
        settings.validate()?;

        let data_type = find_data_type(&path.to_string_lossy(), &settings);
        let mut info = new_info(TaskJob::FileUpload, data_type, &settings);
        info.set_file_path(path.to_path_buf());
        if settings.file_upload_use_name_pattern {
            info.file_name = pattern_name(&settings, path);
        }

        let mut resources = Resources::default();
        if settings.advanced.process_images_during_file_upload && data_type == DataType::Image {
            info.job = TaskJob::ContentJob;
            resources.image = Some(services.images.load(path)?);
        } else {
            resources.payload = Some(open_payload(path)?);
        }

        Ok(Self::queued(info, resources, settings, services))
    }

    /// Content job for a file already on disk
    ///
    /// The file is opened only if the task will upload it.
    pub fn file_job(
        path: &Path,
        custom_name: Option<&str>,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Result<Self> {
        settings.validate()?;

        let data_type = find_data_type(&path.to_string_lossy(), &settings);
        let mut info = new_info(TaskJob::ContentJob, data_type, &settings);
        info.set_file_path(path.to_path_buf());
        if let Some(name) = custom_name.filter(|n| !n.is_empty()) {
            let ext = extension_of(&path.to_string_lossy()).unwrap_or_default();
            info.file_name = append_extension(name, &ext);
        } else if settings.file_upload_use_name_pattern {
            info.file_name = pattern_name(&settings, path);
        }

        let task = Self::queued(info, Resources::default(), settings, services);
        if task.is_upload_job() {
            lock(&task.shared.resources).payload = Some(open_payload(path)?);
        }
        Ok(task)
    }

    /// Upload text
    pub fn text_upload(
        text: impl Into<String>,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Result<Self> {
        settings.validate()?;

        let mut info = new_info(TaskJob::TextUpload, DataType::Text, &settings);
        info.file_name = generate_file_name(&settings, &settings.advanced.text_file_extension, None);

        let resources = Resources {
            text: Some(text.into()),
            ..Resources::default()
        };
        Ok(Self::queued(info, resources, settings, services))
    }

    /// Hand a URL to the configured shortener
    pub fn shorten_url(
        url: impl Into<String>,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Result<Self> {
        settings.validate()?;

        let mut info = new_info(TaskJob::ShortenUrl, DataType::Url, &settings);
        info.file_name = format!("Shorten URL ({})", settings.destinations.url_shortener);
        info.result.url = url.into();
        Ok(Self::queued(info, Resources::default(), settings, services))
    }

    /// Hand a URL to the configured sharing service
    pub fn share_url(
        url: impl Into<String>,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Result<Self> {
        settings.validate()?;

        let mut info = new_info(TaskJob::ShareUrl, DataType::Url, &settings);
        info.file_name = format!("Share URL ({})", settings.destinations.url_sharing_service);
        info.result.url = url.into();
        Ok(Self::queued(info, Resources::default(), settings, services))
    }

    /// Fetch `url` into the capture folder, then upload it
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] if no file name can be derived
    /// from the URL.
    pub fn download_upload(
        url: &str,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Result<Self> {
        settings.validate()?;

        let data_type = find_data_type(url, &settings);
        let mut file_name = valid_file_name(&file_name_from_url(&url_decode(url)));
        if settings.file_upload_use_name_pattern {
            let ext = extension_of(&file_name).unwrap_or_default();
            file_name = generate_file_name(&settings, &ext, None);
        }

        if file_name.is_empty() {
            return Err(DownloadError::InvalidUrl {
                url: url.to_string(),
                reason: "no file name in URL".to_string(),
            }
            .into());
        }

        let mut info = new_info(TaskJob::DownloadUpload, data_type, &settings);
        info.file_name = file_name;
        info.result.url = url.to_string();
        Ok(Self::queued(info, Resources::default(), settings, services))
    }

    /// Replay-only task rebuilt from a history record
    pub fn from_history(record: &HistoryRecord, services: Services) -> Self {
        let settings = Arc::new(TaskSettings::default());
        let data_type = find_data_type(&record.file_name, &settings);
        let mut info = new_info(TaskJob::HistoryReplay, data_type, &settings);
        info.file_path = record.file_path.clone();
        info.file_name = record.file_name.clone();
        info.result.url = record.url.clone();
        info.result.thumbnail_url = record.thumbnail_url.clone();
        info.result.deletion_url = record.deletion_url.clone();
        info.result.shortened_url = record.shortened_url.clone();
        info.end_time = Some(record.time);

        Self::from_parts(
            TaskStatus::History,
            info,
            Resources::default(),
            settings,
            services,
        )
    }

    fn queued(
        info: TaskInfo,
        resources: Resources,
        settings: Arc<TaskSettings>,
        services: Services,
    ) -> Self {
        let task = Self::from_parts(TaskStatus::InQueue, info, resources, settings, services);
        tracing::debug!(
            task_id = %task.shared.id,
            job = ?task.with_info(|info| info.job),
            "task created"
        );
        task
    }
}

fn new_info(job: TaskJob, data_type: DataType, settings: &TaskSettings) -> TaskInfo {
    TaskInfo::new(job, data_type, settings.destinations.clone())
}

fn pattern_name(settings: &TaskSettings, path: &Path) -> String {
    let ext = extension_of(&path.to_string_lossy()).unwrap_or_default();
    generate_file_name(settings, &ext, None)
}

fn open_payload(path: &Path) -> Result<Payload> {
    Payload::open(path).map_err(|e| {
        TransformError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}
