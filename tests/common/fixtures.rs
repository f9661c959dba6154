//! Test fixtures: an HTTP uploader and a factory serving it for every destination

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use upload_task::config::{
    FileDestination, ImageDestination, SharingServiceDestination, TextDestination,
    UrlShortenerDestination,
};
use upload_task::services::{SharingService, UrlShortener};
use upload_task::{
    Payload, Progress, TaskSettings, UploadContext, UploadError, UploadResult, Uploader,
    UploaderFactory,
};

/// Uploads the payload as the body of a POST and reads `{"url": ...}` back
pub struct HttpUploader {
    pub endpoint: String,
}

impl HttpUploader {
    pub fn new(endpoint: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    fn name(&self) -> &str {
        "http-test"
    }

    async fn upload(
        &self,
        payload: &mut Payload,
        file_name: &str,
        ctx: &UploadContext,
    ) -> upload_task::Result<UploadResult> {
        let body = payload.read_remaining()?;
        let length = body.len() as u64;

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(ctx.accept_invalid_certificates())
            .build()?;
        let response = client
            .post(&self.endpoint)
            .header("X-File-Name", file_name)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Status {
                destination: self.name().to_string(),
                status: response.status().as_u16(),
            }
            .into());
        }

        ctx.report_progress(Progress {
            position: length,
            length,
            speed_bps: 0,
        });

        let json: serde_json::Value = response.json().await?;
        Ok(UploadResult {
            url: json["url"].as_str().unwrap_or_default().to_string(),
            ..UploadResult::default()
        })
    }
}

/// Factory returning the same uploader for every destination
pub struct SingleHostFactory {
    pub uploader: Arc<dyn Uploader>,
}

impl SingleHostFactory {
    pub fn new(uploader: Arc<dyn Uploader>) -> Arc<Self> {
        Arc::new(Self { uploader })
    }
}

impl UploaderFactory for SingleHostFactory {
    fn image_uploader(&self, _destination: &ImageDestination) -> Option<Arc<dyn Uploader>> {
        Some(Arc::clone(&self.uploader))
    }

    fn text_uploader(&self, _destination: &TextDestination) -> Option<Arc<dyn Uploader>> {
        Some(Arc::clone(&self.uploader))
    }

    fn file_uploader(&self, _destination: &FileDestination) -> Option<Arc<dyn Uploader>> {
        Some(Arc::clone(&self.uploader))
    }

    fn url_shortener(
        &self,
        _destination: &UrlShortenerDestination,
    ) -> Option<Arc<dyn UrlShortener>> {
        None
    }

    fn sharing_service(
        &self,
        _destination: &SharingServiceDestination,
    ) -> Option<Arc<dyn SharingService>> {
        None
    }
}

/// Settings saving into `dir` with a short retry delay
pub fn settings_in(dir: &Path) -> TaskSettings {
    let mut settings = TaskSettings::default();
    settings.capture_folder = dir.to_path_buf();
    settings.upload.retry_delay = Duration::from_millis(10);
    settings.after_upload.copy_url_to_clipboard = false;
    settings
}
