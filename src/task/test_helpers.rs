//! Shared mock collaborators and settings for task tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::{
    FileDestination, ImageConfig, ImageDestination, SharingServiceDestination, TaskSettings,
    TextDestination, UrlShortenerDestination,
};
use crate::error::{Error, UploadError};
use crate::payload::Payload;
use crate::result::UploadResult;
use crate::services::{
    CapturedImage, Clipboard, Downloader, EncodedImage, ImageProcessor, Services, SharingService,
    Shell, UploadConfirmation, UploadContext, Uploader, UploaderFactory, UrlShortener,
};
use crate::types::{TaskEvent, TaskInfo};

/// Settings writing into `dir`, with a short retry delay and no clipboard copy of images
pub(crate) fn test_settings(dir: &Path) -> TaskSettings {
    let mut settings = TaskSettings::default();
    settings.capture_folder = dir.to_path_buf();
    settings.upload.retry_delay = Duration::from_millis(5);
    settings.after_capture.copy_image_to_clipboard = false;
    settings.after_upload.copy_url_to_clipboard = false;
    settings
}

pub(crate) fn test_image() -> CapturedImage {
    CapturedImage {
        width: 2,
        height: 2,
        pixels: vec![1, 2, 3, 4],
    }
}

/// How a mock uploader answers
#[derive(Clone, Debug)]
pub(crate) enum Behavior {
    /// Return this URL
    Succeed(String),
    /// Raise an error every time
    Fail,
    /// Return a result carrying an error but no exception
    ResultError,
    /// Fail this many times, then return the URL
    FailTimes(usize, String),
    /// Wait for the stop token, then return nothing
    Hang,
}

pub(crate) struct MockUploader {
    pub(crate) name: String,
    pub(crate) behavior: Behavior,
    pub(crate) calls: AtomicUsize,
    pub(crate) stop_calls: AtomicUsize,
    pub(crate) received: Mutex<Vec<(String, Vec<u8>)>>,
    pub(crate) early_url: Option<String>,
}

impl MockUploader {
    pub(crate) fn new(name: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            early_url: None,
        })
    }

    pub(crate) fn with_early_url(name: &str, url: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior: Behavior::Succeed(url.to_string()),
            calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            early_url: Some(url.to_string()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn received(&self) -> Vec<(String, Vec<u8>)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(
        &self,
        payload: &mut Payload,
        file_name: &str,
        ctx: &UploadContext,
    ) -> crate::Result<UploadResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = payload.read_remaining()?;
        self.received
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes.clone()));

        ctx.report_progress(crate::types::Progress {
            position: bytes.len() as u64,
            length: bytes.len() as u64,
            speed_bps: 0,
        });
        if let Some(url) = &self.early_url {
            ctx.copy_url_early(url);
        }

        match &self.behavior {
            Behavior::Succeed(url) => Ok(UploadResult::with_url(url.clone())),
            Behavior::Fail => Err(UploadError::Status {
                destination: self.name.clone(),
                status: 503,
            }
            .into()),
            Behavior::ResultError => {
                let mut result = UploadResult::default();
                result.add_error(format!("{} rejected the file", self.name));
                Ok(result)
            }
            Behavior::FailTimes(n, url) => {
                if call < *n {
                    Err(Error::Other(format!("attempt {} failed", call + 1)))
                } else {
                    Ok(UploadResult::with_url(url.clone()))
                }
            }
            Behavior::Hang => {
                ctx.stop_token().cancelled().await;
                Ok(UploadResult::default())
            }
        }
    }

    fn stop_upload(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct MockShortener {
    pub(crate) short: String,
    pub(crate) fail: bool,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl MockShortener {
    pub(crate) fn new(short: &str) -> Arc<Self> {
        Arc::new(Self {
            short: short.to_string(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            short: String::new(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl UrlShortener for MockShortener {
    fn name(&self) -> &str {
        "mock-shortener"
    }

    async fn shorten_url(&self, url: &str) -> crate::Result<UploadResult> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(Error::Other("shortener unavailable".into()));
        }
        Ok(UploadResult {
            shortened_url: self.short.clone(),
            ..UploadResult::default()
        })
    }
}

#[derive(Default)]
pub(crate) struct MockSharer {
    pub(crate) shared: Mutex<Vec<String>>,
}

#[async_trait]
impl SharingService for MockSharer {
    fn name(&self) -> &str {
        "mock-sharer"
    }

    async fn share_url(&self, url: &str) -> crate::Result<()> {
        self.shared.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Factory handing out mocks by destination name and recording every lookup
#[derive(Default)]
pub(crate) struct MockFactory {
    pub(crate) uploaders: HashMap<String, Arc<MockUploader>>,
    pub(crate) shortener: Option<Arc<MockShortener>>,
    pub(crate) sharer: Option<Arc<MockSharer>>,
    pub(crate) requested: Mutex<Vec<String>>,
}

impl MockFactory {
    pub(crate) fn with(uploaders: &[&Arc<MockUploader>]) -> Self {
        Self {
            uploaders: uploaders
                .iter()
                .map(|u| (u.name.clone(), Arc::clone(*u)))
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    fn lookup(&self, name: String) -> Option<Arc<dyn Uploader>> {
        let uploader = self
            .uploaders
            .get(&name)
            .map(|u| Arc::clone(u) as Arc<dyn Uploader>);
        self.requested.lock().unwrap().push(name);
        uploader
    }
}

impl UploaderFactory for MockFactory {
    fn image_uploader(&self, destination: &ImageDestination) -> Option<Arc<dyn Uploader>> {
        self.lookup(destination.to_string())
    }

    fn text_uploader(&self, destination: &TextDestination) -> Option<Arc<dyn Uploader>> {
        self.lookup(destination.to_string())
    }

    fn file_uploader(&self, destination: &FileDestination) -> Option<Arc<dyn Uploader>> {
        self.lookup(destination.to_string())
    }

    fn url_shortener(
        &self,
        _destination: &UrlShortenerDestination,
    ) -> Option<Arc<dyn UrlShortener>> {
        self.shortener
            .as_ref()
            .map(|s| Arc::clone(s) as Arc<dyn UrlShortener>)
    }

    fn sharing_service(
        &self,
        _destination: &SharingServiceDestination,
    ) -> Option<Arc<dyn SharingService>> {
        self.sharer
            .as_ref()
            .map(|s| Arc::clone(s) as Arc<dyn SharingService>)
    }
}

/// Image processor that encodes the raw pixels as "png"
#[derive(Default)]
pub(crate) struct MockImages {
    pub(crate) empty_effects: bool,
    pub(crate) thumbnails: AtomicUsize,
}

impl ImageProcessor for MockImages {
    fn load(&self, _path: &Path) -> crate::Result<CapturedImage> {
        Ok(test_image())
    }

    fn apply_effects(
        &self,
        image: CapturedImage,
        _settings: &TaskSettings,
    ) -> Option<CapturedImage> {
        if self.empty_effects { None } else { Some(image) }
    }

    fn annotate(&self, image: CapturedImage, _file_name: &str) -> Option<CapturedImage> {
        Some(image)
    }

    fn print(&self, _image: &CapturedImage) -> crate::Result<()> {
        Ok(())
    }

    fn encode(&self, image: &CapturedImage, config: &ImageConfig) -> crate::Result<EncodedImage> {
        Ok(EncodedImage {
            bytes: image.pixels.clone(),
            extension: config.format.clone(),
        })
    }

    fn create_thumbnail(
        &self,
        _image: &CapturedImage,
        folder: &Path,
        file_name: &str,
        config: &ImageConfig,
    ) -> crate::Result<Option<PathBuf>> {
        self.thumbnails.fetch_add(1, Ordering::SeqCst);
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = folder.join(format!("{stem}{}.png", config.thumbnail_suffix));
        std::fs::write(&path, b"thumb")?;
        Ok(Some(path))
    }
}

#[derive(Default)]
pub(crate) struct RecordingClipboard {
    pub(crate) texts: Mutex<Vec<String>>,
    pub(crate) files: Mutex<Vec<PathBuf>>,
    pub(crate) cleared: AtomicUsize,
    pub(crate) fail: bool,
}

impl RecordingClipboard {
    pub(crate) fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

impl Clipboard for RecordingClipboard {
    fn clear(&self) -> crate::Result<()> {
        self.cleared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn copy_image(&self, _image: &CapturedImage) -> crate::Result<()> {
        Ok(())
    }

    fn copy_file(&self, path: &Path) -> crate::Result<()> {
        self.files.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn copy_text(&self, text: &str) -> crate::Result<()> {
        if self.fail {
            return Err(Error::Other("clipboard busy".into()));
        }
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingShell {
    pub(crate) opened: Mutex<Vec<String>>,
    pub(crate) revealed: Mutex<Vec<PathBuf>>,
}

impl Shell for RecordingShell {
    fn open_url(&self, url: &str) -> crate::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn open_folder_with_file(&self, path: &Path) -> crate::Result<()> {
        self.revealed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Confirmation prompts with fixed answers
pub(crate) struct FixedConfirmation {
    pub(crate) first_upload: bool,
    pub(crate) large_file: bool,
    pub(crate) before_upload: bool,
}

impl Default for FixedConfirmation {
    fn default() -> Self {
        Self {
            first_upload: true,
            large_file: true,
            before_upload: true,
        }
    }
}

impl UploadConfirmation for FixedConfirmation {
    fn confirm_first_upload(&self) -> bool {
        self.first_upload
    }

    fn confirm_large_file(&self, _size: u64, _threshold: u64) -> bool {
        self.large_file
    }

    fn confirm_before_upload(&self, _info: &TaskInfo) -> bool {
        self.before_upload
    }
}

/// Downloader writing fixed content, or failing
pub(crate) struct MockDownloader {
    pub(crate) content: Option<Vec<u8>>,
    /// Never finish; only a stop request ends the download
    pub(crate) hang: bool,
    pub(crate) urls: Mutex<Vec<String>>,
}

impl MockDownloader {
    pub(crate) fn serving(content: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            content: Some(content.to_vec()),
            hang: false,
            urls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            content: None,
            hang: false,
            urls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn hanging() -> Arc<Self> {
        Arc::new(Self {
            content: None,
            hang: true,
            urls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requested(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        _accept_invalid_certs: bool,
    ) -> crate::Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.hang {
            std::future::pending::<()>().await;
        }
        match &self.content {
            Some(content) => {
                crate::utils::create_parent_dir(destination)?;
                std::fs::write(destination, content)?;
                Ok(())
            }
            None => Err(crate::error::DownloadError::Status {
                url: url.to_string(),
                status: 404,
            }
            .into()),
        }
    }
}

pub(crate) fn services(factory: &Arc<MockFactory>) -> Services {
    Services::new(Arc::clone(factory) as Arc<dyn UploaderFactory>)
}

/// Drain events until the terminal event (or a quiet second)
pub(crate) async fn drain(rx: &mut broadcast::Receiver<TaskEvent>) -> Vec<TaskEvent> {
    let mut events = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await {
        let done = event.is_completed();
        events.push(event);
        if done {
            break;
        }
    }
    events
}
