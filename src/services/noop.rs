//! No-op collaborators for headless use
//!
//! These let a task run without a desktop environment. Transforms pass the
//! image through unchanged, confirmations always accept, and anything that
//! needs real platform support returns `Error::NotSupported`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::traits::{
    CapturedImage, Clipboard, Downloader, EncodedImage, ImageProcessor, SaveDialog,
    SharingService, Shell, UploadConfirmation, Uploader, UploaderFactory, UrlShortener,
};
use crate::config::{
    FileDestination, ImageConfig, ImageDestination, SharingServiceDestination, TaskSettings,
    TextDestination, UrlShortenerDestination,
};
use crate::types::TaskInfo;

/// Factory with no configured destinations
pub struct NoOpUploaderFactory;

impl UploaderFactory for NoOpUploaderFactory {
    fn image_uploader(&self, _destination: &ImageDestination) -> Option<Arc<dyn Uploader>> {
        None
    }

    fn text_uploader(&self, _destination: &TextDestination) -> Option<Arc<dyn Uploader>> {
        None
    }

    fn file_uploader(&self, _destination: &FileDestination) -> Option<Arc<dyn Uploader>> {
        None
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

/// Pass-through image processor without codec support
pub struct NoOpImageProcessor;

impl ImageProcessor for NoOpImageProcessor {
    fn load(&self, path: &Path) -> crate::Result<CapturedImage> {
        Err(crate::Error::NotSupported(format!(
            "no image processor configured to decode {}",
            path.display()
        )))
    }

    fn apply_effects(
        &self,
        image: CapturedImage,
        _settings: &TaskSettings,
    ) -> Option<CapturedImage> {
        Some(image)
    }

    fn annotate(&self, image: CapturedImage, _file_name: &str) -> Option<CapturedImage> {
        Some(image)
    }

    fn print(&self, _image: &CapturedImage) -> crate::Result<()> {
        Err(crate::Error::NotSupported("printing".into()))
    }

    fn encode(&self, _image: &CapturedImage, config: &ImageConfig) -> crate::Result<EncodedImage> {
        Err(crate::Error::NotSupported(format!(
            "no image processor configured to encode {}",
            config.format
        )))
    }

    fn create_thumbnail(
        &self,
        _image: &CapturedImage,
        _folder: &Path,
        _file_name: &str,
        _config: &ImageConfig,
    ) -> crate::Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Clipboard that discards everything
pub struct NoOpClipboard;

impl Clipboard for NoOpClipboard {
    fn clear(&self) -> crate::Result<()> {
        Ok(())
    }

    fn copy_image(&self, _image: &CapturedImage) -> crate::Result<()> {
        Ok(())
    }

    fn copy_file(&self, _path: &Path) -> crate::Result<()> {
        Ok(())
    }

    fn copy_text(&self, _text: &str) -> crate::Result<()> {
        Ok(())
    }
}

/// Shell without a desktop
pub struct NoOpShell;

impl Shell for NoOpShell {
    fn open_url(&self, url: &str) -> crate::Result<()> {
        Err(crate::Error::NotSupported(format!("opening {}", url)))
    }

    fn open_folder_with_file(&self, path: &Path) -> crate::Result<()> {
        Err(crate::Error::NotSupported(format!(
            "revealing {}",
            path.display()
        )))
    }
}

/// Save dialog that is always cancelled
pub struct NoOpSaveDialog;

impl SaveDialog for NoOpSaveDialog {
    fn choose_save_path(&self, _default_folder: &Path, _file_name: &str) -> Option<PathBuf> {
        None
    }
}

/// Confirmation that accepts every prompt
pub struct AutoConfirm;

impl UploadConfirmation for AutoConfirm {
    fn confirm_first_upload(&self) -> bool {
        true
    }

    fn confirm_large_file(&self, _size: u64, _threshold: u64) -> bool {
        true
    }

    fn confirm_before_upload(&self, _info: &TaskInfo) -> bool {
        true
    }
}

/// Downloader that refuses every fetch
pub struct NoOpDownloader;

#[async_trait]
impl Downloader for NoOpDownloader {
    async fn download(
        &self,
        url: &str,
        _destination: &Path,
        _accept_invalid_certs: bool,
    ) -> crate::Result<()> {
        Err(crate::Error::NotSupported(format!("downloading {}", url)))
    }
}
