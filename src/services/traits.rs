//! Collaborator traits the task pipeline calls into

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::context::UploadContext;
use crate::config::{
    FileDestination, ImageConfig, ImageDestination, SharingServiceDestination, TaskSettings,
    TextDestination, UrlShortenerDestination,
};
use crate::payload::Payload;
use crate::result::UploadResult;
use crate::types::TaskInfo;

/// Decoded image held in memory by a content job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel data, layout owned by the image processor
    pub pixels: Vec<u8>,
}

impl CapturedImage {
    /// Whether the image has no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Image serialized into its target format
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// Extension of the format, without the dot (e.g. "png")
    pub extension: String,
}

/// Client for one upload destination
///
/// Uploaders are obtained fresh from the [`UploaderFactory`] for every attempt.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Destination name for logging
    fn name(&self) -> &str;

    /// Send the payload under `file_name`
    ///
    /// The payload is positioned at its first byte. Progress, early URL copy
    /// and stop checks go through `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails; the engine records it and may retry.
    async fn upload(
        &self,
        payload: &mut Payload,
        file_name: &str,
        ctx: &UploadContext,
    ) -> crate::Result<UploadResult>;

    /// Abort an in-flight upload
    fn stop_upload(&self) {}

    /// Errors the uploader collected without failing the call
    fn errors(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Shortens a result URL
#[async_trait]
pub trait UrlShortener: Send + Sync {
    /// Service name for logging
    fn name(&self) -> &str;

    /// Shorten `url`; the shortened form is read from `shortened_url`
    async fn shorten_url(&self, url: &str) -> crate::Result<UploadResult>;
}

/// Shares a result URL
#[async_trait]
pub trait SharingService: Send + Sync {
    /// Service name for logging
    fn name(&self) -> &str;

    /// Share `url`
    async fn share_url(&self, url: &str) -> crate::Result<()>;
}

/// Resolves configured destinations into clients
///
/// `None` means the destination is not configured; the pipeline treats it as
/// an empty result and records no error.
pub trait UploaderFactory: Send + Sync {
    /// Uploader for an image host
    fn image_uploader(&self, destination: &ImageDestination) -> Option<Arc<dyn Uploader>>;

    /// Uploader for a text host
    fn text_uploader(&self, destination: &TextDestination) -> Option<Arc<dyn Uploader>>;

    /// Uploader for a file host
    fn file_uploader(&self, destination: &FileDestination) -> Option<Arc<dyn Uploader>>;

    /// Client for a URL shortener
    fn url_shortener(&self, destination: &UrlShortenerDestination)
    -> Option<Arc<dyn UrlShortener>>;

    /// Client for a sharing service
    fn sharing_service(
        &self,
        destination: &SharingServiceDestination,
    ) -> Option<Arc<dyn SharingService>>;
}

/// Image transforms used by content jobs
///
/// `None` from a transform means it produced no image (effects failed,
/// annotation cancelled) and the task stops.
pub trait ImageProcessor: Send + Sync {
    /// Decode an image file
    fn load(&self, path: &Path) -> crate::Result<CapturedImage>;

    /// Apply the configured image effects
    fn apply_effects(&self, image: CapturedImage, settings: &TaskSettings)
    -> Option<CapturedImage>;

    /// Open the annotation editor
    fn annotate(&self, image: CapturedImage, file_name: &str) -> Option<CapturedImage>;

    /// Send the image to the printer
    fn print(&self, image: &CapturedImage) -> crate::Result<()>;

    /// Serialize into the configured format
    fn encode(&self, image: &CapturedImage, config: &ImageConfig) -> crate::Result<EncodedImage>;

    /// Write a thumbnail next to `file_name` inside `folder`
    ///
    /// Returns the thumbnail path, or `None` if no thumbnail was written.
    fn create_thumbnail(
        &self,
        image: &CapturedImage,
        folder: &Path,
        file_name: &str,
        config: &ImageConfig,
    ) -> crate::Result<Option<PathBuf>>;
}

/// System clipboard
pub trait Clipboard: Send + Sync {
    /// Clear the clipboard
    fn clear(&self) -> crate::Result<()>;
    /// Copy an image
    fn copy_image(&self, image: &CapturedImage) -> crate::Result<()>;
    /// Copy a file reference
    fn copy_file(&self, path: &Path) -> crate::Result<()>;
    /// Copy text
    fn copy_text(&self, text: &str) -> crate::Result<()>;
}

/// Desktop shell integration
pub trait Shell: Send + Sync {
    /// Open a URL in the default handler
    fn open_url(&self, url: &str) -> crate::Result<()>;
    /// Reveal a file in the file manager
    fn open_folder_with_file(&self, path: &Path) -> crate::Result<()>;
}

/// Interactive save-location picker
///
/// Implementations own any "last used folder" state.
pub trait SaveDialog: Send + Sync {
    /// Ask where to save `file_name`; `None` means the user cancelled
    fn choose_save_path(&self, default_folder: &Path, file_name: &str) -> Option<PathBuf>;
}

/// Confirmations asked before the upload stage
pub trait UploadConfirmation: Send + Sync {
    /// One-time upload warning; `false` stops the task and requests a settings update
    fn confirm_first_upload(&self) -> bool;

    /// Payload of `size` bytes exceeds `threshold`; `false` stops the task
    fn confirm_large_file(&self, size: u64, threshold: u64) -> bool;

    /// Last look at the task before sending; `false` skips the upload
    fn confirm_before_upload(&self, info: &TaskInfo) -> bool;
}

/// Fetches remote content for download-then-upload jobs
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `destination`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the server answers with a
    /// failure status, or the file cannot be written.
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        accept_invalid_certs: bool,
    ) -> crate::Result<()>;
}

/// Action run against the task's file
#[async_trait]
pub trait FileAction: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str;

    /// Run against `file_path`; returns the path the task should continue with
    async fn run(&self, file_path: &Path) -> crate::Result<PathBuf>;
}
