//! Collaborators the task pipeline delegates to
//!
//! The pipeline never talks to a network protocol, an image codec, the
//! clipboard or a dialog directly. Each of those sits behind a trait so a host
//! application can plug in real implementations and tests can plug in mocks.
//!
//! ## Architecture
//!
//! - [`UploaderFactory`] resolves destinations into [`Uploader`],
//!   [`UrlShortener`] and [`SharingService`] clients
//! - [`ImageProcessor`] applies effects, annotation, encoding and thumbnails
//! - [`Clipboard`], [`Shell`], [`SaveDialog`] and [`UploadConfirmation`] cover
//!   the desktop side
//! - [`Downloader`] fetches source content ([`HttpDownloader`] by default)
//! - [`FileAction`] runs against the task's file ([`ExternalProgram`](crate::config::ExternalProgram)
//!   implements it)
//!
//! [`Services`] bundles one of each together with the [`ProgressRelay`].
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use upload_task::services::{NoOpUploaderFactory, Services};
//!
//! let services = Services::new(Arc::new(NoOpUploaderFactory));
//! let mut events = services.relay.subscribe();
//! # let _ = &mut events;
//! ```

mod context;
mod external_program;
mod http;
mod noop;
mod traits;

pub use context::UploadContext;
pub use http::HttpDownloader;
pub use noop::{
    AutoConfirm, NoOpClipboard, NoOpDownloader, NoOpImageProcessor, NoOpSaveDialog, NoOpShell,
    NoOpUploaderFactory,
};
pub use traits::{
    CapturedImage, Clipboard, Downloader, EncodedImage, FileAction, ImageProcessor, SaveDialog,
    SharingService, Shell, UploadConfirmation, Uploader, UploaderFactory, UrlShortener,
};

use crate::relay::ProgressRelay;
use std::sync::Arc;

/// Collaborators shared by tasks
///
/// Cheap to clone; every field is reference counted.
#[derive(Clone)]
pub struct Services {
    /// Destination clients
    pub uploaders: Arc<dyn UploaderFactory>,
    /// Image transforms
    pub images: Arc<dyn ImageProcessor>,
    /// Clipboard
    pub clipboard: Arc<dyn Clipboard>,
    /// Open/reveal
    pub shell: Arc<dyn Shell>,
    /// Save-as picker
    pub save_dialog: Arc<dyn SaveDialog>,
    /// Pre-upload prompts
    pub confirmation: Arc<dyn UploadConfirmation>,
    /// Remote fetch for download-then-upload jobs
    pub downloader: Arc<dyn Downloader>,
    /// Actions run after the configured external programs
    pub file_actions: Vec<Arc<dyn FileAction>>,
    /// Event relay
    pub relay: ProgressRelay,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("file_actions", &self.file_actions.len())
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Headless collaborators around the given uploader factory
    pub fn new(uploaders: Arc<dyn UploaderFactory>) -> Self {
        Self {
            uploaders,
            images: Arc::new(NoOpImageProcessor),
            clipboard: Arc::new(NoOpClipboard),
            shell: Arc::new(NoOpShell),
            save_dialog: Arc::new(NoOpSaveDialog),
            confirmation: Arc::new(AutoConfirm),
            downloader: Arc::new(HttpDownloader::new()),
            file_actions: Vec::new(),
            relay: ProgressRelay::default(),
        }
    }

    /// Replace the image processor
    pub fn with_images(mut self, images: Arc<dyn ImageProcessor>) -> Self {
        self.images = images;
        self
    }

    /// Replace the clipboard
    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Replace the shell
    pub fn with_shell(mut self, shell: Arc<dyn Shell>) -> Self {
        self.shell = shell;
        self
    }

    /// Replace the save dialog
    pub fn with_save_dialog(mut self, save_dialog: Arc<dyn SaveDialog>) -> Self {
        self.save_dialog = save_dialog;
        self
    }

    /// Replace the confirmation prompts
    pub fn with_confirmation(mut self, confirmation: Arc<dyn UploadConfirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Replace the downloader
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Add a file action
    pub fn with_file_action(mut self, action: Arc<dyn FileAction>) -> Self {
        self.file_actions.push(action);
        self
    }

    /// Use an existing relay (e.g. one shared by every task of the application)
    pub fn with_relay(mut self, relay: ProgressRelay) -> Self {
        self.relay = relay;
        self
    }
}
