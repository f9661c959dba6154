//! Configuration types for upload-task
//!
//! A [`TaskSettings`] value is the immutable snapshot a task captures when it is
//! created. Nothing in the pipeline writes back into it; per-task mutable state
//! (such as the destinations substituted during failover) lives on the task.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::{path::PathBuf, time::Duration};

/// Image upload target
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageDestination {
    /// A dedicated image host, identified by service name
    Host(String),
    /// Route images through the configured image file destination
    FileUploader,
}

/// Text upload target
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextDestination {
    /// A dedicated text/paste host, identified by service name
    Host(String),
    /// Route text through the configured text file destination
    FileUploader,
}

/// File upload target, identified by service name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileDestination(pub String);

/// URL shortening service, identified by service name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlShortenerDestination(pub String);

/// URL sharing service, identified by service name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharingServiceDestination(pub String);

impl fmt::Display for ImageDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDestination::Host(name) => write!(f, "{}", name),
            ImageDestination::FileUploader => write!(f, "file uploader"),
        }
    }
}

impl fmt::Display for TextDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextDestination::Host(name) => write!(f, "{}", name),
            TextDestination::FileUploader => write!(f, "file uploader"),
        }
    }
}

impl fmt::Display for FileDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UrlShortenerDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SharingServiceDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upload destinations (primary targets plus ordered failover lists)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Image destination (default: imgur)
    #[serde(default = "default_image_destination")]
    pub image: ImageDestination,

    /// File destination used for images when `image` is `FileUploader`
    #[serde(default = "default_file_destination")]
    pub image_file: FileDestination,

    /// Text destination (default: pastebin)
    #[serde(default = "default_text_destination")]
    pub text: TextDestination,

    /// File destination used for text when `text` is `FileUploader`
    #[serde(default = "default_file_destination")]
    pub text_file: FileDestination,

    /// File destination for generic files (default: dropbox)
    #[serde(default = "default_file_destination")]
    pub file: FileDestination,

    /// URL shortener (default: bitly)
    #[serde(default = "default_url_shortener")]
    pub url_shortener: UrlShortenerDestination,

    /// URL sharing service (default: twitter)
    #[serde(default = "default_sharing_service")]
    pub url_sharing_service: SharingServiceDestination,

    /// Substitute secondary destinations on retry instead of waiting (default: false)
    #[serde(default)]
    pub use_secondary_uploaders: bool,

    /// Secondary image destinations, one per retry
    #[serde(default)]
    pub secondary_image_uploaders: Vec<ImageDestination>,

    /// Secondary text destinations, one per retry
    #[serde(default)]
    pub secondary_text_uploaders: Vec<TextDestination>,

    /// Secondary file destinations, one per retry (also used for image/text file targets)
    #[serde(default)]
    pub secondary_file_uploaders: Vec<FileDestination>,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            image: default_image_destination(),
            image_file: default_file_destination(),
            text: default_text_destination(),
            text_file: default_file_destination(),
            file: default_file_destination(),
            url_shortener: default_url_shortener(),
            url_sharing_service: default_sharing_service(),
            use_secondary_uploaders: false,
            secondary_image_uploaders: Vec::new(),
            secondary_text_uploaders: Vec::new(),
            secondary_file_uploaders: Vec::new(),
        }
    }
}

impl DestinationConfig {
    /// Destinations with the `index`-th secondary entry substituted for each
    /// image/text/file target.
    ///
    /// A kind whose secondary list has no entry at `index` keeps its current
    /// destination.
    pub fn with_secondary(&self, index: usize) -> DestinationConfig {
        let mut next = self.clone();
        if let Some(image) = self.secondary_image_uploaders.get(index) {
            next.image = image.clone();
        }
        if let Some(text) = self.secondary_text_uploaders.get(index) {
            next.text = text.clone();
        }
        if let Some(file) = self.secondary_file_uploaders.get(index) {
            next.image_file = file.clone();
            next.text_file = file.clone();
            next.file = file.clone();
        }
        next
    }

    /// Whether any secondary destination is configured
    pub fn has_secondaries(&self) -> bool {
        !self.secondary_image_uploaders.is_empty()
            || !self.secondary_text_uploaders.is_empty()
            || !self.secondary_file_uploaders.is_empty()
    }
}

/// Steps applied to captured content before upload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AfterCaptureTasks {
    /// Apply configured image effects
    pub add_image_effects: bool,
    /// Open the image in the annotation editor
    pub annotate_image: bool,
    /// Copy the image to the clipboard (default: true)
    pub copy_image_to_clipboard: bool,
    /// Send the image to the printer
    pub send_image_to_printer: bool,
    /// Save the image into the capture folder (default: true)
    pub save_image_to_file: bool,
    /// Ask for a save location
    pub save_image_to_file_with_dialog: bool,
    /// Save a thumbnail next to the image
    pub save_thumbnail_image_to_file: bool,
    /// Upload the image (default: true)
    pub upload_image_to_host: bool,
    /// Run active external programs against the file
    pub perform_actions: bool,
    /// Copy the file itself to the clipboard
    pub copy_file_to_clipboard: bool,
    /// Copy the file path to the clipboard
    pub copy_file_path_to_clipboard: bool,
    /// Reveal the file in the file manager
    pub show_in_explorer: bool,
    /// Ask for confirmation right before upload
    pub show_before_upload_window: bool,
    /// Delete the local file once the task finishes
    pub delete_file: bool,
}

impl Default for AfterCaptureTasks {
    fn default() -> Self {
        Self {
            add_image_effects: false,
            annotate_image: false,
            copy_image_to_clipboard: true,
            send_image_to_printer: false,
            save_image_to_file: true,
            save_image_to_file_with_dialog: false,
            save_thumbnail_image_to_file: false,
            upload_image_to_host: true,
            perform_actions: false,
            copy_file_to_clipboard: false,
            copy_file_path_to_clipboard: false,
            show_in_explorer: false,
            show_before_upload_window: false,
            delete_file: false,
        }
    }
}

impl AfterCaptureTasks {
    /// Whether the image has to be encoded into a payload at all
    pub fn needs_encoding(&self) -> bool {
        self.save_image_to_file || self.save_image_to_file_with_dialog || self.upload_image_to_host
    }
}

/// Steps applied after a successful upload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AfterUploadTasks {
    /// Shorten the resulting URL
    pub use_url_shortener: bool,
    /// Share the resulting URL
    pub share_url: bool,
    /// Copy the formatted result to the clipboard (default: true)
    pub copy_url_to_clipboard: bool,
    /// Open the result in the default handler
    pub open_url: bool,
    /// Show a QR code of the result
    pub show_qr_code: bool,
}

impl Default for AfterUploadTasks {
    fn default() -> Self {
        Self {
            use_url_shortener: false,
            share_url: false,
            copy_url_to_clipboard: true,
            open_url: false,
            show_qr_code: false,
        }
    }
}

/// Advanced task behaviour
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Clear the clipboard before an upload task starts
    #[serde(default)]
    pub auto_clear_clipboard: bool,

    /// Persist text uploads to the capture folder as well
    #[serde(default)]
    pub text_task_save_as_file: bool,

    /// Extension for text uploads (default: "txt")
    #[serde(default = "default_text_file_extension")]
    pub text_file_extension: String,

    /// Rewrite result URLs to https
    #[serde(default)]
    pub result_force_https: bool,

    /// Shorten URLs longer than this many characters (0 = off)
    #[serde(default)]
    pub auto_shorten_url_length: usize,

    /// Clipboard template (empty = plain result)
    #[serde(default)]
    pub clipboard_content_format: String,

    /// Open-URL template (empty = plain result)
    #[serde(default)]
    pub open_url_format: String,

    /// Copy the URL as soon as the uploader knows it, before the upload completes
    #[serde(default)]
    pub early_copy_url: bool,

    /// Route image files through the content transform during file upload
    #[serde(default)]
    pub process_images_during_file_upload: bool,

    /// Run file side effects for plain file uploads too
    #[serde(default)]
    pub use_after_capture_tasks_during_file_upload: bool,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            auto_clear_clipboard: false,
            text_task_save_as_file: false,
            text_file_extension: default_text_file_extension(),
            result_force_https: false,
            auto_shorten_url_length: 0,
            clipboard_content_format: String::new(),
            open_url_format: String::new(),
            early_copy_url: false,
            process_images_during_file_upload: false,
            use_after_capture_tasks_during_file_upload: false,
        }
    }
}

/// Upload behaviour (retries, buffers, warnings)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Retries after a failed upload attempt (default: 1, 0 disables retry)
    #[serde(default = "default_max_upload_fail_retry")]
    pub max_upload_fail_retry: u32,

    /// Wait before a retry against the same destination (default: 1 second)
    #[serde(default = "default_retry_delay", with = "duration_ms_serde")]
    pub retry_delay: Duration,

    /// Upload buffer size as a power of two in KiB (default: 5 = 32 KiB)
    #[serde(default = "default_buffer_size_power")]
    pub buffer_size_power: u32,

    /// Ask before uploading payloads larger than this many MB (0 = off)
    #[serde(default)]
    pub large_file_size_warning: u64,

    /// Interpret `large_file_size_warning` as MiB
    #[serde(default = "default_true")]
    pub binary_units: bool,

    /// Show the one-time upload warning before the first upload
    #[serde(default)]
    pub show_upload_warning: bool,

    /// Let uploaders accept invalid TLS certificates
    #[serde(default)]
    pub accept_invalid_ssl_certificates: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_fail_retry: default_max_upload_fail_retry(),
            retry_delay: default_retry_delay(),
            buffer_size_power: default_buffer_size_power(),
            large_file_size_warning: 0,
            binary_units: true,
            show_upload_warning: false,
            accept_invalid_ssl_certificates: false,
        }
    }
}

impl UploadConfig {
    /// Upload buffer size in bytes
    pub fn buffer_size(&self) -> usize {
        (1usize << self.buffer_size_power.min(MAX_BUFFER_SIZE_POWER)) * 1024
    }

    /// Payload size above which the large-file confirmation is asked, if enabled
    pub fn large_file_threshold(&self) -> Option<u64> {
        if self.large_file_size_warning == 0 {
            return None;
        }
        let unit: u64 = if self.binary_units {
            1024 * 1024
        } else {
            1000 * 1000
        };
        Some(self.large_file_size_warning.saturating_mul(unit))
    }
}

/// Image encoding and thumbnail settings handed to the image processor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Target format extension (default: "png")
    #[serde(default = "default_image_format")]
    pub format: String,

    /// Thumbnail width in pixels (default: 200)
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,

    /// Thumbnail height in pixels (0 keeps aspect ratio)
    #[serde(default)]
    pub thumbnail_height: u32,

    /// Suffix appended to thumbnail file names (default: "-thumbnail")
    #[serde(default = "default_thumbnail_suffix")]
    pub thumbnail_suffix: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            format: default_image_format(),
            thumbnail_width: default_thumbnail_width(),
            thumbnail_height: 0,
            thumbnail_suffix: default_thumbnail_suffix(),
        }
    }
}

/// External program run against the task's file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProgram {
    /// Display name
    pub name: String,

    /// Program path or name resolved through PATH
    pub path: PathBuf,

    /// Argument template; `%input` and `%output` are substituted (default: "%input")
    #[serde(default = "default_program_args")]
    pub args: String,

    /// Extension of the file the program produces (empty = edits in place)
    #[serde(default)]
    pub output_extension: String,

    /// Only active programs run
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Kill the program after this long (default: 300 seconds)
    #[serde(default = "default_program_timeout", with = "duration_ms_serde")]
    pub timeout: Duration,
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

/// Settings snapshot captured by a task at creation
///
/// Fields are organized into logical sub-configs:
/// - [`destinations`](DestinationConfig): where content goes, including failover lists
/// - [`after_capture`](AfterCaptureTasks): content transform and file side effects
/// - [`after_upload`](AfterUploadTasks): post-upload action chain
/// - [`advanced`](AdvancedConfig): templates, thresholds, file-upload behaviour
/// - [`upload`](UploadConfig): retry bound, buffer size, confirmations, TLS override
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSettings {
    /// Upload destinations
    #[serde(default)]
    pub destinations: DestinationConfig,

    /// After-capture tasks
    #[serde(default)]
    pub after_capture: AfterCaptureTasks,

    /// After-upload tasks
    #[serde(default)]
    pub after_upload: AfterUploadTasks,

    /// Advanced settings
    #[serde(default)]
    pub advanced: AdvancedConfig,

    /// Upload settings
    #[serde(default)]
    pub upload: UploadConfig,

    /// Image encoding settings
    #[serde(default)]
    pub image: ImageConfig,

    /// Folder captures and text files are saved to (default: "captures")
    #[serde(default = "default_capture_folder")]
    pub capture_folder: PathBuf,

    /// File name pattern for generated names
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,

    /// Use `name_pattern` for uploaded files instead of their own names
    #[serde(default)]
    pub file_upload_use_name_pattern: bool,

    /// What to do when a generated path already exists
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// File actions, applied in order when `perform_actions` is set
    #[serde(default)]
    pub external_programs: Vec<ExternalProgram>,

    /// Extensions treated as images when inferring a file's data type
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Extensions treated as text when inferring a file's data type
    #[serde(default = "default_text_extensions")]
    pub text_extensions: Vec<String>,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            destinations: DestinationConfig::default(),
            after_capture: AfterCaptureTasks::default(),
            after_upload: AfterUploadTasks::default(),
            advanced: AdvancedConfig::default(),
            upload: UploadConfig::default(),
            image: ImageConfig::default(),
            capture_folder: default_capture_folder(),
            name_pattern: default_name_pattern(),
            file_upload_use_name_pattern: false,
            file_collision: FileCollisionAction::default(),
            external_programs: Vec::new(),
            image_extensions: default_image_extensions(),
            text_extensions: default_text_extensions(),
        }
    }
}

impl TaskSettings {
    /// Parse settings from JSON, filling omitted fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: TaskSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject snapshots the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.advanced.text_file_extension.trim().is_empty() {
            return Err(Error::Config {
                message: "text file extension must not be empty".to_string(),
                key: Some("text_file_extension".to_string()),
            });
        }

        if self.upload.buffer_size_power > MAX_BUFFER_SIZE_POWER {
            return Err(Error::Config {
                message: format!(
                    "buffer size power {} exceeds maximum {}",
                    self.upload.buffer_size_power, MAX_BUFFER_SIZE_POWER
                ),
                key: Some("buffer_size_power".to_string()),
            });
        }

        if self.destinations.use_secondary_uploaders
            && self.upload.max_upload_fail_retry > 0
            && !self.destinations.has_secondaries()
        {
            return Err(Error::Config {
                message: "secondary uploaders enabled but none configured".to_string(),
                key: Some("use_secondary_uploaders".to_string()),
            });
        }

        for program in &self.external_programs {
            if program.path.as_os_str().is_empty() {
                return Err(Error::Config {
                    message: format!("external program '{}' has no path", program.name),
                    key: Some("external_programs".to_string()),
                });
            }
        }

        Ok(())
    }
}

/// Largest accepted `buffer_size_power` (2^14 KiB = 16 MiB)
const MAX_BUFFER_SIZE_POWER: u32 = 14;

// Default value functions
fn default_image_destination() -> ImageDestination {
    ImageDestination::Host("imgur".to_string())
}

fn default_text_destination() -> TextDestination {
    TextDestination::Host("pastebin".to_string())
}

fn default_file_destination() -> FileDestination {
    FileDestination("dropbox".to_string())
}

fn default_url_shortener() -> UrlShortenerDestination {
    UrlShortenerDestination("bitly".to_string())
}

fn default_sharing_service() -> SharingServiceDestination {
    SharingServiceDestination("twitter".to_string())
}

fn default_true() -> bool {
    true
}

fn default_text_file_extension() -> String {
    "txt".to_string()
}

fn default_max_upload_fail_retry() -> u32 {
    1
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_buffer_size_power() -> u32 {
    5
}

fn default_image_format() -> String {
    "png".to_string()
}

fn default_thumbnail_width() -> u32 {
    200
}

fn default_thumbnail_suffix() -> String {
    "-thumbnail".to_string()
}

fn default_program_args() -> String {
    "\"%input\"".to_string()
}

fn default_program_timeout() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_capture_folder() -> PathBuf {
    PathBuf::from("captures")
}

fn default_name_pattern() -> String {
    "%y-%mo-%d_%h-%mi-%s".to_string()
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "bmp", "ico", "tif", "tiff", "webp"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_text_extensions() -> Vec<String> {
    [
        "txt", "log", "nfo", "c", "cpp", "cc", "cxx", "h", "hpp", "hxx", "cs", "vb", "html",
        "htm", "xhtml", "xht", "xml", "css", "js", "php", "bat", "java", "lua", "py", "pl", "cfg",
        "ini", "rs", "md", "json", "toml", "yaml", "yml",
    ]
    .iter()
    .map(|e| e.to_string())
    .collect()
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
