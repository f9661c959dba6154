//! Utility functions for paths, generated names and URLs

use crate::config::{FileCollisionAction, TaskSettings};
use crate::types::DataType;
use chrono::{DateTime, Datelike, Local, Timelike};
use rand::Rng;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Maximum rounds of percent-decoding applied to a source URL
const MAX_URL_DECODE_ROUNDS: usize = 10;

/// Get a unique path for a file, handling collisions according to the specified action
///
/// Returns `None` when the file exists and the action is `Skip`, or when no
/// free name could be found for `Rename`.
///
/// # Examples
///
/// ```
/// use upload_task::utils::get_unique_path;
/// use upload_task::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/capture.png");
/// let unique = get_unique_path(path, FileCollisionAction::Rename);
/// // If /tmp/capture.png exists, returns /tmp/capture (1).png
/// // If that exists too, returns /tmp/capture (2).png, etc.
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Option<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Some(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                tracing::debug!(path = %path.display(), "file exists, skipping");
                return None;
            }
            Some(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Some(path.to_path_buf());
            }

            let stem = path.file_stem().and_then(|s| s.to_str())?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent()?;

            // Try adding (1), (2), (3), ... until we find a unique name
            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Some(new_path);
                }
            }

            tracing::warn!(
                path = %path.display(),
                attempts = MAX_RENAME_ATTEMPTS,
                "could not find a unique file name"
            );
            None
        }
    }
}

/// Resolve where `file_name` should be written inside `folder`
///
/// Empty names resolve to nothing.
pub fn check_file_path(
    folder: &Path,
    file_name: &str,
    action: FileCollisionAction,
) -> Option<PathBuf> {
    if file_name.trim().is_empty() {
        return None;
    }
    get_unique_path(&folder.join(file_name), action)
}

/// Create the parent directory of `path` if it is missing
pub fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Extension of a path or URL, lowercased, without the dot
///
/// Query strings and fragments are ignored.
pub fn extension_of(path_or_url: &str) -> Option<String> {
    let trimmed = path_or_url
        .split(['?', '#'])
        .next()
        .unwrap_or(path_or_url);
    Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_lowercase)
}

/// Infer the data type of a file or URL from its extension
pub fn find_data_type(path_or_url: &str, settings: &TaskSettings) -> DataType {
    let Some(ext) = extension_of(path_or_url) else {
        return DataType::File;
    };

    if settings
        .image_extensions
        .iter()
        .any(|e| e.eq_ignore_ascii_case(&ext))
    {
        DataType::Image
    } else if settings
        .text_extensions
        .iter()
        .any(|e| e.eq_ignore_ascii_case(&ext))
    {
        DataType::Text
    } else {
        DataType::File
    }
}

/// Rewrite an `http://` URL to `https://`; other URLs are returned unchanged
pub fn force_https(url: &str) -> String {
    const PLAIN: &str = "http://";
    match url.get(..PLAIN.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(PLAIN) => {
            format!("https://{}", &url[PLAIN.len()..])
        }
        _ => url.to_string(),
    }
}

/// Percent-decode repeatedly until the value stops changing
pub fn url_decode(url: &str) -> String {
    let mut current = url.to_string();
    for _ in 0..MAX_URL_DECODE_ROUNDS {
        let decoded = match urlencoding::decode(&current) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => break,
        };
        if decoded == current {
            break;
        }
        current = decoded;
    }
    current
}

/// Last path segment of a URL, without query or fragment
pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(idx) => path[idx + 1..].to_string(),
        None => path.to_string(),
    }
}

static INVALID_FILE_NAME_CHARS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).ok());

/// Strip characters that cannot appear in a file name
pub fn valid_file_name(name: &str) -> String {
    let cleaned = match INVALID_FILE_NAME_CHARS.as_ref() {
        Some(re) => re.replace_all(name, "").into_owned(),
        None => name
            .chars()
            .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
            .filter(|c| !c.is_control())
            .collect(),
    };
    cleaned.trim().trim_end_matches('.').to_string()
}

/// Append `.ext` to `name`; an empty extension leaves the name unchanged
pub fn append_extension(name: &str, ext: &str) -> String {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", name, ext)
    }
}

/// Replace the extension of a file name
pub fn change_extension(name: &str, ext: &str) -> String {
    Path::new(name)
        .with_extension(ext.trim_start_matches('.'))
        .to_string_lossy()
        .into_owned()
}

static NAME_PATTERN_TOKENS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // Longer tokens first so %height wins over %h and %mo over %m*
    Regex::new(r"%(unix|width|height|ms|mo|mi|rn|y|d|h|s)").ok()
});

/// Expand a name pattern
///
/// Tokens: `%y` year, `%mo` month, `%d` day, `%h` hour, `%mi` minute, `%s`
/// second, `%ms` millisecond, `%unix` epoch seconds, `%width`/`%height` image
/// size (empty without an image), `%rn` random digit.
pub fn expand_name_pattern(
    pattern: &str,
    now: DateTime<Local>,
    image_size: Option<(u32, u32)>,
) -> String {
    let Some(re) = NAME_PATTERN_TOKENS.as_ref() else {
        return pattern.to_string();
    };

    let mut rng = rand::thread_rng();
    re.replace_all(pattern, |caps: &regex::Captures<'_>| match &caps[1] {
        "y" => format!("{:04}", now.year()),
        "mo" => format!("{:02}", now.month()),
        "d" => format!("{:02}", now.day()),
        "h" => format!("{:02}", now.hour()),
        "mi" => format!("{:02}", now.minute()),
        "s" => format!("{:02}", now.second()),
        "ms" => format!("{:03}", now.timestamp_subsec_millis()),
        "unix" => now.timestamp().to_string(),
        "width" => image_size.map(|(w, _)| w.to_string()).unwrap_or_default(),
        "height" => image_size.map(|(_, h)| h.to_string()).unwrap_or_default(),
        "rn" => rng.gen_range(0..10).to_string(),
        other => format!("%{}", other),
    })
    .into_owned()
}

/// Generate a file name from the settings' name pattern
pub fn generate_file_name(
    settings: &TaskSettings,
    ext: &str,
    image_size: Option<(u32, u32)>,
) -> String {
    let name = valid_file_name(&expand_name_pattern(
        &settings.name_pattern,
        Local::now(),
        image_size,
    ));
    append_extension(&name, ext)
}
