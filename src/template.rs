//! Result templates for the clipboard and open-URL steps
//!
//! A template is free text with `$name` placeholders filled from a finished
//! task:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `$result` | shortened URL if any, else URL |
//! | `$url` | result URL |
//! | `$shorturl` | shortened URL |
//! | `$thumbnailurl` | thumbnail URL |
//! | `$deletionurl` | deletion URL |
//! | `$filepath` | local file path |
//! | `$filename` | file name |
//! | `$filenamenoext` | file name without extension |
//! | `$folderpath` | folder containing the local file |
//! | `$foldername` | name of that folder |
//! | `$thumbnailfilename` | thumbnail file name |
//!
//! Unknown placeholders are left as written.

use crate::types::TaskInfo;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static PLACEHOLDERS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\$(thumbnailfilename|thumbnailurl|deletionurl|shorturl|filenamenoext|filepath|filename|folderpath|foldername|result|url)",
    )
    .ok()
});

/// Fill `template` from the task record
pub fn render(template: &str, info: &TaskInfo) -> String {
    let Some(re) = PLACEHOLDERS.as_ref() else {
        return template.to_string();
    };

    re.replace_all(template, |caps: &regex::Captures<'_>| value(&caps[1], info))
        .into_owned()
}

fn value(name: &str, info: &TaskInfo) -> String {
    let result = &info.result;
    match name {
        "result" => result.to_string(),
        "url" => result.url.clone(),
        "shorturl" => result.shortened_url.clone(),
        "thumbnailurl" => result.thumbnail_url.clone(),
        "deletionurl" => result.deletion_url.clone(),
        "filepath" => path_string(info.file_path.as_deref()),
        "filename" => info.file_name.clone(),
        "filenamenoext" => Path::new(&info.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        "folderpath" => path_string(info.file_path.as_deref().and_then(Path::parent)),
        "foldername" => info
            .file_path
            .as_deref()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        "thumbnailfilename" => info
            .thumbnail_file_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        other => format!("${}", other),
    }
}

fn path_string(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}
