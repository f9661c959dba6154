//! Upload outcome accumulated across every attempt of a task

use serde::{Deserialize, Serialize};

/// Outcome of a task's upload stage
///
/// One value lives for the whole task. Attempts merge into it; errors are
/// append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Result URL
    #[serde(default)]
    pub url: String,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: String,
    /// Deletion URL
    #[serde(default)]
    pub deletion_url: String,
    /// Shortened URL
    #[serde(default)]
    pub shortened_url: String,
    /// Error messages in the order they occurred
    #[serde(default)]
    pub errors: Vec<String>,
    /// Whether this task is expected to produce a URL
    #[serde(default = "default_true")]
    pub is_url_expected: bool,
}

impl Default for UploadResult {
    fn default() -> Self {
        Self {
            url: String::new(),
            thumbnail_url: String::new(),
            deletion_url: String::new(),
            shortened_url: String::new(),
            errors: Vec::new(),
            is_url_expected: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl UploadResult {
    /// Result carrying only a URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Whether any error has been recorded
    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Append an error message
    pub fn add_error(&mut self, error: impl std::fmt::Display) {
        self.errors.push(error.to_string());
    }

    /// Merge one attempt's outcome into the aggregate
    ///
    /// Non-empty URLs from the attempt replace the current ones; its errors are
    /// appended. `is_url_expected` is owned by the aggregate and is not touched.
    pub fn absorb(&mut self, attempt: UploadResult) {
        let UploadResult {
            url,
            thumbnail_url,
            deletion_url,
            shortened_url,
            errors,
            is_url_expected: _,
        } = attempt;

        if !url.is_empty() {
            self.url = url;
        }
        if !thumbnail_url.is_empty() {
            self.thumbnail_url = thumbnail_url;
        }
        if !deletion_url.is_empty() {
            self.deletion_url = deletion_url;
        }
        if !shortened_url.is_empty() {
            self.shortened_url = shortened_url;
        }
        self.errors.extend(errors);
    }

    /// Rewrite the result, thumbnail and deletion URLs to https
    pub fn force_https(&mut self) {
        self.url = crate::utils::force_https(&self.url);
        self.thumbnail_url = crate::utils::force_https(&self.thumbnail_url);
        self.deletion_url = crate::utils::force_https(&self.deletion_url);
    }
}

impl std::fmt::Display for UploadResult {
    /// The shortened URL if there is one, else the URL
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.shortened_url.is_empty() {
            write!(f, "{}", self.shortened_url)
        } else {
            write!(f, "{}", self.url)
        }
    }
}
