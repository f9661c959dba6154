//! HTTP downloader for download-then-upload jobs

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::traits::Downloader;
use crate::error::{DownloadError, Error};

/// Default timeout for fetching remote content
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Downloads over HTTP(S) with reqwest
#[derive(Clone, Debug)]
pub struct HttpDownloader {
    timeout: Duration,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self {
            timeout: DOWNLOAD_TIMEOUT,
        }
    }
}

impl HttpDownloader {
    /// Downloader with the default timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Downloader with a custom overall request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn client(&self, accept_invalid_certs: bool) -> crate::Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        destination: &Path,
        accept_invalid_certs: bool,
    ) -> crate::Result<()> {
        let parsed = url::Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            }
            .into());
        }

        let client = self.client(accept_invalid_certs)?;
        let mut response = client.get(parsed).send().await?;

        if !response.status().is_success() {
            return Err(Error::Download(DownloadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            }));
        }

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(
            url = %url,
            path = %destination.display(),
            bytes = written,
            "download finished"
        );
        Ok(())
    }
}
