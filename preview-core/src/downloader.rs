// ABOUTME: Moves image bytes from their source into a local temporary file
// ABOUTME: Streams HTTP(S) bodies chunk by chunk and copies local files

use crate::error::{PreviewError, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

pub struct ImageDownloader {
    client: Client,
}

impl ImageDownloader {
    /// Plain transport defaults: no extra headers, retries or timeouts
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Parses the URL up front so malformed input fails before any work is queued.
    pub fn validate_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url).map_err(|e| PreviewError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(PreviewError::InvalidUrl {
                    url: url.to_string(),
                    reason: format!("unsupported scheme '{}'", scheme),
                });
            }
        }

        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(PreviewError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(parsed)
    }

    /// GET `url` and stream the body into `destination`. Returns bytes written.
    pub async fn download_to(&self, url: Url, destination: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                PreviewError::Network(format!("Failed to read response body from {}: {}", url, e))
            })?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        log::debug!("Downloaded {} ({})", url, format_bytes(written));
        Ok(written)
    }
}

impl Default for ImageDownloader {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy a local image into `destination`. Returns bytes copied.
pub async fn copy_local(source: &Path, destination: &Path) -> Result<u64> {
    let copied = tokio::fs::copy(source, destination).await?;
    log::debug!(
        "Copied {} -> {} ({})",
        source.display(),
        destination.display(),
        format_bytes(copied)
    );
    Ok(copied)
}

/// Format bytes in a human-readable way
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
