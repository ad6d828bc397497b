// ABOUTME: Error types for the preview pipeline
// ABOUTME: Every variant degrades to "no marker" or "no dimension"; none is user-facing

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request failed with status {status}: {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: String,
        #[source]
        source: notify::Error,
    },

    #[error("Fetch aborted before completion: {0}")]
    Aborted(String),

    #[error("Could not read image dimensions: {0}")]
    Probe(String),
}

impl PreviewError {
    /// Whether a later scan pass could plausibly succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PreviewError::Network(_)
                | PreviewError::Http { .. }
                | PreviewError::Io(_)
                | PreviewError::Aborted(_)
        )
    }
}

impl From<reqwest::Error> for PreviewError {
    fn from(err: reqwest::Error) -> Self {
        match (err.status(), err.url()) {
            (Some(status), Some(url)) => PreviewError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            },
            _ => PreviewError::Network(err.to_string()),
        }
    }
}

impl From<image::ImageError> for PreviewError {
    fn from(err: image::ImageError) -> Self {
        PreviewError::Probe(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;
