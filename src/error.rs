//! Error taxonomy for the fetch pipeline
//!
//! Every variant owns its data so errors can be cloned into a `FetchResult`
//! and compared in tests.

use std::path::PathBuf;

/// Failure of a single pipeline step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid GitHub repository URL '{url}': {reason}. Example: https://github.com/username/repo")]
    InvalidUrl { url: String, reason: String },

    #[error("GitHub API unavailable for {repo}: {message}")]
    ApiUnavailable { repo: String, message: String },

    #[error("No published release found for {repo} (HTTP {status})")]
    NoRelease { repo: String, status: u16 },

    #[error("Latest release of {repo} has neither a .zip asset nor a source archive")]
    NoReleaseArchive { repo: String },

    #[error("Failed to download ZIP from {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Network error while downloading {url}: {message}")]
    Network { url: String, message: String },

    #[error("Downloaded data is not a valid ZIP archive: {0}")]
    CorruptArchive(String),

    #[error("Extraction into {} failed: {message}", path.display())]
    ExtractionFailed { path: PathBuf, message: String },

    #[error("Failed to launch {}: {message}", path.display())]
    LaunchFailed { path: PathBuf, message: String },
}

/// Result of one pipeline step
pub type StepResult<T> = std::result::Result<T, FetchError>;
