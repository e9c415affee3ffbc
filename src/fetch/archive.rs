//! Archive download and extraction
//!
//! Downloads are streamed into memory with progress reporting; the buffer is
//! then opened as a ZIP archive (no temp file) and unpacked entry by entry.
//! A failed extraction is not rolled back: entries written before the
//! failure stay on disk.

use std::fs;
use std::io::{self, Cursor};
use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info};
use reqwest::Client;
use tokio::time::timeout;
use zip::ZipArchive;

use super::progress::{ProgressRange, ProgressReporter};
use crate::error::{FetchError, StepResult};

/// Streams archives over HTTP
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    http: Client,
    inactivity_timeout: Duration,
}

impl ArchiveFetcher {
    pub fn new(http: Client, inactivity_timeout: Duration) -> Self {
        Self {
            http,
            inactivity_timeout,
        }
    }

    /// Download `url` into memory.
    ///
    /// Reports `range.start` first and `range.end` last. In between, one update
    /// per received chunk when the response carries a content length; none
    /// otherwise.
    pub async fn stream_download(
        &self,
        url: &str,
        range: ProgressRange,
        progress: &mut ProgressReporter,
    ) -> StepResult<Vec<u8>> {
        let network = |message: String| FetchError::Network {
            url: url.to_string(),
            message,
        };

        progress.report(range.start, format!("Downloading {url}"));

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length().filter(|&n| n > 0);
        let mut buffer = Vec::with_capacity(total_bytes.unwrap_or(0).min(64 * 1_048_576) as usize);
        let mut stream = response.bytes_stream();

        loop {
            let chunk = match timeout(self.inactivity_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => return Err(network(e.to_string())),
                Ok(None) => break,
                Err(_) => {
                    return Err(network(format!(
                        "no data received for {} seconds ({} bytes downloaded)",
                        self.inactivity_timeout.as_secs(),
                        buffer.len()
                    )));
                }
            };

            buffer.extend_from_slice(&chunk);

            if let Some(total) = total_bytes {
                let ratio = (buffer.len() as f64 / total as f64) as f32;
                progress.report(
                    range.at(ratio),
                    format!(
                        "Downloading ({:.1} MB / {:.1} MB) - {}%",
                        buffer.len() as f64 / 1_048_576.0,
                        total as f64 / 1_048_576.0,
                        (ratio.min(1.0) * 100.0) as u8
                    ),
                );
            }
        }

        progress.report(
            range.end,
            format!("Downloaded {:.1} MB", buffer.len() as f64 / 1_048_576.0),
        );
        debug!("Downloaded {} bytes from {}", buffer.len(), url);
        Ok(buffer)
    }
}

/// Unpack a ZIP held in memory into `dest_dir`, creating it (and parents) if needed.
///
/// Existing files that are not part of the archive are left untouched;
/// files the archive contains are overwritten.
pub fn extract_archive(
    bytes: &[u8],
    dest_dir: &Path,
    range: ProgressRange,
    progress: &mut ProgressReporter,
) -> StepResult<usize> {
    let failed = |e: io::Error| FetchError::ExtractionFailed {
        path: dest_dir.to_path_buf(),
        message: e.to_string(),
    };

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| FetchError::CorruptArchive(e.to_string()))?;

    fs::create_dir_all(dest_dir).map_err(failed)?;
    progress.report(range.start, format!("Extracting to {}", dest_dir.display()));

    let total = archive.len();
    let mut written = 0;

    for i in 0..total {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| FetchError::CorruptArchive(format!("entry {i}: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            log::warn!("Skipping ZIP entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(failed)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(failed)?;
            }
            let mut out_file = fs::File::create(&out_path).map_err(failed)?;
            io::copy(&mut entry, &mut out_file).map_err(|e| FetchError::ExtractionFailed {
                path: out_path.clone(),
                message: e.to_string(),
            })?;
            written += 1;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                        .map_err(failed)?;
                }
            }
        }

        progress.report(
            range.at((i + 1) as f32 / total as f32),
            format!("Extracting ({}/{})", i + 1, total),
        );
    }

    progress.report(range.end, format!("Extracted {written} files"));
    info!("Extracted {} files into {}", written, dest_dir.display());
    Ok(written)
}
