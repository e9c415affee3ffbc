//! Fetch orchestration
//!
//! Drives one fetch through
//! `Idle → Resolving → Downloading → Extracting → Scanning →
//! {AwaitingRunDecision | FallbackResolving} → {Ran | Done | Failed}`.
//!
//! An installer found in the user's repository is only surfaced
//! (`Ready`); the caller decides whether to run it. An installer found in
//! the helper repository's release is launched here without asking.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::archive::{ArchiveFetcher, extract_archive};
use super::github::GitHubClient;
use super::launcher::Launcher;
use super::locator::{RepositoryRef, parse_repository_ref};
use super::progress::{FetchProgress, ProgressRange, ProgressReporter};
use super::scanner::find_installer;
use crate::config::FetchConfig;
use crate::error::{FetchError, StepResult};

/// Progress span of the user repository fetch
const PRIMARY_RANGE: ProgressRange = ProgressRange {
    start: 0.0,
    end: 0.5,
};

/// Progress span of the helper repository fetch
const FALLBACK_RANGE: ProgressRange = ProgressRange {
    start: 0.5,
    end: 0.95,
};

/// What the caller asked for
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Parent directory; the repository lands in `<dest_dir>/<repo name>`
    pub dest_dir: PathBuf,
}

/// Position in the fetch state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Resolving,
    Downloading,
    Extracting,
    Scanning,
    AwaitingRunDecision,
    FallbackResolving,
    Ran,
    Done,
    Failed,
}

/// Terminal outcome of one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Installer found in the user's repository; caller decides whether to run it
    Ready {
        extracted_path: PathBuf,
        installer_path: PathBuf,
    },
    /// No installer and the helper fallback is disabled
    NoInstaller { extracted_path: PathBuf },
    /// Helper installer found and launched
    Ran { installer_path: PathBuf },
    /// Helper release extracted but holds no installer either
    NoExecutableFound { extracted_path: PathBuf },
    Error(FetchError),
}

impl FetchResult {
    pub fn is_error(&self) -> bool {
        matches!(self, FetchResult::Error(_))
    }
}

impl fmt::Display for FetchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchResult::Ready { installer_path, .. } => {
                write!(f, "Installer found: {}", installer_path.display())
            }
            FetchResult::NoInstaller { extracted_path } => write!(
                f,
                "No installer found. Repository downloaded to {}",
                extracted_path.display()
            ),
            FetchResult::Ran { installer_path } => {
                write!(f, "Launched helper installer {}", installer_path.display())
            }
            FetchResult::NoExecutableFound { extracted_path } => write!(
                f,
                "No executable found in helper release ({})",
                extracted_path.display()
            ),
            FetchResult::Error(e) => write!(f, "Installation failed: {e}"),
        }
    }
}

/// Result plus the states the fetch passed through
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub result: FetchResult,
    pub trail: Vec<FetchState>,
}

/// All state scoped to a single fetch
#[derive(Debug)]
struct FetchSession {
    request: FetchRequest,
    state: FetchState,
    trail: Vec<FetchState>,
}

impl FetchSession {
    fn new(request: FetchRequest) -> Self {
        Self {
            request,
            state: FetchState::Idle,
            trail: vec![FetchState::Idle],
        }
    }

    fn enter(&mut self, next: FetchState) {
        debug!("fetch state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.trail.push(next);
    }
}

/// Composes locator, release resolver, fetcher and scanner into one fetch.
///
/// One fetch at a time per instance; callers serialize.
pub struct FetchOrchestrator {
    config: FetchConfig,
    github: GitHubClient,
    fetcher: ArchiveFetcher,
    launcher: Arc<dyn Launcher>,
}

impl FetchOrchestrator {
    pub fn new(config: FetchConfig, launcher: Arc<dyn Launcher>) -> StepResult<Self> {
        let github = GitHubClient::new(&config.github)?;
        let fetcher = ArchiveFetcher::new(
            github.http().clone(),
            config.download.inactivity_timeout(),
        );
        Ok(Self {
            config,
            github,
            fetcher,
            launcher,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Run a fetch on a tokio worker task.
    ///
    /// Progress arrives on the returned receiver; the last update is always at 1.0.
    pub fn spawn(
        self: Arc<Self>,
        request: FetchRequest,
    ) -> (mpsc::Receiver<FetchProgress>, JoinHandle<FetchOutcome>) {
        let (reporter, rx) = ProgressReporter::channel();
        let handle = tokio::spawn(async move { self.run(request, reporter).await });
        (rx, handle)
    }

    /// Run a fetch to completion on the current task
    pub async fn run(&self, request: FetchRequest, mut progress: ProgressReporter) -> FetchOutcome {
        let mut session = FetchSession::new(request);

        let result = match self.drive(&mut session, &mut progress).await {
            Ok(result) => result,
            Err(e) => {
                error!("Fetch of {} failed: {}", session.request.url, e);
                session.enter(FetchState::Failed);
                FetchResult::Error(e)
            }
        };

        info!("{}", result);
        progress.finish(result.to_string(), result.is_error()).await;

        FetchOutcome {
            result,
            trail: session.trail,
        }
    }

    async fn drive(
        &self,
        session: &mut FetchSession,
        progress: &mut ProgressReporter,
    ) -> StepResult<FetchResult> {
        // Idle → Resolving
        session.enter(FetchState::Resolving);
        let repo = parse_repository_ref(&session.request.url, &self.config.github.host)?;
        progress.report(PRIMARY_RANGE.start, format!("Resolving {repo}..."));
        let branch = self.github.resolve_default_branch(&repo).await;

        // Resolving → Downloading → Extracting
        let archive_url = self.github.branch_archive_url(&repo, &branch);
        let extracted_path = session.request.dest_dir.join(&repo.name);
        self.fetch_into(session, &archive_url, &extracted_path, PRIMARY_RANGE, progress)
            .await?;

        // Extracting → Scanning
        session.enter(FetchState::Scanning);
        progress.report(
            PRIMARY_RANGE.end,
            format!("Checking {} for an installer...", repo.name),
        );
        if let Some(installer_path) = self.scan(&extracted_path).await? {
            info!("Installer file found in {} - ready to install", repo.name);
            session.enter(FetchState::AwaitingRunDecision);
            return Ok(FetchResult::Ready {
                extracted_path,
                installer_path,
            });
        }

        if !self.config.helper.enabled {
            info!("No installer found in {}. Repo downloaded only.", repo.name);
            session.enter(FetchState::Done);
            return Ok(FetchResult::NoInstaller { extracted_path });
        }

        // Scanning → FallbackResolving
        session.enter(FetchState::FallbackResolving);
        let helper =
            RepositoryRef::from_parts(&self.config.helper.owner, &self.config.helper.name)?;
        info!(
            "No installer found in {}, falling back to the latest release of {}",
            repo.name, helper
        );
        progress.report(
            FALLBACK_RANGE.start,
            format!("Resolving latest release of {helper}..."),
        );
        let release = self.github.resolve_latest_release(&helper).await?;
        let release_url = release
            .archive_url()
            .ok_or_else(|| FetchError::NoReleaseArchive {
                repo: helper.to_string(),
            })?
            .to_string();

        let helper_path = session.request.dest_dir.join(&helper.name);
        self.fetch_into(session, &release_url, &helper_path, FALLBACK_RANGE, progress)
            .await?;

        // Only the helper's own extraction is scanned here
        session.enter(FetchState::Scanning);
        match self.scan(&helper_path).await? {
            Some(installer_path) => {
                progress.report(
                    FALLBACK_RANGE.end,
                    format!("Launching {}...", installer_path.display()),
                );
                self.launcher.launch(&installer_path)?;
                session.enter(FetchState::Ran);
                Ok(FetchResult::Ran { installer_path })
            }
            None => {
                session.enter(FetchState::Done);
                Ok(FetchResult::NoExecutableFound {
                    extracted_path: helper_path,
                })
            }
        }
    }

    /// Download `url` and unpack it into `dest`, splitting `range` between the two
    async fn fetch_into(
        &self,
        session: &mut FetchSession,
        url: &str,
        dest: &Path,
        range: ProgressRange,
        progress: &mut ProgressReporter,
    ) -> StepResult<()> {
        let (download_range, extract_range) = range.split(self.config.download.share());

        session.enter(FetchState::Downloading);
        let bytes = self
            .fetcher
            .stream_download(url, download_range, progress)
            .await?;

        session.enter(FetchState::Extracting);
        let dest_dir = dest.to_path_buf();
        let mut reporter = std::mem::replace(progress, ProgressReporter::silent());
        let (reporter, extracted) = tokio::task::spawn_blocking(move || {
            let extracted = extract_archive(&bytes, &dest_dir, extract_range, &mut reporter);
            (reporter, extracted)
        })
        .await
        .map_err(|e| FetchError::ExtractionFailed {
            path: dest.to_path_buf(),
            message: format!("extraction task failed: {e}"),
        })?;
        *progress = reporter;
        extracted?;
        Ok(())
    }

    async fn scan(&self, root: &Path) -> StepResult<Option<PathBuf>> {
        scan_blocking(
            root,
            self.config.scan.installer_names.clone(),
            self.config.scan.max_depth,
        )
        .await
    }
}

/// Walk `root` for an installer on the blocking pool
async fn scan_blocking(
    root: &Path,
    names: Vec<String>,
    max_depth: usize,
) -> StepResult<Option<PathBuf>> {
    let dir = root.to_path_buf();
    tokio::task::spawn_blocking(move || find_installer(&dir, &names, max_depth))
        .await
        .map_err(|e| FetchError::ExtractionFailed {
            path: root.to_path_buf(),
            message: format!("installer scan task failed: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ranges_leave_room_for_finish() {
        assert_eq!(PRIMARY_RANGE.end, FALLBACK_RANGE.start);
        assert!(FALLBACK_RANGE.end < 1.0);

        let (download, extract) = PRIMARY_RANGE.split(0.8);
        assert_eq!(download.start, 0.0);
        assert!((download.end - 0.4).abs() < 1e-6);
        assert_eq!(extract.end, 0.5);
    }

    #[test]
    fn test_session_records_every_transition() {
        let mut session = FetchSession::new(FetchRequest {
            url: "https://github.com/octo/widget".into(),
            dest_dir: PathBuf::from("/tmp"),
        });
        session.enter(FetchState::Resolving);
        session.enter(FetchState::Failed);

        assert_eq!(session.state, FetchState::Failed);
        assert_eq!(
            session.trail,
            vec![FetchState::Idle, FetchState::Resolving, FetchState::Failed]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_scan_runs_on_blocking_pool() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("widget-main").join("bin");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("InstallerReady.bat"), "@echo off").unwrap();
        let names = vec!["installerready.exe".to_string(), "installerready.bat".to_string()];

        let found = scan_blocking(temp.path(), names.clone(), 64).await.unwrap();
        assert_eq!(found, Some(nested.join("InstallerReady.bat")));

        let missing = scan_blocking(&temp.path().join("missing"), names, 64)
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn test_error_result_message() {
        let result = FetchResult::Error(FetchError::NoReleaseArchive {
            repo: "acme/helper".into(),
        });
        assert!(result.is_error());
        assert!(result.to_string().starts_with("Installation failed: "));
        assert!(result.to_string().contains("acme/helper"));

        let ran = FetchResult::Ran {
            installer_path: PathBuf::from("/tmp/installerready.exe"),
        };
        assert!(!ran.is_error());
    }
}
