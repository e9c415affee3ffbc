//! Repository fetch pipeline
//!
//! Resolves a GitHub repository URL, downloads its default-branch archive,
//! extracts it, and looks for a known installer. On a miss the latest
//! release of a fixed helper repository is fetched and its installer run.

pub mod archive;
pub mod github;
pub mod launcher;
pub mod locator;
pub mod orchestrator;
pub mod progress;
pub mod scanner;

pub use archive::{ArchiveFetcher, extract_archive};
pub use github::{GitHubClient, ReleaseInfo};
pub use launcher::{Launcher, ProcessLauncher};
pub use locator::{BranchInfo, RepositoryRef, parse_repository_ref};
pub use orchestrator::{
    FetchOrchestrator, FetchOutcome, FetchRequest, FetchResult, FetchState,
};
pub use progress::{FetchProgress, ProgressRange, ProgressReporter};
pub use scanner::find_installer;
