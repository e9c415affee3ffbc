//! GitHub repository installer fetcher
//!
//! Downloads a repository's default branch, finds its installer, and falls
//! back to a helper release when the repository ships none.

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod fetch;
pub mod runners;
pub mod wizard;

pub use config::FetchConfig;
pub use error::{FetchError, StepResult};
pub use fetch::{FetchOrchestrator, FetchOutcome, FetchRequest, FetchResult, FetchState};
