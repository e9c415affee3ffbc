use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ghinstaller::config::FetchConfig;
use ghinstaller::error::{FetchError, StepResult};
use ghinstaller::fetch::{
    FetchOrchestrator, FetchOutcome, FetchProgress, FetchRequest, FetchResult, FetchState,
    Launcher,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

#[derive(Default)]
struct RecordingLauncher {
    launched: Mutex<Vec<PathBuf>>,
}

impl RecordingLauncher {
    fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().unwrap().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, installer: &Path) -> StepResult<()> {
        self.launched.lock().unwrap().push(installer.to_path_buf());
        Ok(())
    }
}

fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn config_for(server: &MockServer) -> FetchConfig {
    let mut config = FetchConfig::default();
    config.github.api_url = server.uri();
    config.github.web_url = server.uri();
    config
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_zip(server: &MockServer, route: &str, bytes: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .mount(server)
        .await;
}

/// Repository `octo/widget` on branch `main` whose archive holds `files`
async fn mount_widget(server: &MockServer, files: &[(&str, &[u8])]) {
    mount_json(server, "/repos/octo/widget", json!({ "default_branch": "main" })).await;
    mount_zip(server, "/octo/widget/archive/refs/heads/main.zip", build_zip(files)).await;
}

async fn mount_helper_release(server: &MockServer, files: &[(&str, &[u8])]) {
    mount_json(
        server,
        "/repos/coltonsr77/InstallerReady/releases/latest",
        json!({
            "tag_name": "v1.2.0",
            "assets": [
                { "name": "notes.txt", "browser_download_url": format!("{}/downloads/notes.txt", server.uri()) },
                { "name": "InstallerReady.zip", "browser_download_url": format!("{}/downloads/InstallerReady.zip", server.uri()) }
            ],
            "zipball_url": format!("{}/zipball/v1.2.0", server.uri())
        }),
    )
    .await;
    mount_zip(server, "/downloads/InstallerReady.zip", build_zip(files)).await;
}

async fn run(
    config: FetchConfig,
    launcher: Arc<RecordingLauncher>,
    url: &str,
    dest: &Path,
) -> (FetchOutcome, Vec<FetchProgress>) {
    let orchestrator = Arc::new(FetchOrchestrator::new(config, launcher).unwrap());
    let (mut rx, handle) = orchestrator.spawn(FetchRequest {
        url: url.to_string(),
        dest_dir: dest.to_path_buf(),
    });

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }
    (handle.await.unwrap(), updates)
}

fn assert_progress_well_formed(updates: &[FetchProgress]) {
    assert!(!updates.is_empty());
    assert!(
        updates.windows(2).all(|w| w[0].fraction <= w[1].fraction),
        "progress went backwards: {:?}",
        updates.iter().map(|u| u.fraction).collect::<Vec<_>>()
    );
    let finals = updates.iter().filter(|u| u.fraction >= 1.0).count();
    assert_eq!(finals, 1);
    assert_eq!(updates.last().map(|u| u.fraction), Some(1.0));
    assert!(updates[..updates.len() - 1].iter().all(|u| u.fraction <= 0.99));
}

#[tokio::test]
async fn test_missing_installer_runs_helper_release() {
    let server = MockServer::start().await;
    mount_widget(&server, &[("widget-main/README.md", b"# widget")]).await;
    mount_helper_release(&server, &[("InstallerReady/installerready.exe", b"MZ")]).await;

    let temp = TempDir::new().unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let (outcome, updates) = run(
        config_for(&server),
        launcher.clone(),
        "https://github.com/octo/widget",
        temp.path(),
    )
    .await;

    let expected = temp
        .path()
        .join("InstallerReady")
        .join("InstallerReady")
        .join("installerready.exe");
    assert_eq!(
        outcome.result,
        FetchResult::Ran {
            installer_path: expected.clone()
        }
    );
    assert_eq!(launcher.launched(), vec![expected]);
    assert!(temp.path().join("widget").join("widget-main").join("README.md").exists());
    assert_eq!(
        outcome.trail,
        vec![
            FetchState::Idle,
            FetchState::Resolving,
            FetchState::Downloading,
            FetchState::Extracting,
            FetchState::Scanning,
            FetchState::FallbackResolving,
            FetchState::Downloading,
            FetchState::Extracting,
            FetchState::Scanning,
            FetchState::Ran,
        ]
    );
    assert_progress_well_formed(&updates);
    assert!(!updates.last().unwrap().is_error);
}

#[tokio::test]
async fn test_invalid_url_fails_without_requests() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let launcher = Arc::new(RecordingLauncher::default());

    let (outcome, updates) = run(
        config_for(&server),
        launcher.clone(),
        "https://gitlab.com/octo/widget",
        temp.path(),
    )
    .await;

    assert!(matches!(
        outcome.result,
        FetchResult::Error(FetchError::InvalidUrl { .. })
    ));
    assert_eq!(outcome.trail.last(), Some(&FetchState::Failed));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(launcher.launched().is_empty());

    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].fraction, 1.0);
    assert!(updates[0].is_error);
}

#[tokio::test]
async fn test_helper_release_without_archive() {
    let server = MockServer::start().await;
    mount_widget(&server, &[("widget-main/README.md", b"# widget")]).await;
    mount_json(
        &server,
        "/repos/coltonsr77/InstallerReady/releases/latest",
        json!({ "tag_name": "v0.1.0", "assets": [], "zipball_url": null }),
    )
    .await;

    let temp = TempDir::new().unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let (outcome, updates) = run(
        config_for(&server),
        launcher.clone(),
        "https://github.com/octo/widget",
        temp.path(),
    )
    .await;

    assert!(matches!(
        outcome.result,
        FetchResult::Error(FetchError::NoReleaseArchive { .. })
    ));
    assert!(launcher.launched().is_empty());
    assert_progress_well_formed(&updates);
    assert!(updates.last().unwrap().is_error);
}

#[tokio::test]
async fn test_repository_installer_is_not_launched() {
    let server = MockServer::start().await;
    mount_widget(
        &server,
        &[
            ("widget-main/README.md", b"# widget"),
            ("widget-main/dist/InstallerReady.EXE", b"MZ"),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/repos/coltonsr77/InstallerReady/releases/latest"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let (outcome, updates) = run(
        config_for(&server),
        launcher.clone(),
        "github.com/octo/widget/",
        temp.path(),
    )
    .await;

    let extracted_path = temp.path().join("widget");
    assert_eq!(
        outcome.result,
        FetchResult::Ready {
            installer_path: extracted_path
                .join("widget-main")
                .join("dist")
                .join("InstallerReady.EXE"),
            extracted_path,
        }
    );
    assert_eq!(outcome.trail.last(), Some(&FetchState::AwaitingRunDecision));
    assert!(launcher.launched().is_empty());
    assert_progress_well_formed(&updates);
}

#[tokio::test]
async fn test_helper_release_without_installer() {
    let server = MockServer::start().await;
    mount_widget(&server, &[("widget-main/README.md", b"# widget")]).await;
    mount_helper_release(&server, &[("InstallerReady/setup.exe", b"MZ")]).await;

    let temp = TempDir::new().unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let (outcome, updates) = run(
        config_for(&server),
        launcher.clone(),
        "https://github.com/octo/widget",
        temp.path(),
    )
    .await;

    assert_eq!(
        outcome.result,
        FetchResult::NoExecutableFound {
            extracted_path: temp.path().join("InstallerReady")
        }
    );
    assert_eq!(outcome.trail.last(), Some(&FetchState::Done));
    assert!(launcher.launched().is_empty());
    assert_progress_well_formed(&updates);
    assert!(!updates.last().unwrap().is_error);
}

#[tokio::test]
async fn test_disabled_helper_stops_after_scan() {
    let server = MockServer::start().await;
    mount_widget(&server, &[("widget-main/README.md", b"# widget")]).await;

    let mut config = config_for(&server);
    config.helper.enabled = false;

    let temp = TempDir::new().unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let (outcome, updates) = run(
        config,
        launcher.clone(),
        "https://github.com/octo/widget",
        temp.path(),
    )
    .await;

    assert_eq!(
        outcome.result,
        FetchResult::NoInstaller {
            extracted_path: temp.path().join("widget")
        }
    );
    assert!(!outcome.trail.contains(&FetchState::FallbackResolving));
    assert!(launcher.launched().is_empty());
    assert_progress_well_formed(&updates);
}

#[tokio::test]
async fn test_branch_lookup_failure_uses_main() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/widget"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_zip(
        &server,
        "/octo/widget/archive/refs/heads/main.zip",
        build_zip(&[("widget-main/installerready.bat", b"@echo off")]),
    )
    .await;

    let temp = TempDir::new().unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let (outcome, _) = run(
        config_for(&server),
        launcher,
        "https://github.com/octo/widget.git",
        temp.path(),
    )
    .await;

    assert!(matches!(outcome.result, FetchResult::Ready { .. }));
}

#[tokio::test]
async fn test_archive_download_failure() {
    let server = MockServer::start().await;
    mount_json(&server, "/repos/octo/widget", json!({ "default_branch": "trunk" })).await;
    Mock::given(method("GET"))
        .and(path("/octo/widget/archive/refs/heads/trunk.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let launcher = Arc::new(RecordingLauncher::default());
    let (outcome, updates) = run(
        config_for(&server),
        launcher,
        "https://github.com/octo/widget",
        temp.path(),
    )
    .await;

    assert!(matches!(
        outcome.result,
        FetchResult::Error(FetchError::DownloadFailed { status: 404, .. })
    ));
    assert_eq!(
        outcome.trail,
        vec![
            FetchState::Idle,
            FetchState::Resolving,
            FetchState::Downloading,
            FetchState::Failed,
        ]
    );
    assert!(!temp.path().join("widget").exists());
    assert_progress_well_formed(&updates);
}
