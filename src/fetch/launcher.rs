//! Installer process launch
//!
//! The launched process is detached from the fetch: its exit status and
//! output are never collected. The `Child` handle is dropped without
//! waiting, so on Unix the exited installer stays a zombie until this
//! process exits; for a one-shot CLI that is short-lived.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{FetchError, StepResult};

/// Starts an installer as a new OS process
pub trait Launcher: Send + Sync {
    fn launch(&self, installer: &Path) -> StepResult<()>;
}

/// Spawns the installer with `std::process::Command` and returns immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    /// Build the command for `installer`, resolved against the current directory.
    ///
    /// The child runs in the installer's own directory, so a relative program
    /// path would otherwise be looked up from there.
    fn command_for(installer: &Path) -> StepResult<Command> {
        let installer: PathBuf =
            std::path::absolute(installer).map_err(|e| FetchError::LaunchFailed {
                path: installer.to_path_buf(),
                message: e.to_string(),
            })?;

        let is_script = installer
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("bat") || e.eq_ignore_ascii_case("cmd"));

        let mut command = if cfg!(windows) && is_script {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&installer);
            c
        } else {
            Command::new(&installer)
        };

        if let Some(dir) = installer.parent() {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Ok(command)
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, installer: &Path) -> StepResult<()> {
        let child = Self::command_for(installer)?
            .spawn()
            .map_err(|e| FetchError::LaunchFailed {
                path: installer.to_path_buf(),
                message: e.to_string(),
            })?;
        log::info!("Launched {} (pid {})", installer.display(), child.id());
        Ok(())
    }
}
