//! Interactive prompts for `ghinstaller install`

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use inquire::validator::Validation;
use inquire::{Confirm, Text};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::cli::InstallArgs;

pub const MISSING_INPUT: &str = "Please provide a GitHub URL and install folder";

/// URL and install folder for one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    pub url: String,
    pub dest_dir: PathBuf,
}

/// Display welcome banner
fn show_welcome() {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(
        stdout,
        "\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    );
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    let _ = writeln!(stdout, "\n                  GitHub Repository Installer");
    let _ = stdout.reset();
    let _ = writeln!(
        stdout,
        "\n  Downloads a repository and runs its InstallerReady installer."
    );
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(
        stdout,
        "\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n"
    );
    let _ = stdout.reset();
}

fn required(input: &str) -> std::result::Result<Validation, inquire::CustomUserError> {
    if input.trim().is_empty() {
        Ok(Validation::Invalid(MISSING_INPUT.into()))
    } else {
        Ok(Validation::Valid)
    }
}

fn default_dest() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Prompt for whatever `args` leaves out
pub fn prompt_target(args: &InstallArgs) -> Result<InstallTarget> {
    show_welcome();

    let url = match args.url.as_deref() {
        Some(url) if !url.trim().is_empty() => url.to_string(),
        _ => Text::new("GitHub repository URL:")
            .with_placeholder("https://github.com/username/repo")
            .with_validator(required)
            .prompt()
            .map_err(|e| anyhow::anyhow!("Prompt cancelled: {}", e))?,
    };

    let dest_dir = match &args.dest {
        Some(dest) => dest.clone(),
        None => {
            let default = default_dest();
            let answer = Text::new("Install folder:")
                .with_default(&default.to_string_lossy())
                .with_help_message("The repository is extracted into a subfolder named after it")
                .with_validator(required)
                .prompt()
                .map_err(|e| anyhow::anyhow!("Prompt cancelled: {}", e))?;
            PathBuf::from(answer.trim())
        }
    };

    target_from(Some(&url), Some(&dest_dir))
}

/// Build the target from explicit arguments, rejecting blanks.
///
/// A relative install folder is resolved against the current directory.
pub fn target_from(url: Option<&str>, dest_dir: Option<&Path>) -> Result<InstallTarget> {
    let url = url.map(str::trim).filter(|u| !u.is_empty());
    let dest_dir = dest_dir.filter(|d| !d.as_os_str().is_empty());

    match (url, dest_dir) {
        (Some(url), Some(dest_dir)) => Ok(InstallTarget {
            url: url.to_string(),
            dest_dir: std::path::absolute(dest_dir).with_context(|| {
                format!("Failed to resolve install folder {}", dest_dir.display())
            })?,
        }),
        _ => anyhow::bail!(MISSING_INPUT),
    }
}

/// Ask whether to run the installer found in the repository
pub fn confirm_run(installer: &Path) -> Result<bool> {
    Confirm::new(&format!("Installer found: {}. Run it now?", installer.display()))
        .with_default(false)
        .with_help_message("The installer runs with your user's permissions")
        .prompt()
        .map_err(|e| anyhow::anyhow!("Prompt cancelled: {}", e))
}
