//! Top-level runners for the `install` and `scan` commands

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tokio::sync::mpsc;

use crate::cli::InstallArgs;
use crate::config::FetchConfig;
use crate::environment;
use crate::fetch::{
    FetchOrchestrator, FetchProgress, FetchRequest, FetchResult, Launcher, ProcessLauncher,
    find_installer,
};
use crate::wizard;

/// What to do with an installer found in the user's repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDecision {
    Run,
    Skip,
    Ask,
}

impl RunDecision {
    pub fn from_args(args: &InstallArgs, interactive: bool) -> Self {
        if args.yes {
            RunDecision::Run
        } else if args.no_run || !interactive {
            RunDecision::Skip
        } else {
            RunDecision::Ask
        }
    }
}

fn print_colored(color: Color, bold: bool, text: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold));
    let _ = writeln!(stdout, "{text}");
    let _ = stdout.reset();
}

/// Download a repository and handle whatever installer it carries
pub async fn run_install(args: InstallArgs) -> Result<()> {
    let interactive = !args.no_interaction && environment::is_interactive();

    let target = if interactive {
        wizard::prompt_target(&args)?
    } else {
        wizard::target_from(args.url.as_deref(), args.dest.as_deref())?
    };

    let mut config = FetchConfig::load(args.config.as_deref())?;
    if args.no_fallback {
        config.helper.enabled = false;
    }

    let launcher = Arc::new(ProcessLauncher);
    let orchestrator = Arc::new(
        FetchOrchestrator::new(config, launcher.clone()).context("Failed to set up HTTP client")?,
    );

    print_colored(
        Color::Cyan,
        true,
        &format!("📥 Fetching {} into {}", target.url, target.dest_dir.display()),
    );

    let (rx, handle) = orchestrator.spawn(FetchRequest {
        url: target.url,
        dest_dir: target.dest_dir,
    });

    let progress_task = tokio::spawn(render_progress(rx, environment::supports_progress_bar()));
    let outcome = handle.await.context("Fetch task failed")?;
    progress_task.await.ok();

    match outcome.result {
        FetchResult::Ready {
            extracted_path,
            installer_path,
        } => {
            print_colored(
                Color::Green,
                true,
                &format!("✓ Installer found: {}", installer_path.display()),
            );
            println!("   Repository: {}", extracted_path.display());

            let run = match RunDecision::from_args(&args, interactive) {
                RunDecision::Run => true,
                RunDecision::Skip => false,
                RunDecision::Ask => wizard::confirm_run(&installer_path)?,
            };

            if run {
                launcher
                    .launch(&installer_path)
                    .with_context(|| format!("Failed to run {}", installer_path.display()))?;
                print_colored(Color::Green, false, "✓ Installer started");
            } else {
                println!("   Installer not run.");
            }
        }
        FetchResult::NoInstaller { extracted_path } => {
            print_colored(
                Color::Yellow,
                false,
                &format!(
                    "⚠ No installer found. Repository downloaded to {}",
                    extracted_path.display()
                ),
            );
        }
        FetchResult::Ran { installer_path } => {
            print_colored(
                Color::Green,
                true,
                &format!(
                    "✓ No installer in the repository; launched helper installer {}",
                    installer_path.display()
                ),
            );
        }
        FetchResult::NoExecutableFound { extracted_path } => {
            print_colored(
                Color::Yellow,
                false,
                &format!(
                    "⚠ No executable found. Helper release extracted to {}",
                    extracted_path.display()
                ),
            );
        }
        FetchResult::Error(e) => {
            let mut stderr = StandardStream::stderr(ColorChoice::Auto);
            let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
            let _ = writeln!(stderr, "\n❌ Installation failed");
            let _ = stderr.reset();
            return Err(e.into());
        }
    }

    Ok(())
}

/// Consume fetch progress until the worker drops its sender
async fn render_progress(mut rx: mpsc::Receiver<FetchProgress>, live: bool) {
    let bar = if live {
        let bar = ProgressBar::new(100);
        match ProgressStyle::default_bar().template("[{bar:50.cyan/blue}] {pos:>3}%  {msg}") {
            Ok(style) => bar.set_style(style.progress_chars("█▓░")),
            Err(e) => log::debug!("Invalid progress bar template: {e}"),
        }
        Some(bar)
    } else {
        None
    };

    while let Some(progress) = rx.recv().await {
        let pos = (progress.fraction.clamp(0.0, 1.0) * 100.0).round() as u64;
        match &bar {
            Some(bar) if progress.fraction >= 1.0 => {
                bar.set_position(pos);
                if progress.is_error {
                    bar.abandon_with_message(format!("❌ {}", progress.message));
                } else {
                    bar.finish_with_message(progress.message);
                }
            }
            Some(bar) => {
                bar.set_position(pos);
                bar.set_message(progress.message);
            }
            None => eprintln!("[{pos:>3}%] {}", progress.message),
        }
    }
}

/// Look for an installer in an existing directory
///
/// Returns whether one was found.
pub fn run_scan(dir: &Path, config_path: Option<&Path>) -> Result<bool> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }
    let config = FetchConfig::load(config_path)?;

    match find_installer(dir, &config.scan.installer_names, config.scan.max_depth) {
        Some(path) => {
            print_colored(Color::Green, false, &format!("{}", path.display()));
            Ok(true)
        }
        None => {
            let mut stderr = StandardStream::stderr(ColorChoice::Auto);
            let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
            let _ = writeln!(
                stderr,
                "No installer ({}) under {}",
                config.scan.installer_names.join(", "),
                dir.display()
            );
            let _ = stderr.reset();
            Ok(false)
        }
    }
}
