use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ghinstaller",
    version,
    about = "Download a GitHub repository and run its installer"
)]
pub struct Args {
    /// Sub‑commands (install, scan)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Download a repository and look for its installer (default if no sub‑command)
    Install(InstallArgs),
    /// Look for an installer in an existing directory (Exit 0 = found, 1 = not found)
    Scan {
        /// Directory to search
        dir: PathBuf,

        /// Path to configuration file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Repository URL, e.g. https://github.com/username/repo
    pub url: Option<String>,

    /// Install folder; the repository lands in <DEST>/<repo name>
    #[arg(long, short = 'd')]
    pub dest: Option<PathBuf>,

    /// Run a found installer without asking
    #[arg(long, short = 'y', conflicts_with = "no_run")]
    pub yes: bool,

    /// Never run an installer found in the repository
    #[arg(long)]
    pub no_run: bool,

    /// Do not fall back to the helper release when no installer is found
    #[arg(long)]
    pub no_fallback: bool,

    /// Never prompt; missing arguments are errors
    #[arg(long)]
    pub no_interaction: bool,

    /// Path to configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}
