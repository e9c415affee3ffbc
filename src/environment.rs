//! Terminal detection
//!
//! Decides whether prompts and a live progress bar can be shown.

use std::io::IsTerminal;

/// Check if a user can answer prompts
///
/// Returns `false` if any of:
/// - `CI` is set
/// - stdin or stdout is not a terminal
pub fn is_interactive() -> bool {
    if std::env::var_os("CI").is_some() {
        return false;
    }
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Check if stderr can render a live progress bar
pub fn supports_progress_bar() -> bool {
    std::io::stderr().is_terminal()
}
