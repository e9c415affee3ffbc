//! Installer discovery in an extracted tree

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// First file under `root_dir` whose name matches one of `candidate_names`,
/// compared case-insensitively.
///
/// Traversal is pre-order with entries sorted by file name, so the result is
/// deterministic. Symbolic links are not followed and depth is capped at
/// `max_depth`, so link cycles cannot trap the walk. Unreadable entries are
/// skipped.
pub fn find_installer(
    root_dir: &Path,
    candidate_names: &[String],
    max_depth: usize,
) -> Option<PathBuf> {
    let wanted: Vec<String> = candidate_names
        .iter()
        .map(|n| n.to_lowercase())
        .collect();
    if wanted.is_empty() {
        return None;
    }

    WalkDir::new(root_dir)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::debug!("Skipping unreadable entry while scanning: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            wanted.iter().any(|w| *w == name)
        })
        .map(|entry| entry.into_path())
}
