//! Repository URL parsing
//!
//! Turns user input such as `https://github.com/owner/repo.git/` into a
//! validated [`RepositoryRef`] before anything touches the network.

use std::fmt;

use url::Url;

use crate::error::{FetchError, StepResult};

/// Branch used when the metadata lookup fails or omits `default_branch`
pub const FALLBACK_BRANCH: &str = "main";

/// Validated `owner/name` pair plus the URL it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub source_url: String,
}

impl RepositoryRef {
    /// Build a reference for a repository known by owner and name (e.g. the helper)
    pub fn from_parts(owner: &str, name: &str) -> StepResult<Self> {
        let source_url = format!("{owner}/{name}");
        let name = name.strip_suffix(".git").unwrap_or(name);
        for segment in [owner, name] {
            validate_segment(segment).map_err(|reason| FetchError::InvalidUrl {
                url: source_url.clone(),
                reason,
            })?;
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            source_url,
        })
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Branch to download; never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub branch_name: String,
}

impl BranchInfo {
    /// Use `name` unless it is blank, in which case fall back to `main`
    pub fn new(name: Option<&str>) -> Self {
        let branch_name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => FALLBACK_BRANCH.to_string(),
        };
        Self { branch_name }
    }

    pub fn fallback() -> Self {
        Self::new(None)
    }
}

impl Default for BranchInfo {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Parse `owner/name` out of a repository URL.
///
/// `host` is the segment that must directly precede `owner/name`
/// (`github.com` by default; subdomains such as `www.github.com` are accepted).
/// Input is trimmed, a missing scheme is assumed to be `https`, a trailing
/// slash and a `.git` suffix are stripped, and anything after `owner/name`
/// (e.g. `/tree/dev`) is ignored.
pub fn parse_repository_ref(url: &str, host: &str) -> StepResult<RepositoryRef> {
    let trimmed = url.trim();
    let invalid = |reason: &str| FetchError::InvalidUrl {
        url: trimmed.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("URL is empty"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("only http and https URLs are supported"));
    }

    let url_host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.to_ascii_lowercase();
    if url_host != host && !url_host.ends_with(&format!(".{host}")) {
        return Err(invalid(&format!("host must be {host}")));
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let &[owner, name, ..] = segments.as_slice() else {
        return Err(invalid("expected /<owner>/<repo> after the host"));
    };

    let name = name.strip_suffix(".git").unwrap_or(name);
    validate_segment(owner).map_err(|r| invalid(&r))?;
    validate_segment(name).map_err(|r| invalid(&r))?;

    Ok(RepositoryRef {
        owner: owner.to_string(),
        name: name.to_string(),
        source_url: trimmed.to_string(),
    })
}

fn validate_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(format!("'{segment}' is not a valid owner or repository name"));
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("'{segment}' contains invalid character '{bad}'"));
    }
    Ok(())
}
