//! Path resolution: root handling, `#LATEST` markers, normalization.
//!
//! Every operation takes user-supplied paths through [`Client::resolve`], so
//! relative paths, `.`/`..` segments, and latest-child markers behave the
//! same everywhere.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::Client;
use crate::error::{HdfsError, Result};

/// Matches one whole path component: `#LATEST` or `#LATEST{n}`.
static LATEST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#LATEST(?:\{(\d+)\})?$").unwrap());

impl Client {
    /// Absolute, normalized form of `path`, with `#LATEST` markers expanded.
    ///
    /// A relative path is joined under the client's root. The root comes from
    /// the configuration when absolute; otherwise it is the remote home
    /// directory (with a relative configured root joined beneath it), fetched
    /// once and cached for the lifetime of the client.
    pub fn resolve(&self, path: &str) -> Result<String> {
        let joined = if path.starts_with('/') {
            path.to_string()
        } else {
            let root = self.resolved_root()?;
            format!("{}/{}", root.trim_end_matches('/'), path)
        };
        let mut resolved = normalize(&joined);
        if resolved.contains("#LATEST") {
            resolved = normalize(&self.expand_markers(&resolved)?);
        }
        debug!("Resolved {} to {}", path, resolved);
        Ok(resolved)
    }

    /// The cached root directory, fetching the remote home directory on the
    /// first call that needs it.
    ///
    /// The lock is held across the fetch so concurrent first-time resolutions
    /// agree on a single home-directory request. A failed fetch leaves the
    /// cache unset and the next call retries.
    fn resolved_root(&self) -> Result<String> {
        let mut cache = self.root.lock().unwrap();
        if let Some(root) = cache.as_ref() {
            return Ok(root.clone());
        }
        let root = match &self.configured_root {
            Some(configured) if configured.starts_with('/') => configured.clone(),
            Some(configured) => {
                let home = self.get_home_directory()?;
                format!("{}/{}", home.trim_end_matches('/'), configured)
            }
            None => self.get_home_directory()?,
        };
        debug!("Using remote root {}", root);
        *cache = Some(root.clone());
        Ok(root)
    }

    /// Replace each `#LATEST`/`#LATEST{n}` component with the name(s) of the
    /// most recently modified child, descending one listing per repetition.
    fn expand_markers(&self, path: &str) -> Result<String> {
        let mut resolved = String::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            match LATEST_MARKER.captures(component) {
                Some(caps) => {
                    let count = match caps.get(1) {
                        Some(digits) => digits.as_str().parse::<usize>().map_err(|_| {
                            HdfsError::operation(format!(
                                "Invalid marker repetition in '{}'",
                                component
                            ))
                        })?,
                        None => 1,
                    };
                    for _ in 0..count {
                        let parent = if resolved.is_empty() {
                            "/".to_string()
                        } else {
                            resolved.clone()
                        };
                        let child = self.latest_child(&parent)?;
                        resolved.push('/');
                        resolved.push_str(&child);
                    }
                }
                None => {
                    resolved.push('/');
                    resolved.push_str(component);
                }
            }
        }
        Ok(resolved)
    }

    /// Name of the most recently modified entry of `dir`; ties are broken by
    /// ascending name so expansion is deterministic.
    fn latest_child(&self, dir: &str) -> Result<String> {
        let mut entries = self.list_status_abs(dir)?;
        if entries.is_empty() {
            return Err(HdfsError::operation(format!(
                "Cannot expand empty directory '{}'",
                dir
            )));
        }
        if entries.len() == 1 && entries[0].path_suffix.is_empty() {
            return Err(HdfsError::operation(format!("Cannot expand file '{}'", dir)));
        }
        entries.sort_by(|a, b| {
            b.modification_time
                .cmp(&a.modification_time)
                .then_with(|| a.path_suffix.cmp(&b.path_suffix))
        });
        Ok(entries.remove(0).path_suffix)
    }
}

/// Collapse `.`, `..`, and repeated separators. The result always starts
/// with `/`; `..` at the root stays at the root.
pub(crate) fn normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    format!("/{}", stack.join("/"))
}
