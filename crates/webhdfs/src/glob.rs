//! Shell-style wildcard matching against the remote tree.

use glob::Pattern;

use crate::client::Client;
use crate::error::{HdfsError, Result};

/// Expand a wildcard pattern against the remote tree.
///
/// `*`, `?` and `[...]` match within a single path component. Entries whose
/// name starts with a dot are matched only when the component pattern itself
/// starts with a literal dot. A pattern without wildcards returns the path
/// itself when it exists, and a pattern ending in `/` matches only
/// directories. Relative patterns are matched under the client's root.
///
/// Listing failures (a missing or non-directory parent) propagate; a pattern
/// that simply matches nothing yields an empty vec.
pub fn glob(client: &Client, pattern: &str) -> Result<Vec<String>> {
    let mut matches = Vec::new();
    expand(client, pattern, &mut matches)?;
    Ok(matches)
}

fn expand(client: &Client, pattern: &str, out: &mut Vec<String>) -> Result<()> {
    let (dirname, basename) = split(pattern);

    if !has_magic(pattern) {
        if basename.is_empty() {
            if client.status(dirname)?.is_dir() {
                out.push(pattern.to_string());
            }
        } else if client.status_opt(pattern)?.is_some() {
            out.push(pattern.to_string());
        }
        return Ok(());
    }

    if dirname.is_empty() {
        // Bare relative pattern: match under the root, yield bare names.
        let root = client.resolve(".")?;
        out.extend(match_children(client, &root, basename)?);
        return Ok(());
    }

    let parents = if dirname != pattern && has_magic(dirname) {
        let mut expanded = Vec::new();
        expand(client, dirname, &mut expanded)?;
        expanded
    } else {
        vec![dirname.to_string()]
    };

    for parent in &parents {
        let names = if has_magic(basename) {
            match_children(client, parent, basename)?
        } else {
            match_literal(client, parent, basename)?
        };
        out.extend(names.iter().map(|name| join(parent, name)));
    }
    Ok(())
}

fn has_magic(text: &str) -> bool {
    text.contains(['*', '?', '['])
}

/// A directory's child names matching `pattern`, in listing order.
fn match_children(client: &Client, dir: &str, pattern: &str) -> Result<Vec<String>> {
    let matcher = Pattern::new(pattern).map_err(|error| {
        HdfsError::operation(format!("Invalid pattern '{}': {}", pattern, error))
    })?;
    let hidden_ok = pattern.starts_with('.');
    Ok(client
        .list(dir)?
        .into_iter()
        .filter(|name| hidden_ok || !name.starts_with('.'))
        .filter(|name| matcher.matches(name))
        .collect())
}

/// Literal basename lookup. An empty basename comes from a trailing slash
/// and matches only when the parent is a directory.
fn match_literal(client: &Client, dir: &str, name: &str) -> Result<Vec<String>> {
    if name.is_empty() {
        if client.status(dir)?.is_dir() {
            return Ok(vec![String::new()]);
        }
        return Ok(Vec::new());
    }
    if client.status_opt(&join(dir, name))?.is_some() {
        return Ok(vec![name.to_string()]);
    }
    Ok(Vec::new())
}

/// Split off the last path component, keeping the root slash.
fn split(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        None => ("", path),
        Some(idx) => {
            let head = &path[..idx + 1];
            let tail = &path[idx + 1..];
            if head.bytes().all(|b| b == b'/') {
                (head, tail)
            } else {
                (head.trim_end_matches('/'), tail)
            }
        }
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}
