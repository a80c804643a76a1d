//! Transfer planning: destination triage, staging paths, task lists.
//!
//! Planning performs only metadata reads. It decides where the transfer
//! writes (directly to the destination, or to a staging sibling that commit
//! renames into place) and enumerates the file pairs to copy, so every
//! precondition fails before any data moves.

use std::path::{Path, PathBuf};

use chrono::Utc;
use walkdir::WalkDir;

use crate::client::Client;
use crate::error::{HdfsError, Result};

/// One file to upload: a local source and the remote path written during
/// the transfer.
#[derive(Debug, Clone)]
pub(crate) struct UploadTask {
    pub local: PathBuf,
    pub remote: String,
}

/// One file to download: a remote source and the local path written during
/// the transfer.
#[derive(Debug, Clone)]
pub(crate) struct DownloadTask {
    pub remote: String,
    pub local: PathBuf,
}

/// Where a transfer writes, and whether commit must rename it into place.
///
/// `needs_commit` is false exactly when the destination did not previously
/// exist, in which case the transfer writes in place and there is nothing to
/// swap at the end.
#[derive(Debug, Clone)]
pub(crate) struct StagingPlan<P> {
    pub final_path: P,
    pub staging_path: P,
    pub needs_commit: bool,
}

/// `.temp-<microseconds>`, appended to the final name to form a staging
/// sibling in the same parent directory.
fn staging_suffix() -> String {
    format!(".temp-{}", Utc::now().timestamp_micros())
}

/// Plan an upload of `local` (file or directory tree) to `remote`.
pub(crate) fn plan_upload(
    client: &Client,
    local: &Path,
    remote: &str,
    overwrite: bool,
) -> Result<(Vec<UploadTask>, StagingPlan<String>)> {
    if !local.exists() {
        return Err(HdfsError::precondition(format!(
            "Local path '{}' does not exist",
            local.display()
        )));
    }

    let resolved = client.resolve(remote)?;
    let dest = client.status_opt(&resolved)?;

    let plan = match dest {
        Some(status) if status.is_dir() => {
            // Upload lands inside the directory under the source's name.
            let target = join_remote(&resolved, &local_basename(local)?);
            let children = client.list(&resolved)?;
            let name = remote_basename(&target);
            if children.iter().any(|child| child == &name) {
                if !overwrite {
                    return Err(HdfsError::precondition(format!(
                        "Remote path '{}' already exists",
                        target
                    )));
                }
                StagingPlan {
                    staging_path: format!("{}{}", target, staging_suffix()),
                    final_path: target,
                    needs_commit: true,
                }
            } else {
                StagingPlan {
                    staging_path: target.clone(),
                    final_path: target,
                    needs_commit: false,
                }
            }
        }
        Some(_) => {
            if !overwrite {
                return Err(HdfsError::precondition(format!(
                    "Remote path '{}' already exists",
                    resolved
                )));
            }
            StagingPlan {
                staging_path: format!("{}{}", resolved, staging_suffix()),
                final_path: resolved,
                needs_commit: true,
            }
        }
        None => {
            let parent = remote_parent(&resolved);
            match client.status_opt(&parent)? {
                Some(status) if status.is_dir() => {}
                _ => {
                    return Err(HdfsError::precondition(format!(
                        "Parent directory of '{}' does not exist",
                        resolved
                    )))
                }
            }
            StagingPlan {
                staging_path: resolved.clone(),
                final_path: resolved,
                needs_commit: false,
            }
        }
    };

    let tasks = upload_tasks(local, &plan.staging_path)?;
    Ok((tasks, plan))
}

/// Enumerate (local file, staged remote file) pairs, preserving the relative
/// directory structure. Entries are walked in sorted order so sequential
/// transfers are reproducible.
fn upload_tasks(local: &Path, staging: &str) -> Result<Vec<UploadTask>> {
    if local.is_file() {
        return Ok(vec![UploadTask {
            local: local.to_path_buf(),
            remote: staging.to_string(),
        }]);
    }

    let mut tasks = Vec::new();
    for entry in WalkDir::new(local).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(local)
            .map_err(|_| HdfsError::operation(format!("Path escape in '{}'", entry.path().display())))?;
        let remote = join_remote(staging, &relative.to_string_lossy());
        tasks.push(UploadTask {
            local: entry.path().to_path_buf(),
            remote,
        });
    }
    if tasks.is_empty() {
        return Err(HdfsError::precondition(format!(
            "No files to upload found inside '{}'",
            local.display()
        )));
    }
    Ok(tasks)
}

/// Plan a download of `remote` (file or directory tree) to `local`.
pub(crate) fn plan_download(
    client: &Client,
    remote: &str,
    local: &Path,
    overwrite: bool,
) -> Result<(Vec<DownloadTask>, StagingPlan<PathBuf>)> {
    let resolved = client.resolve(remote)?;
    let source = client.status_opt(&resolved)?.ok_or_else(|| {
        HdfsError::precondition(format!("Remote path '{}' does not exist", resolved))
    })?;

    let target = if local.is_dir() {
        local.join(remote_basename(&resolved))
    } else {
        local.to_path_buf()
    };

    let plan = if target.exists() {
        if !overwrite {
            return Err(HdfsError::precondition(format!(
                "Path '{}' already exists",
                target.display()
            )));
        }
        StagingPlan {
            staging_path: staging_sibling(&target),
            final_path: target,
            needs_commit: true,
        }
    } else {
        match target.parent() {
            Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => {}
            _ => {
                return Err(HdfsError::precondition(format!(
                    "Parent directory of '{}' does not exist",
                    target.display()
                )))
            }
        }
        StagingPlan {
            staging_path: target.clone(),
            final_path: target,
            needs_commit: false,
        }
    };

    let tasks = if source.is_dir() {
        let mut files = Vec::new();
        collect_remote_files(client, &resolved, "", &mut files)?;
        if files.is_empty() {
            return Err(HdfsError::precondition(format!(
                "No files to download found inside '{}'",
                resolved
            )));
        }
        files
            .into_iter()
            .map(|(remote, relative)| DownloadTask {
                remote,
                local: plan.staging_path.join(relative),
            })
            .collect()
    } else {
        vec![DownloadTask {
            remote: resolved,
            local: plan.staging_path.clone(),
        }]
    };

    Ok((tasks, plan))
}

/// Depth-first remote walk; pushes `(absolute remote path, relative path)`
/// for every file under `dir`.
fn collect_remote_files(
    client: &Client,
    dir: &str,
    relative: &str,
    out: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in client.list_status_abs(dir)? {
        if entry.path_suffix.is_empty() {
            continue;
        }
        let child = join_remote(dir, &entry.path_suffix);
        let child_relative = if relative.is_empty() {
            entry.path_suffix.clone()
        } else {
            format!("{}/{}", relative, entry.path_suffix)
        };
        if entry.is_dir() {
            collect_remote_files(client, &child, &child_relative, out)?;
        } else {
            out.push((child, child_relative));
        }
    }
    Ok(())
}

fn join_remote(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

fn remote_basename(path: &str) -> String {
    path.rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or("")
        .to_string()
}

fn remote_parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

fn local_basename(path: &Path) -> Result<String> {
    if let Some(name) = path.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }
    let canonical = path.canonicalize()?;
    canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            HdfsError::precondition(format!(
                "Cannot determine a name for '{}'",
                path.display()
            ))
        })
}

fn staging_sibling(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_os_string();
    staged.push(staging_suffix());
    PathBuf::from(staged)
}
