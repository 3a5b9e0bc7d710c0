//! Path resolution for tools confined to a working directory

use std::path::{Component, Path, PathBuf};

/// A path that resolves outside the working directory
#[derive(Debug, Clone)]
pub struct PathValidationError {
    pub path: String,
    pub workspace: String,
}

impl std::fmt::Display for PathValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Path {} is outside working directory {}",
            self.path, self.workspace
        )
    }
}

impl std::error::Error for PathValidationError {}

/// Resolve `path` against `workspace_root` and make sure it stays inside.
///
/// Relative paths are joined onto the root, `~/` is expanded. `.` and `..`
/// are folded lexically, then the longest existing prefix is canonicalized so
/// symlinks pointing outside are caught too. The target itself may not exist.
pub async fn validate_workspace_path(
    path: &str,
    workspace_root: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
    let expanded = if path.starts_with('/') || path.starts_with('~') {
        tatty_config::expand_home(path)
    } else {
        workspace_root.join(path)
    };

    let absolute = if expanded.is_absolute() {
        normalize(&expanded)
    } else {
        normalize(&std::env::current_dir()?.join(&expanded))
    };
    let resolved = canonicalize_existing_prefix(&absolute).await;

    let workspace = tokio::fs::canonicalize(workspace_root)
        .await
        .unwrap_or_else(|_| normalize(workspace_root));

    if !is_path_within_workspace(&resolved, &workspace) {
        return Err(Box::new(PathValidationError {
            path: path.to_string(),
            workspace: workspace.display().to_string(),
        }));
    }

    Ok(resolved)
}

/// Fold `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

async fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();

    loop {
        if let Ok(canonical) = tokio::fs::canonicalize(&existing).await {
            let mut resolved = canonical;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name);
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn is_path_within_workspace(path: &Path, workspace: &Path) -> bool {
    path.starts_with(workspace)
}
