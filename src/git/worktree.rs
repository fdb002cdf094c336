//! Worktree creation and teardown.
//!
//! Each active ticket gets an isolated working copy as a sibling of the
//! repository: `{repo}-worktrees/{sanitized-branch}`. The branch is created
//! from the resolved base branch the first time the ticket spawns an agent.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::git::GitCli;

#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("worktree already exists at {0}")]
    WorktreeExists(PathBuf),
    #[error("invalid branch name: {0}")]
    BranchInvalid(String),
    #[error("git error: {0}")]
    GitError(String),
}

/// Replace whitespace and filesystem-unsafe characters with `-`, collapsing
/// runs. The result is safe both as a git ref component and a directory
/// name.
pub fn sanitize_branch(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true; // suppress a leading dash
    for c in name.chars() {
        let mapped = if c.is_whitespace() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '~' | '^') {
            '-'
        } else {
            c
        };
        if mapped == '-' {
            if !last_dash {
                out.push('-');
            }
            last_dash = true;
        } else {
            out.push(mapped);
            last_dash = false;
        }
    }
    out.trim_end_matches('-').to_string()
}

pub struct WorktreeManager {
    repo_path: PathBuf,
}

impl WorktreeManager {
    pub fn new(repo_path: &Path) -> Self {
        Self {
            repo_path: repo_path.to_path_buf(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// The worktree directory a branch would be checked out into: a sibling
    /// of the repository under `{repo}-worktrees/`.
    pub fn worktree_path(&self, branch: &str) -> PathBuf {
        let repo_name = self
            .repo_path
            .file_name()
            .map_or_else(|| "repo".to_string(), |n| n.to_string_lossy().to_string());
        let parent = self
            .repo_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        parent
            .join(format!("{repo_name}-worktrees"))
            .join(sanitize_branch(branch))
    }

    /// Resolve the repository's default branch: origin's HEAD if set,
    /// otherwise a local `main` or `master`.
    pub async fn default_branch(&self) -> Result<String, WorktreeError> {
        if let Ok(ref_str) =
            GitCli::symbolic_ref(&self.repo_path, "refs/remotes/origin/HEAD").await
        {
            if let Some(branch) = ref_str.strip_prefix("refs/remotes/origin/") {
                return Ok(branch.to_string());
            }
        }
        for candidate in ["main", "master"] {
            if GitCli::ref_exists(&self.repo_path, candidate).await {
                return Ok(candidate.to_string());
            }
        }
        Err(WorktreeError::GitError(
            "no default branch: origin/HEAD unset and neither main nor master exists".to_string(),
        ))
    }

    /// Create the worktree for `branch`, creating the branch from
    /// `base_branch` if it does not already exist. Returns the absolute
    /// worktree path.
    pub async fn create_worktree(
        &self,
        branch: &str,
        base_branch: &str,
    ) -> Result<PathBuf, WorktreeError> {
        if branch.is_empty() || branch.starts_with('-') || branch.contains("..") {
            return Err(WorktreeError::BranchInvalid(branch.to_string()));
        }

        let path = self.worktree_path(branch);
        if path.exists() {
            return Err(WorktreeError::WorktreeExists(path));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| WorktreeError::GitError(format!("create worktree parent: {e}")))?;
        }

        if !GitCli::ref_exists(&self.repo_path, branch).await {
            debug!(%branch, %base_branch, "Creating branch for worktree");
            GitCli::create_branch(&self.repo_path, branch, base_branch)
                .await
                .map_err(|e| WorktreeError::GitError(e.to_string()))?;
        }

        GitCli::add_worktree(&self.repo_path, &path, branch)
            .await
            .map_err(|e| WorktreeError::GitError(e.to_string()))?;

        info!(path = %path.display(), %branch, "Worktree created");
        Ok(path)
    }

    /// Best-effort worktree removal; a directory that has already been
    /// cleaned up is not an error.
    pub async fn remove_worktree(&self, path: &Path) {
        if !path.exists() {
            debug!(path = %path.display(), "Worktree already gone");
            return;
        }
        if let Err(e) = GitCli::remove_worktree(&self.repo_path, path).await {
            warn!(path = %path.display(), error = %e, "git worktree remove failed");
            // Last resort: clear the directory so a retry can recreate it
            if let Err(e) = std::fs::remove_dir_all(path) {
                warn!(path = %path.display(), error = %e, "Failed to remove worktree directory");
            }
        }
    }
}
