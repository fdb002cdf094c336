//! Git CLI wrapper.
//!
//! Uses the git CLI directly (rather than libgit2) so hooks, sparse
//! checkouts, and other repository features behave exactly as they would for
//! the user. The surface is intentionally small: worktree add/remove, branch
//! creation, and default-branch resolution.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

pub struct GitCli;

impl GitCli {
    /// Execute a git command and return trimmed stdout.
    async fn run_git(args: &[&str], cwd: &Path) -> Result<String> {
        debug!(?args, ?cwd, "Running git command");

        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_git_silent(args: &[&str], cwd: &Path) -> Result<()> {
        Self::run_git(args, cwd).await?;
        Ok(())
    }

    /// Read a symbolic ref (used to probe origin's HEAD).
    pub async fn symbolic_ref(path: &Path, name: &str) -> Result<String> {
        Self::run_git(&["symbolic-ref", name], path).await
    }

    /// Whether a ref resolves in this repository.
    pub async fn ref_exists(path: &Path, name: &str) -> bool {
        Self::run_git(&["rev-parse", "--verify", name], path)
            .await
            .is_ok()
    }

    /// Create a new branch from a base.
    pub async fn create_branch(path: &Path, branch: &str, base: &str) -> Result<()> {
        Self::run_git_silent(&["branch", branch, base], path).await
    }

    /// Add a worktree checking out an existing branch.
    pub async fn add_worktree(repo_path: &Path, worktree_path: &Path, branch: &str) -> Result<()> {
        let worktree_str = worktree_path.to_string_lossy();
        Self::run_git_silent(&["worktree", "add", &worktree_str, branch], repo_path).await
    }

    /// Remove a worktree.
    pub async fn remove_worktree(repo_path: &Path, worktree_path: &Path) -> Result<()> {
        let worktree_str = worktree_path.to_string_lossy();
        Self::run_git_silent(&["worktree", "remove", &worktree_str], repo_path).await
    }
}
