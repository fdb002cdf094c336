//! Persistent JSON stores: the project registry and per-project ticket files.
//!
//! All writes go through a temp-file-plus-rename so a crashed save never
//! leaves a half-written file behind.

mod projects;
mod tickets;

pub use projects::{Project, ProjectRegistry};
pub use tickets::TicketStore;

use anyhow::{Context, Result};
use std::path::Path;

/// Serialize `value` to pretty JSON and atomically replace `path` with it.
pub(crate) fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .context("Store path has no parent directory")?;
    std::fs::create_dir_all(parent).context("Failed to create store directory")?;

    let contents = serde_json::to_string_pretty(value).context("Failed to serialize store")?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents).context("Failed to write temp store file")?;
    std::fs::rename(&tmp, path).context("Failed to replace store file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_json_atomic_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("out.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<u32> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
        // No temp file left behind
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_write_json_atomic_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.json");

        write_json_atomic(&path, &"first").unwrap();
        write_json_atomic(&path, &"second").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "\"second\"");
    }
}
