use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::tickets::Ticket;

/// Per-project ticket persistence at `{data_dir}/tickets/{project_id}.json`.
#[derive(Debug, Clone)]
pub struct TicketStore {
    dir: PathBuf,
}

impl TicketStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("tickets"),
        }
    }

    fn file_for(&self, project_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", project_id))
    }

    pub fn load(&self, project_id: &str) -> Result<Vec<Ticket>> {
        let path = self.file_for(project_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read ticket file")?;
        serde_json::from_str(&contents).context("Failed to parse ticket file")
    }

    pub fn save(&self, project_id: &str, tickets: &[Ticket]) -> Result<()> {
        super::write_json_atomic(&self.file_for(project_id), &tickets)
    }
}
