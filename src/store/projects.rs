use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A registered repository that tickets can belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub repo_path: PathBuf,
}

impl Project {
    pub fn new(name: &str, repo_path: &Path) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            repo_path: repo_path.to_path_buf(),
        }
    }
}

/// On-disk registry of projects at `{data_dir}/projects.json`.
#[derive(Debug)]
pub struct ProjectRegistry {
    path: PathBuf,
    projects: Vec<Project>,
}

impl ProjectRegistry {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("projects.json");
        let projects = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read project registry")?;
            serde_json::from_str(&contents).context("Failed to parse project registry")?
        } else {
            Vec::new()
        };
        Ok(Self { path, projects })
    }

    pub fn save(&self) -> Result<()> {
        super::write_json_atomic(&self.path, &self.projects)
    }

    pub fn all(&self) -> &[Project] {
        &self.projects
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn add(&mut self, project: Project) -> Result<()> {
        self.projects.push(project);
        self.save()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
