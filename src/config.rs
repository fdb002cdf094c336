use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub ui: UiConfig,
    pub git: GitConfig,
    pub agents: AgentsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Seconds between agent status polls (floor: 1)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Theme name ("dark" or "light")
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Per-field color overrides (field name -> color name or #rrggbb)
    #[serde(default)]
    pub colors: HashMap<String, String>,
}

fn default_poll_interval() -> u64 {
    1
}

fn default_theme() -> String {
    "dark".to_string()
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            theme: default_theme(),
            colors: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Prefix for branches created on first spawn (e.g. "task/")
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    /// Whether deleting a ticket also removes its worktree
    #[serde(default = "default_true")]
    pub remove_worktree_on_delete: bool,
}

fn default_branch_prefix() -> String {
    "task/".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            branch_prefix: default_branch_prefix(),
            remove_worktree_on_delete: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Name of the agent used when a ticket does not pick one
    #[serde(default = "default_agent_name")]
    pub default_agent: String,
    /// Prefix for pane session ids (also used in status-file names)
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,
    /// Configured agents by name
    #[serde(default = "default_agent_map")]
    pub map: HashMap<String, AgentConfig>,
}

fn default_agent_name() -> String {
    "claude".to_string()
}

fn default_session_prefix() -> String {
    "ok-".to_string()
}

/// Built-in agent map used when no config file exists.
fn default_agent_map() -> HashMap<String, AgentConfig> {
    let mut map = HashMap::new();
    map.insert(
        "claude".to_string(),
        AgentConfig {
            command: "claude".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            status_file: None,
            init_prompt_template: default_init_prompt(),
            resume_args: vec!["--continue".to_string()],
        },
    );
    map.insert(
        "opencode".to_string(),
        AgentConfig {
            command: "opencode".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            status_file: None,
            init_prompt_template: default_init_prompt(),
            resume_args: Vec::new(),
        },
    );
    map
}

fn default_init_prompt() -> String {
    "Work on the following task.\n\nTitle: {{title}}\n\n{{description}}\n\n\
     You are on branch {{branch_name}} (based on {{base_branch}})."
        .to_string()
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent_name(),
            session_prefix: default_session_prefix(),
            map: default_agent_map(),
        }
    }
}

/// One configured agent: the command line to spawn and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables set on top of the sanitized environment
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Agent-specific status file path relative to ~/.cache, if any
    #[serde(default)]
    pub status_file: Option<String>,
    /// Handlebars template for the initial prompt passed on spawn.
    /// Fields: title, description, branch_name, base_branch.
    #[serde(default = "default_init_prompt")]
    pub init_prompt_template: String,
    /// Arguments appended when re-spawning a previously started session
    #[serde(default)]
    pub resume_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    /// Data directory override; defaults to {data_dir}/openkanban
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_true(),
        }
    }
}

impl Config {
    /// Path to the user config file.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("openkanban").join("config.toml"))
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so openkanban works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(user_config) = Self::user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with OPENKANBAN_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("OPENKANBAN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        let config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Save the current config to the user config file.
    pub fn save(&self) -> Result<()> {
        let Some(config_path) = Self::user_config_path() else {
            bail!("No config directory available on this system");
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(&config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    /// Startup validation: refuse to run with an unusable agent map.
    pub fn validate(&self) -> Result<()> {
        if self.agents.map.is_empty() {
            bail!("Agent map is empty; configure at least one agent under [agents.map]");
        }
        for (name, agent) in &self.agents.map {
            if agent.command.trim().is_empty() {
                bail!("Agent '{}' has an empty command", name);
            }
        }
        if !self.agents.map.contains_key(&self.agents.default_agent) {
            bail!(
                "Default agent '{}' is not present in the agent map",
                self.agents.default_agent
            );
        }
        Ok(())
    }

    /// Effective poll interval with the documented 1-second floor.
    pub fn poll_interval_secs(&self) -> u64 {
        self.ui.poll_interval_secs.max(1)
    }

    /// Resolve the agent config for a ticket's agent type (falls back to the
    /// default agent).
    pub fn agent_for<'a>(&'a self, agent_type: &'a str) -> Option<(&'a str, &'a AgentConfig)> {
        let name = if agent_type.is_empty() {
            self.agents.default_agent.as_str()
        } else {
            agent_type
        };
        self.agents.map.get(name).map(|a| (name, a))
    }

    /// Data directory for stores (projects.json, tickets/, logs/).
    pub fn data_path(&self) -> PathBuf {
        if let Some(ref data) = self.paths.data {
            return PathBuf::from(data);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("openkanban")
    }

    pub fn logs_path(&self) -> PathBuf {
        self.data_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ui: UiConfig::default(),
            git: GitConfig::default(),
            agents: AgentsConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_poll_interval_floor() {
        let mut config = Config::default();
        config.ui.poll_interval_secs = 0;
        assert_eq!(config.poll_interval_secs(), 1);

        config.ui.poll_interval_secs = 5;
        assert_eq!(config.poll_interval_secs(), 5);
    }

    #[test]
    fn test_validate_rejects_empty_agent_map() {
        let mut config = Config::default();
        config.agents.map.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let mut config = Config::default();
        if let Some(agent) = config.agents.map.get_mut("claude") {
            agent.command = String::new();
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_default_agent() {
        let mut config = Config::default();
        config.agents.default_agent = "nonexistent".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_agent_for_falls_back_to_default() {
        let config = Config::default();

        let (name, _) = config.agent_for("").unwrap();
        assert_eq!(name, "claude");

        let (name, _) = config.agent_for("opencode").unwrap();
        assert_eq!(name, "opencode");

        assert!(config.agent_for("unknown").is_none());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.agents.default_agent, config.agents.default_agent);
        assert_eq!(parsed.ui.poll_interval_secs, config.ui.poll_interval_secs);
    }
}
