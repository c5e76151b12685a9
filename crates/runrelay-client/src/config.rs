//! Run-level configuration: a TOML file overlaid with `RUNRELAY_*`
//! environment variables (the environment wins). Consumed once at launch
//! start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use runrelay_types::LaunchAttribute;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    pub endpoint: Option<String>,
    pub project: Option<String>,
    pub api_key: Option<String>,
    /// Launch name.
    pub launch: Option<String>,
    pub launch_doc: Option<String>,
    /// `key:value` tokens attached to the launch.
    pub launch_attributes: Vec<String>,
    /// Pre-created launch to attach to; when set, the publisher neither
    /// starts nor finishes the launch.
    pub launch_id: Option<String>,
    pub mode: Option<String>,
    pub rerun: bool,
    pub rerun_of: Option<String>,
    /// `--remove-keywords` directives, format per the filter registry.
    pub remove_keywords: Vec<String>,
    /// `--flatten-keywords` directives.
    pub flatten_keywords: Vec<String>,
    pub attach_log: bool,
    pub attach_report: bool,
    pub attach_xunit: bool,
}

impl RunConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the configuration file path based on priority:
    /// 1. RUNRELAY_CONFIG environment variable
    /// 2. XDG config directory
    /// 3. ~/.runrelay.toml (fallback for systems without XDG)
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("RUNRELAY_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        if let Some(config_dir) = dirs::config_dir() {
            return Ok(config_dir.join("runrelay").join("config.toml"));
        }

        if let Some(home) = std::env::var_os("HOME") {
            return Ok(PathBuf::from(home).join(".runrelay.toml"));
        }

        Err(Error::Config(
            "could not determine configuration path: no HOME or XDG config directory found"
                .to_string(),
        ))
    }

    /// Overlay `RUNRELAY_*` environment variables onto this configuration.
    pub fn apply_env(&mut self) {
        if let Some(value) = env_var("RUNRELAY_ENDPOINT") {
            self.endpoint = Some(value);
        }
        if let Some(value) = env_var("RUNRELAY_PROJECT") {
            self.project = Some(value);
        }
        if let Some(value) = env_var("RUNRELAY_API_KEY") {
            self.api_key = Some(value);
        }
        if let Some(value) = env_var("RUNRELAY_LAUNCH") {
            self.launch = Some(value);
        }
        if let Some(value) = env_var("RUNRELAY_LAUNCH_DOC") {
            self.launch_doc = Some(value);
        }
        if let Some(value) = env_var("RUNRELAY_LAUNCH_ATTRIBUTES") {
            self.launch_attributes = split_tokens(&value);
        }
        if let Some(value) = env_var("RUNRELAY_LAUNCH_UUID") {
            self.launch_id = Some(value);
        }
        if let Some(value) = env_var("RUNRELAY_MODE") {
            self.mode = Some(value);
        }
        if let Some(value) = env_var("RUNRELAY_RERUN") {
            self.rerun = parse_bool(&value);
        }
        if let Some(value) = env_var("RUNRELAY_RERUN_OF") {
            self.rerun_of = Some(value);
        }
        if let Some(value) = env_var("RUNRELAY_REMOVE_KEYWORDS") {
            self.remove_keywords = split_tokens(&value);
        }
        if let Some(value) = env_var("RUNRELAY_FLATTEN_KEYWORDS") {
            self.flatten_keywords = split_tokens(&value);
        }
        if let Some(value) = env_var("RUNRELAY_ATTACH_LOG") {
            self.attach_log = parse_bool(&value);
        }
        if let Some(value) = env_var("RUNRELAY_ATTACH_REPORT") {
            self.attach_report = parse_bool(&value);
        }
        if let Some(value) = env_var("RUNRELAY_ATTACH_XUNIT") {
            self.attach_xunit = parse_bool(&value);
        }
    }

    /// Reporting to a real backend needs every credential present; a run
    /// with an incomplete configuration can still be captured locally.
    pub fn enabled(&self) -> bool {
        [&self.endpoint, &self.project, &self.launch, &self.api_key]
            .iter()
            .all(|field| field.as_deref().is_some_and(|value| !value.is_empty()))
    }

    /// Launch attribute tokens parsed into records.
    pub fn launch_attribute_records(&self) -> Vec<LaunchAttribute> {
        self.launch_attributes
            .iter()
            .map(|token| LaunchAttribute::parse(token))
            .collect()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn split_tokens(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
