use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::Severity;

/// Name of the tool configuration file looked up in the project tree.
pub const CONFIG_FILE_NAME: &str = ".layerlint.toml";

/// Top-level configuration from `.layerlint.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    /// Directory of the file this config was loaded from.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Source file extensions to analyse.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// A file is skipped when its path contains any of these markers.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    /// Rule document. A relative path is resolved against the directory of
    /// the config file, or the project root when no file was loaded.
    #[serde(default = "default_rules_path")]
    pub rules: PathBuf,
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_exclude_dirs() -> Vec<String> {
    vec![
        ".git".to_string(),
        "__pycache__".to_string(),
        "venv".to_string(),
        "cache".to_string(),
    ]
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("architecture_rules.yaml")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            rules: default_rules_path(),
        }
    }
}

/// Rule selection and run outcome policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_fail_on")]
    pub fail_on: Severity,
    /// Validation checks to run; empty runs all of them.
    #[serde(default)]
    pub checks: Vec<String>,
}

fn default_fail_on() -> Severity {
    Severity::Error
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            fail_on: default_fail_on(),
            checks: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a `.layerlint.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let mut config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `layerlint init` to create a valid config file",
                path.display()
            )
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Load from `.layerlint.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!("Using config: {}", config_path.display());
                        config
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Rule document path: absolute as given, otherwise relative to the
    /// config file's directory, or to `project_root` for default config.
    pub fn rules_path(&self, project_root: &Path) -> PathBuf {
        if self.project.rules.is_absolute() {
            return self.project.rules.clone();
        }
        self.base_dir
            .as_deref()
            .unwrap_or(project_root)
            .join(&self.project.rules)
    }

    /// Generate default TOML content for `layerlint init`.
    pub fn default_toml() -> String {
        r#"# layerlint - Architecture Rule Configuration

[project]
extensions = ["py"]
# Files whose path contains any of these markers are skipped
exclude_dirs = [".git", "__pycache__", "venv", "cache"]
# Rule document (layers, thresholds, validation checks)
rules = "architecture_rules.yaml"

[rules]
# Severity levels: "error", "warning", "info"
fail_on = "error"
# Validation checks to run; empty runs all of them
checks = []
"#
        .to_string()
    }
}
