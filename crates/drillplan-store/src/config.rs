//! Workspace configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level drillplan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillplanConfig {
    /// Catalog file or directory of catalog files.
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,
    /// Users and classes.
    #[serde(default = "default_profiles")]
    pub profiles: PathBuf,
    /// Attempt records and paper compositions.
    #[serde(default = "default_journal")]
    pub journal: PathBuf,
    /// Subject used when a command does not name one.
    #[serde(default = "default_subject")]
    pub default_subject: String,
    /// Fixed seed for new-item shuffling; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_catalog() -> PathBuf {
    PathBuf::from("catalog.toml")
}
fn default_profiles() -> PathBuf {
    PathBuf::from("profiles.toml")
}
fn default_journal() -> PathBuf {
    PathBuf::from("journal.json")
}
fn default_subject() -> String {
    "ch_zici".to_string()
}

impl Default for DrillplanConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            profiles: default_profiles(),
            journal: default_journal(),
            default_subject: default_subject(),
            seed: None,
        }
    }
}

impl DrillplanConfig {
    /// Expand `${VAR}` references and anchor relative paths at `base`.
    fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: &Path| {
            let expanded = PathBuf::from(resolve_env_vars(&p.to_string_lossy()));
            if expanded.is_relative() {
                base.join(expanded)
            } else {
                expanded
            }
        };
        self.catalog = resolve(&self.catalog);
        self.profiles = resolve(&self.profiles);
        self.journal = resolve(&self.journal);
        self
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `drillplan.toml` in the current directory
/// 2. `~/.config/drillplan/config.toml`
///
/// Relative paths inside a config file are relative to that file. Without any
/// config file the defaults are relative to the current directory.
pub fn load_config() -> Result<DrillplanConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<DrillplanConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("drillplan.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path().map(|home| home.join("config.toml")).filter(|p| p.exists())
            }
        }
    };

    let Some(path) = config_path else {
        tracing::debug!("no config file found, using defaults");
        return Ok(DrillplanConfig::default().resolve_paths(Path::new(".")));
    };

    let content =
        std::fs::read_to_string(&path).with_context(|| format!("failed to read config: {}", path.display()))?;
    let config = toml::from_str::<DrillplanConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    tracing::debug!("loaded config from {}", path.display());
    Ok(config.resolve_paths(base))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("drillplan"))
}
