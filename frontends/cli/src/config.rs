use anyhow::{Context, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use canvas_api::{CanvasSettings, EngineLimits};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "CANVAS_CONFIG";

/// Tool configuration, read from YAML
///
/// ```yaml
/// limits:
///   max_nodes: 5000
/// canvas:
///   minHeightPx: 1000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Bounds applied while reading documents
    pub limits: EngineLimits,
    /// Canvas for stored documents that carry none
    pub canvas: CanvasSettings,
}

impl CanvasConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// The configured canvas must be one a stored document could carry,
    /// or documents written with it would not read back.
    pub fn validate(&self) -> Result<()> {
        self.canvas.validate(&self.limits)?;
        Ok(())
    }

    /// Load from the first config file found, or the defaults.
    ///
    /// Lookup order: `explicit`, then `$CANVAS_CONFIG`, then
    /// `~/.config/canvas/config.yaml` if it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        match locate(explicit, std::env::var_os(CONFIG_ENV), home) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load_from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Resolve the config path. Explicit and environment paths are returned
/// even if missing so that a typo fails loudly; the home default only when
/// present.
pub fn locate(explicit: Option<&Path>, env: Option<OsString>, home: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let mut path = home?;
    path.push(".config");
    path.push("canvas");
    path.push("config.yaml");
    path.is_file().then_some(path)
}
