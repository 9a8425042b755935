//! Persistent settings for the command-line tool.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use treeops_core::ProtectionPolicy;

/// Contents of `settings.toml`.
///
/// ```toml
/// [policy]
/// min_depth = 2
/// max_depth = 12
/// extra_protected_paths = ["/srv/backups"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Protection policy applied to every mutation.
    pub policy: ProtectionPolicy,
}

impl Settings {
    /// Get the default config file path.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("treeops").join("settings.toml"))
    }

    /// Load settings.
    ///
    /// An explicit path must exist and parse. The default location is
    /// optional; a broken file there is reported and ignored.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        let Some(path) = Self::config_path().filter(|p| p.exists()) else {
            return Ok(Self::default());
        };

        match Self::read(&path) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable settings");
                Ok(Self::default())
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).wrap_err_with(|| format!("Invalid settings in {}", path.display()))
    }
}
