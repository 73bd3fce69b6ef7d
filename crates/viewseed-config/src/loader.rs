use std::path::{Path, PathBuf};

use tracing::debug;
use viewseed_common::{Error, Result};

use crate::model::AppConfig;

const CONFIG_DIR_NAME: &str = ".viewseed";

/// Candidate file names, checked in order.
const CONFIG_FILES: &[&str] = &["config.yml", "config.yaml", "config.toml"];

/// Locates and parses the viewseed config file.
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader rooted at `~/.viewseed`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("could not determine home directory".into()))?;
        Ok(Self::with_dir(home.join(CONFIG_DIR_NAME)))
    }

    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Directory for database files: `data_dir` from the config, or `<config_dir>/data`.
    pub fn data_dir(&self, config: &AppConfig) -> PathBuf {
        config
            .data_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.join("data"))
    }

    /// First existing config file in the config dir.
    pub fn find(&self) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| self.config_dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load the first config file found in the config dir, or defaults if there is none.
    pub fn load(&self) -> Result<AppConfig> {
        match self.find() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!(
                    "no config file in {}, using defaults",
                    self.config_dir.display()
                );
                Ok(AppConfig::default())
            }
        }
    }

    /// Load an explicit config file. The format is chosen by extension.
    pub fn load_from(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = parse_config(&contents, ext)?;
        config.validate()?;

        debug!("parsed config {}", path.display());
        Ok(config)
    }
}

fn parse_config(contents: &str, ext: &str) -> Result<AppConfig> {
    match ext {
        "yml" | "yaml" => serde_yaml::from_str(contents)
            .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
        "toml" => {
            toml::from_str(contents).map_err(|e| Error::Config(format!("TOML parse error: {e}")))
        }
        other => Err(Error::Config(format!(
            "unsupported config extension: {other}"
        ))),
    }
}
