use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use crate::session::{DEFAULT_GRID_COLS, DEFAULT_GRID_ROWS};

/// Operator defaults remembered between runs. Countdown and inter-trial timing are fixed and
/// deliberately absent here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub output_dir: Option<PathBuf>,
    pub last_participant_id: Option<u32>,
    pub survey: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_rows: DEFAULT_GRID_ROWS,
            grid_cols: DEFAULT_GRID_COLS,
            output_dir: None,
            last_participant_id: None,
            survey: true,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_load(&self) -> Result<Config> {
        let bytes = fs::read(&self.path).map_err(|e| Error::io(&self.path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Config {
            path: self.path.clone(),
            details: e.to_string(),
        })
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Falls back to defaults when the file is missing or unreadable.
    fn load(&self) -> Config {
        match self.try_load() {
            Ok(cfg) => cfg,
            Err(Error::Io { .. }) => Config::default(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring config file");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(|e| Error::Config {
            path: self.path.clone(),
            details: e.to_string(),
        })?;
        fs::write(&self.path, data).map_err(|e| Error::io(&self.path, e))
    }
}
