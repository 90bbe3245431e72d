use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "gridtrial";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    pub fn config_path() -> PathBuf {
        Self::project()
            .map(|pd| pd.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("gridtrial_config.json"))
    }

    /// Log directory under $HOME/.local/state, like other terminal tools keep their state.
    pub fn log_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            Self::project().map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    /// Exports land in the working directory unless configured otherwise, so the operator
    /// finds the files next to where the session was launched.
    pub fn default_export_dir() -> PathBuf {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_a_json_file() {
        assert_eq!(
            AppDirs::config_path().extension().and_then(|e| e.to_str()),
            Some("json")
        );
    }

    #[test]
    fn log_dir_is_app_specific() {
        if let Some(dir) = AppDirs::log_dir() {
            assert!(dir.to_string_lossy().contains(APP_NAME));
        }
    }
}
