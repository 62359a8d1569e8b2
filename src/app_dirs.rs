use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "keyreplay";

/// Where recordings and settings live on disk
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/keyreplay/recordings.db`, or the platform data dir without `$HOME`
    pub fn db_path() -> Option<PathBuf> {
        let state_dir = match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".local").join("state").join(APP_NAME),
            None => Self::project()?.data_local_dir().to_path_buf(),
        };
        Some(state_dir.join("recordings.db"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.config_dir().join("config.json"))
    }

    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }
}
