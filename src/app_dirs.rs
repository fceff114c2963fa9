use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("replog"),
            )
        } else {
            ProjectDirs::from("", "", "replog").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    /// Active-session snapshot (removed when the session finishes).
    pub fn session_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("session.json"))
    }

    /// Finished-session history database.
    pub fn history_db_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("history.db"))
    }
}
