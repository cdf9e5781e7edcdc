use directories::ProjectDirs;
use std::ffi::OsString;
use std::path::PathBuf;

const APP_NAME: &str = "commute-pro";
const DB_FILE: &str = "commutes.db";
const CONFIG_FILE: &str = "config.json";

/// Where the commute database and config file live when no path is given
pub struct AppDirs;

impl AppDirs {
    /// `$XDG_STATE_HOME/commute-pro/commutes.db`, then `~/.local/state/...`,
    /// then the platform's local data dir
    pub fn db_path() -> Option<PathBuf> {
        state_dir(std::env::var_os("XDG_STATE_HOME"), std::env::var_os("HOME"))
            .or_else(|| ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf()))
            .map(|dir| dir.join(DB_FILE))
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|pd| pd.config_dir().join(CONFIG_FILE))
    }
}

/// Empty variables count as unset
fn state_dir(xdg_state_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    let non_empty = |v: Option<OsString>| v.filter(|s| !s.is_empty()).map(PathBuf::from);

    non_empty(xdg_state_home)
        .or_else(|| non_empty(home).map(|h| h.join(".local").join("state")))
        .map(|base| base.join(APP_NAME))
}
