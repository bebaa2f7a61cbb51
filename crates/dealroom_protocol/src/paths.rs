use std::path::PathBuf;
use std::sync::Once;

use crate::defaults::DEFAULT_STATE_STORE_FILE;

static CREATE_DIR_WARNED: Once = Once::new();

/// Resolve the Dealroom home directory.
///
/// Priority:
/// 1) DEALROOM_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.dealroom
pub fn dealroom_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("DEALROOM_HOME") {
        return PathBuf::from(override_path);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".dealroom");
    }
    PathBuf::from(".").join(".dealroom")
}

fn ensure_home_dir(home: &PathBuf) {
    if let Err(err) = std::fs::create_dir_all(home) {
        CREATE_DIR_WARNED.call_once(|| {
            eprintln!(
                "Warning: failed to create Dealroom home directory {}: {}. Set DEALROOM_HOME or pass --state-store.",
                home.display(),
                err
            );
        });
    }
}

/// Default state store path: ~/.dealroom/negotiation.sqlite
pub fn default_state_store_path() -> PathBuf {
    let home = dealroom_home();
    ensure_home_dir(&home);
    home.join(DEFAULT_STATE_STORE_FILE)
}

/// Default state store URL (sqlite: path).
pub fn default_state_store_url() -> String {
    format!("sqlite:{}", default_state_store_path().display())
}

/// Default logs directory: ~/.dealroom/logs
pub fn default_logs_dir() -> PathBuf {
    let home = dealroom_home();
    ensure_home_dir(&home);
    home.join("logs")
}
