//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Default base URL of the timetable REST API
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Directory under the home directory holding config and preferences
pub const CONFIG_DIR_NAME: &str = ".timetable-console";

/// Config file name inside [`CONFIG_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Preferences file name inside [`CONFIG_DIR_NAME`]
pub const PREFS_FILE_NAME: &str = "prefs.yaml";

/// Log file name
pub const LOG_FILE_NAME: &str = "timetable-console.log";

/// Client-level request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Label of the empty option in reference selectors
pub const NONE_OPTION_LABEL: &str = "— none —";

/// Application name
pub const APP_NAME: &str = "Timetable Console";
