use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "case-timeline";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application data directory: `~/.case-timeline/`, or `./.case-timeline/`
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(format!(".{APP_NAME}"))
}

/// SQLite database used when neither `--db` nor `CASE_TIMELINE_DB` is set.
pub fn default_database_path() -> PathBuf {
    app_data_dir().join("cases.db")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "case_timeline_lib=info,case_timeline=info"
}
