//! Configuration for a calendar-sync run.
//!
//! Settings come from a TOML file layered under `CALSYNC_*` environment
//! variables, e.g. `CALSYNC_DB_PATH=/data/calendar_sync.db`.

mod calendar_config;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ::config::{Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};
use crate::window::{DEFAULT_SYNC_WINDOW_DAYS, MAX_SYNC_WINDOW_DAYS};

pub use calendar_config::CalendarConfig;

const ENV_PREFIX: &str = "CALSYNC";

fn default_sync_window_days() -> u32 {
    DEFAULT_SYNC_WINDOW_DAYS
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("calsync"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("calendar_sync.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Days ahead of now to mirror
    #[serde(default = "default_sync_window_days")]
    pub sync_window_days: u32,

    /// SQLite file holding the event mappings
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_log: bool,

    /// Calendars in declaration order; this is also the order they are synced in
    #[serde(default)]
    pub calendars: Vec<CalendarConfig>,
}

impl Settings {
    /// Default config location (~/.config/calsync/config.toml)
    pub fn default_path() -> SyncResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
            .join("calsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Load settings from `path`, with `CALSYNC_*` environment overrides.
    pub fn load(path: &Path) -> SyncResult<Self> {
        if !path.exists() {
            return Err(SyncError::Config(format!(
                "Config file not found at {}\n\n\
                Create it with at least one calendar:\n\n\
                [[calendars]]\n\
                id = \"work\"\n\
                type = \"ics\"\n\
                path = \"~/calendars/work\"",
                path.display()
            )));
        }

        let builder = ::config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        Self::build(builder)
    }

    /// Parse settings from TOML text, without environment overrides.
    pub fn from_toml_str(content: &str) -> SyncResult<Self> {
        let builder =
            ::config::Config::builder().add_source(File::from_str(content, FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: ::config::ConfigBuilder<::config::builder::DefaultState>) -> SyncResult<Self> {
        let settings: Settings = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SyncError::Config(e.to_string()))?;

        settings.expanded().validate()
    }

    fn expanded(mut self) -> Self {
        let raw = self.db_path.to_string_lossy().to_string();
        self.db_path = PathBuf::from(shellexpand::tilde(&raw).into_owned());
        self
    }

    fn validate(self) -> SyncResult<Self> {
        if self.sync_window_days == 0 {
            return Err(SyncError::Config("sync_window_days must be at least 1".into()));
        }
        if self.sync_window_days > MAX_SYNC_WINDOW_DAYS {
            return Err(SyncError::Config(format!(
                "sync_window_days must be at most {MAX_SYNC_WINDOW_DAYS}"
            )));
        }

        if self.calendars.is_empty() {
            return Err(SyncError::Config("No calendars configured".into()));
        }

        let mut seen = HashSet::new();
        for calendar in &self.calendars {
            if calendar.id.trim().is_empty() {
                return Err(SyncError::Config("Calendar id must not be empty".into()));
            }
            if !seen.insert(calendar.id.as_str()) {
                return Err(SyncError::Config(format!(
                    "Calendar id '{}' is configured more than once",
                    calendar.id
                )));
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
sync_window_days = 7
db_path = "/tmp/calsync-test.db"
json_log = true

[[calendars]]
id = "work"
type = "ics"
path = "~/calendars/work"

[[calendars]]
id = "personal"
type = "google"
onlysource = true
google_account = "me@example.com"
"#;

    #[test]
    fn test_parse_settings() {
        let settings = Settings::from_toml_str(SAMPLE).unwrap();

        assert_eq!(settings.sync_window_days, 7);
        assert_eq!(settings.db_path, PathBuf::from("/tmp/calsync-test.db"));
        assert!(settings.json_log);
        assert_eq!(settings.log_level, "info");

        let ids: Vec<_> = settings.calendars.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["work", "personal"]);

        let work = &settings.calendars[0];
        assert_eq!(work.kind, "ics");
        assert!(!work.onlysource);
        assert_eq!(work.param_str("path"), Some("~/calendars/work"));

        let personal = &settings.calendars[1];
        assert!(personal.onlysource);
        assert_eq!(personal.param_str("google_account"), Some("me@example.com"));
        assert!(!personal.params.contains_key("onlysource"));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str(
            r#"
[[calendars]]
id = "work"
type = "ics"
path = "/tmp/work"
"#,
        )
        .unwrap();

        assert_eq!(settings.sync_window_days, DEFAULT_SYNC_WINDOW_DAYS);
        assert!(!settings.json_log);
        assert!(settings.db_path.ends_with("calendar_sync.db"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = Settings::from_toml_str(
            r#"
[[calendars]]
id = "work"
type = "ics"

[[calendars]]
id = "work"
type = "google"
"#,
        );
        assert!(matches!(result, Err(SyncError::Config(msg)) if msg.contains("more than once")));
    }

    #[test]
    fn test_rejects_empty_calendar_list() {
        let result = Settings::from_toml_str("sync_window_days = 3");
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_window() {
        let result = Settings::from_toml_str(
            r#"
sync_window_days = 0

[[calendars]]
id = "work"
type = "ics"
"#,
        );
        assert!(matches!(result, Err(SyncError::Config(msg)) if msg.contains("sync_window_days")));
    }

    #[test]
    fn test_rejects_oversized_window() {
        let result = Settings::from_toml_str(
            r#"
sync_window_days = 4294967295

[[calendars]]
id = "work"
type = "ics"
"#,
        );
        assert!(matches!(result, Err(SyncError::Config(msg)) if msg.contains("at most")));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(SyncError::Config(msg)) if msg.contains("not found")));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.calendars.len(), 2);
    }

    #[test]
    fn test_params_json() {
        let settings = Settings::from_toml_str(SAMPLE).unwrap();
        let params = settings.calendars[1].params_json();
        assert_eq!(params["google_account"], "me@example.com");
        assert!(!params.contains_key("id"));
    }
}
