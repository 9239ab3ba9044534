//! Per-calendar configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// One `[[calendars]]` entry.
///
/// Keys other than `id`, `type` and `onlysource` are provider parameters
/// (paths, account names, credentials) and are handed to the provider as-is.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CalendarConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub onlysource: bool,
    #[serde(flatten)]
    pub params: HashMap<String, toml::Value>,
}

impl CalendarConfig {
    pub fn new(id: &str, kind: &str) -> Self {
        CalendarConfig {
            id: id.to_string(),
            kind: kind.to_string(),
            onlysource: false,
            params: HashMap::new(),
        }
    }

    /// A string parameter, if set.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    /// A string parameter the provider cannot work without.
    pub fn require_str(&self, key: &str) -> SyncResult<&str> {
        self.param_str(key).ok_or_else(|| {
            SyncError::Config(format!(
                "Calendar '{}' (type '{}') requires a string '{}' setting",
                self.id, self.kind, key
            ))
        })
    }

    /// Provider parameters as a JSON object.
    pub fn params_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.params
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect()
    }
}
