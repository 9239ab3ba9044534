pub mod protocol;
pub mod provider;

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::calendar::Calendar;
use crate::config::CalendarConfig;
use crate::error::{SyncError, SyncResult};
use crate::event::{Event, managed_by_description};
use crate::remote::protocol::{CreateBusyEvent, DeleteEvent, ListEvents};
use crate::remote::provider::Provider;
use crate::window::SyncWindow;

/// A calendar served by an external provider binary (Google, Outlook, CalDAV...).
///
/// The provider process receives every non-reserved key of the calendar's
/// config entry, so credentials and account names live there.
#[derive(Debug, Clone)]
pub struct ExternalCalendar {
    id: String,
    only_source: bool,
    provider: Provider,
    config: serde_json::Map<String, serde_json::Value>,
}

impl ExternalCalendar {
    pub fn new(config: &CalendarConfig, provider: Provider) -> Self {
        ExternalCalendar {
            id: config.id.clone(),
            only_source: config.onlysource,
            provider,
            config: config.params_json(),
        }
    }

    /// Build from a config entry.
    ///
    /// `command` overrides the binary lookup; `timeout_secs` overrides the
    /// per-call timeout.
    pub fn from_config(config: &CalendarConfig) -> SyncResult<Self> {
        let provider = match config.param_str("command") {
            Some(command) => {
                let expanded = shellexpand::tilde(command).to_string();
                Provider::with_binary(&config.kind, expanded)
            }
            None => Provider::from_name(&config.kind)?,
        };

        let provider = match config.params.get("timeout_secs") {
            None => provider,
            Some(value) => {
                let secs = value
                    .as_integer()
                    .filter(|s| *s > 0)
                    .and_then(|s| u64::try_from(s).ok())
                    .ok_or_else(|| {
                        SyncError::Config(format!(
                            "Calendar '{}': timeout_secs must be a positive integer",
                            config.id
                        ))
                    })?;
                provider.with_timeout(Duration::from_secs(secs))
            }
        };

        Ok(ExternalCalendar::new(config, provider))
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Calendar for ExternalCalendar {
    fn id(&self) -> &str {
        &self.id
    }

    fn only_source(&self) -> bool {
        self.only_source
    }

    fn list_events(&self, window: &SyncWindow) -> SyncResult<Vec<Event>> {
        self.provider
            .call(ListEvents {
                calendar_config: self.config.clone(),
                time_min: window.time_min_iso(),
                time_max: window.time_max_iso(),
            })
            .map_err(|e| SyncError::fetch(&self.id, e))
    }

    fn create_busy_event(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source_event_id: &str,
    ) -> SyncResult<String> {
        let id = self
            .provider
            .call(CreateBusyEvent {
                calendar_config: self.config.clone(),
                start: iso(start),
                end: iso(end),
                source_event_id: source_event_id.to_string(),
                description: managed_by_description(source_event_id),
            })
            .map_err(|e| SyncError::create(&self.id, e))?;

        if id.is_empty() {
            return Err(SyncError::create(&self.id, "provider returned an empty event id"));
        }
        Ok(id)
    }

    fn delete_event(&self, event_id: &str) -> SyncResult<()> {
        self.provider
            .call(DeleteEvent {
                calendar_config: self.config.clone(),
                event_id: event_id.to_string(),
            })
            .map_err(|e| SyncError::delete(&self.id, event_id, e))
    }
}
