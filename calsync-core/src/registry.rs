//! Maps `type` strings from the config file to calendar constructors.

use std::collections::HashMap;

use crate::calendar::Calendar;
use crate::config::CalendarConfig;
use crate::error::{SyncError, SyncResult};
use crate::local::IcsDirCalendar;
use crate::remote::ExternalCalendar;

/// Builds a calendar from its config entry.
pub type CalendarFactory = fn(&CalendarConfig) -> SyncResult<Box<dyn Calendar>>;

/// Provider types served by an external `calsync-provider-{type}` binary.
pub const EXTERNAL_PROVIDER_TYPES: &[&str] = &["google", "outlook", "caldav"];

/// Registry of calendar types.
///
/// Unknown types are a configuration error, never a silent skip.
pub struct ProviderRegistry {
    factories: HashMap<String, CalendarFactory>,
}

fn ics_dir(config: &CalendarConfig) -> SyncResult<Box<dyn Calendar>> {
    Ok(Box::new(IcsDirCalendar::from_config(config)?))
}

fn external(config: &CalendarConfig) -> SyncResult<Box<dyn Calendar>> {
    Ok(Box::new(ExternalCalendar::from_config(config)?))
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ProviderRegistry {
            factories: HashMap::new(),
        }
    }

    /// The built-in types: `ics` plus the external provider types.
    pub fn builtin() -> Self {
        let mut registry = ProviderRegistry::new();
        registry.register("ics", ics_dir);
        for kind in EXTERNAL_PROVIDER_TYPES {
            registry.register(kind, external);
        }
        registry
    }

    /// Register (or replace) a factory for `kind`.
    pub fn register(&mut self, kind: &str, factory: CalendarFactory) {
        self.factories.insert(kind.to_string(), factory);
    }

    pub fn knows(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn build(&self, config: &CalendarConfig) -> SyncResult<Box<dyn Calendar>> {
        let factory = self
            .factories
            .get(&config.kind)
            .ok_or_else(|| SyncError::UnknownProviderType(config.kind.clone()))?;
        factory(config)
    }

    /// Build every configured calendar, in config order.
    ///
    /// Fails on the first entry that cannot be built, before any sync starts.
    pub fn load_calendars(&self, configs: &[CalendarConfig]) -> SyncResult<Vec<Box<dyn Calendar>>> {
        configs.iter().map(|config| self.build(config)).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        ProviderRegistry::builtin()
    }
}
