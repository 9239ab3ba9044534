//! Error types for calendar-sync.

use thiserror::Error;

/// Errors that can occur while mirroring busy time between calendars.
///
/// The first four variants are the reconciliation taxonomy: the engine decides
/// whether to skip a source, mark a target failed, or just log, based on which
/// of them a capability or the store returned.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to fetch events from '{calendar}': {reason}")]
    Fetch { calendar: String, reason: String },

    #[error("Failed to create busy event in '{calendar}': {reason}")]
    Create { calendar: String, reason: String },

    #[error("Failed to delete event {event_id} in '{calendar}': {reason}")]
    Delete {
        calendar: String,
        event_id: String,
        reason: String,
    },

    #[error("Mapping store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Mapping not found: {source_calendar}/{source_event_id} -> {target_calendar}")]
    MappingNotFound {
        source_calendar: String,
        source_event_id: String,
        target_calendar: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown calendar type '{0}'")]
    UnknownProviderType(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    pub fn fetch(calendar: &str, reason: impl ToString) -> Self {
        SyncError::Fetch {
            calendar: calendar.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn create(calendar: &str, reason: impl ToString) -> Self {
        SyncError::Create {
            calendar: calendar.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn delete(calendar: &str, event_id: &str, reason: impl ToString) -> Self {
        SyncError::Delete {
            calendar: calendar.to_string(),
            event_id: event_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for calendar-sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
