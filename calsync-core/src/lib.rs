//! Core of calendar-sync: mirror busy time across calendars.
//!
//! This crate provides everything except the command line:
//! - [`Calendar`], the capability each provider implements
//! - [`MappingStore`], the durable source -> placeholder table
//! - [`sync::run_sync`], the reconciliation engine and orchestrator
//! - [`ProviderRegistry`] with the built-in `ics` and external provider types

pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod ics;
pub mod local;
pub mod registry;
pub mod remote;
pub mod store;
pub mod sync;
pub mod window;

pub use calendar::{Calendar, find_calendar};
pub use config::{CalendarConfig, Settings};
pub use error::{SyncError, SyncResult};
pub use event::{BUSY_SUMMARY, Event, EventTime, managed_by_description};
pub use registry::ProviderRegistry;
pub use store::{EventMapping, MappingKey, MappingStore};
pub use sync::{FailedCalendars, RunReport, SourceReport, SyncStats, run_sync};
pub use window::SyncWindow;
