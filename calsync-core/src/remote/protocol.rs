//! Defines the JSON protocol used between calendar-sync and provider
//! binaries over stdin/stdout.
//!
//! One request line in, one response line out:
//!
//! ```text
//! -> {"command":"list_events","params":{"calendar_config":{...},"time_min":"...","time_max":"..."}}
//! <- {"status":"success","data":[{"id":"e1","start":"...","end":"...","summary":"..."}]}
//! ```

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::event::Event;

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListEvents,
    CreateBusyEvent,
    DeleteEvent,
}

/// Request sent to a provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent back by a provider.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

/// List events overlapping `[time_min, time_max)`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    pub calendar_config: serde_json::Map<String, serde_json::Value>,
    pub time_min: String,
    pub time_max: String,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<Event>;
    fn command() -> Command {
        Command::ListEvents
    }
}

/// Create an opaque "Busy" placeholder; responds with its id.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBusyEvent {
    pub calendar_config: serde_json::Map<String, serde_json::Value>,
    pub start: String,
    pub end: String,
    pub source_event_id: String,
    /// Text the provider stores in the placeholder's description/metadata
    pub description: String,
}

impl ProviderCommand for CreateBusyEvent {
    type Response = String;
    fn command() -> Command {
        Command::CreateBusyEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub calendar_config: serde_json::Map<String, serde_json::Value>,
    pub event_id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = Request {
            command: Command::CreateBusyEvent,
            params: serde_json::json!({"event_id": "x"}),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["command"], "create_busy_event");
        assert_eq!(json["params"]["event_id"], "x");
    }

    #[test]
    fn test_response_wire_format() {
        let ok: Response<String> =
            serde_json::from_str(r#"{"status":"success","data":"busy-1"}"#).unwrap();
        assert!(matches!(ok, Response::Success { data } if data == "busy-1"));

        let err: Response<String> =
            serde_json::from_str(r#"{"status":"error","error":"quota exceeded"}"#).unwrap();
        assert!(matches!(err, Response::Error { error } if error == "quota exceeded"));

        let unit: Response<()> = serde_json::from_str(r#"{"status":"success","data":null}"#).unwrap();
        assert!(matches!(unit, Response::Success { .. }));
    }
}
