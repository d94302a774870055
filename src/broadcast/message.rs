//! Wire messages exchanged over `/ws`.
//!
//! Client → server:
//! - `{"type": "subscribe", "channel": "transactions"}`
//! - `{"type": "unsubscribe", "channel": "transactions"}`
//! - `{"type": "ping"}`
//!
//! Server → client:
//! - `{"type": "data", "channel": "transactions", "data": {...}, "timestamp": "2024-01-15T10:30:00.000Z"}`
//! - `{"type": "pong", "timestamp": "..."}`

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Ping,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Data {
        channel: String,
        data: Value,
        timestamp: String,
    },
    Pong {
        timestamp: String,
    },
}

impl ServerMessage {
    pub fn data(channel: impl Into<String>, data: Value) -> Self {
        ServerMessage::Data {
            channel: channel.into(),
            data,
            timestamp: now_iso(),
        }
    }

    pub fn pong() -> Self {
        ServerMessage::Pong { timestamp: now_iso() }
    }

    pub fn to_json(&self) -> String {
        // Only strings and JSON values inside: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_parse_by_tag() {
        let m: ClientMessage = serde_json::from_str(r#"{"type":"subscribe","channel":"metrics"}"#).unwrap();
        assert_eq!(m, ClientMessage::Subscribe { channel: "metrics".into() });
        let m: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(m, ClientMessage::Ping);
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"shout","channel":"x"}"#).is_err());
    }

    #[test]
    fn data_message_wraps_payload() {
        let v: Value = serde_json::from_str(&ServerMessage::data("metrics", json!({"tps": 12})).to_json()).unwrap();
        assert_eq!(v["type"], "data");
        assert_eq!(v["channel"], "metrics");
        assert_eq!(v["data"], json!({"tps": 12}));
        let ts = v["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
