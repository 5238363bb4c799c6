//! Frame types for the realtime WebSocket.
//!
//! The endpoint speaks the Phoenix channel protocol (v1, JSON): every frame
//! is `{topic, event, payload, ref}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::RawChange;

pub const PHX_JOIN: &str = "phx_join";
pub const PHX_LEAVE: &str = "phx_leave";
pub const PHX_REPLY: &str = "phx_reply";
pub const PHX_ERROR: &str = "phx_error";
pub const PHX_CLOSE: &str = "phx_close";
pub const HEARTBEAT: &str = "heartbeat";
pub const POSTGRES_CHANGES: &str = "postgres_changes";

/// Topic heartbeats are sent on.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// One channel frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    /// Join request subscribing `topic` to row changes of `table`.
    pub fn join(
        topic: &str,
        table: &str,
        filter: Option<String>,
        access_token: &str,
        reference: u64,
    ) -> Self {
        let payload = JoinPayload {
            config: JoinConfig {
                postgres_changes: vec![PostgresChangesConfig {
                    event: "*".to_string(),
                    schema: "public".to_string(),
                    table: table.to_string(),
                    filter,
                }],
            },
            access_token: access_token.to_string(),
        };

        Self {
            topic: topic.to_string(),
            event: PHX_JOIN.to_string(),
            // JoinPayload only holds strings, so this cannot fail
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
            reference: Some(reference.to_string()),
        }
    }

    pub fn leave(topic: &str, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: PHX_LEAVE.to_string(),
            payload: Value::Object(Default::default()),
            reference: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: HEARTBEAT.to_string(),
            payload: Value::Object(Default::default()),
            reference: Some(reference.to_string()),
        }
    }

    /// Encode message as JSON text.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode message from JSON text.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct JoinPayload {
    config: JoinConfig,
    access_token: String,
}

#[derive(Debug, Clone, Serialize)]
struct JoinConfig {
    postgres_changes: Vec<PostgresChangesConfig>,
}

#[derive(Debug, Clone, Serialize)]
struct PostgresChangesConfig {
    event: String,
    schema: String,
    table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
}

/// Payload of a `phx_reply` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyPayload {
    pub status: String,
    #[serde(default)]
    pub response: Value,
}

impl ReplyPayload {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// The server's reason for a rejected request, when it gave one.
    pub fn reason(&self) -> String {
        self.response
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.status.clone())
    }
}

/// Payload of a `postgres_changes` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresChangesPayload {
    pub data: ChangeData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeData {
    #[serde(rename = "type")]
    pub change_type: String,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

impl From<ChangeData> for RawChange {
    fn from(data: ChangeData) -> Self {
        RawChange::new(data.change_type, data.record, data.old_record)
    }
}
