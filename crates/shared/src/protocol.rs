//! Realtime wire protocol: message kinds, inbound decoding and control frames.
//!
//! Every frame is a JSON object tagged by a `type` field. Inbound
//! notifications carry a kind-specific `payload`:
//!
//! ```json
//! { "type": "TOPIC_STATUS_CHANGE",
//!   "payload": { "topicId": "t-1", "oldStatus": "SEEDING", "newStatus": "ACTIVE",
//!                "timestamp": "2024-05-01T12:00:00Z" } }
//! ```
//!
//! `PING`/`PONG` are liveness control frames and carry no payload.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::{CommonGroundUpdatePayload, NewResponsePayload, TopicStatusChangePayload};

/// Type tag of the outbound liveness frame
pub const PING_TYPE: &str = "PING";
/// Type tag of the inbound liveness acknowledgement
pub const PONG_TYPE: &str = "PONG";

/// Encoded outbound liveness frame
pub const PING_FRAME: &str = r#"{"type":"PING"}"#;

/// Routing key for inbound notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    NewResponse,
    CommonGroundUpdate,
    TopicStatusChange,
    ResponseDeleted,
    ResponseUpdated,
}

impl MessageKind {
    /// Every kind a listener can subscribe to.
    pub const ALL: [MessageKind; 5] = [
        MessageKind::NewResponse,
        MessageKind::CommonGroundUpdate,
        MessageKind::TopicStatusChange,
        MessageKind::ResponseDeleted,
        MessageKind::ResponseUpdated,
    ];

    /// The wire tag for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::NewResponse => "NEW_RESPONSE",
            MessageKind::CommonGroundUpdate => "COMMON_GROUND_UPDATE",
            MessageKind::TopicStatusChange => "TOPIC_STATUS_CHANGE",
            MessageKind::ResponseDeleted => "RESPONSE_DELETED",
            MessageKind::ResponseUpdated => "RESPONSE_UPDATED",
        }
    }

    /// Look up a kind by its wire tag. Control tags such as `PONG` are not kinds.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded inbound notification.
///
/// `RESPONSE_DELETED` and `RESPONSE_UPDATED` payloads are owned by the server
/// and kept as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    NewResponse(NewResponsePayload),
    CommonGroundUpdate(CommonGroundUpdatePayload),
    TopicStatusChange(TopicStatusChangePayload),
    ResponseDeleted(serde_json::Value),
    ResponseUpdated(serde_json::Value),
}

impl ServerMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ServerMessage::NewResponse(_) => MessageKind::NewResponse,
            ServerMessage::CommonGroundUpdate(_) => MessageKind::CommonGroundUpdate,
            ServerMessage::TopicStatusChange(_) => MessageKind::TopicStatusChange,
            ServerMessage::ResponseDeleted(_) => MessageKind::ResponseDeleted,
            ServerMessage::ResponseUpdated(_) => MessageKind::ResponseUpdated,
        }
    }

    /// The topic this notification concerns, if the payload names one
    pub fn topic_id(&self) -> Option<&str> {
        match self {
            ServerMessage::NewResponse(p) => Some(&p.topic_id),
            ServerMessage::CommonGroundUpdate(p) => Some(&p.topic_id),
            ServerMessage::TopicStatusChange(p) => Some(&p.topic_id),
            ServerMessage::ResponseDeleted(raw) | ServerMessage::ResponseUpdated(raw) => {
                raw.get("topicId").and_then(|v| v.as_str())
            }
        }
    }
}

/// Outcome of decoding a single text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Liveness acknowledgement; never routed to listeners
    Pong,
    /// A notification to route by kind
    Message(ServerMessage),
    /// A well-formed frame with a `type` this client does not know
    Unknown(String),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

fn payload<T: serde::de::DeserializeOwned>(
    kind: MessageKind,
    raw: serde_json::Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(raw).map_err(|source| ProtocolError::InvalidPayload { kind, source })
}

/// Decode a raw text frame received from the server.
pub fn decode_frame(text: &str) -> Result<InboundFrame, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

    if raw.kind == PONG_TYPE {
        return Ok(InboundFrame::Pong);
    }

    let Some(kind) = MessageKind::from_tag(&raw.kind) else {
        return Ok(InboundFrame::Unknown(raw.kind));
    };

    let message = match kind {
        MessageKind::NewResponse => ServerMessage::NewResponse(payload(kind, raw.payload)?),
        MessageKind::CommonGroundUpdate => {
            ServerMessage::CommonGroundUpdate(payload(kind, raw.payload)?)
        }
        MessageKind::TopicStatusChange => {
            ServerMessage::TopicStatusChange(payload(kind, raw.payload)?)
        }
        MessageKind::ResponseDeleted => ServerMessage::ResponseDeleted(raw.payload),
        MessageKind::ResponseUpdated => ServerMessage::ResponseUpdated(raw.payload),
    };

    Ok(InboundFrame::Message(message))
}

/// Control frames sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Ping,
}
