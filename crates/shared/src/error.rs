//! Shared error types.

use thiserror::Error;

use crate::protocol::MessageKind;

/// Failure to decode an inbound realtime frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame is not a JSON object with a string `type` field.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The frame names a known kind but its payload does not match it.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
}
