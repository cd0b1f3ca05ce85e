//! Client-side error type.

use thiserror::Error;

/// Errors produced by the notification hub and its transports.
///
/// The hub never returns these from `connect`/`disconnect`; instead it renders
/// them into [`HubStatus::error`](crate::ws::HubStatus). `send` and the
/// [`Connector`](crate::ws::Connector) trait return them directly.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("User not authenticated")]
    NotAuthenticated,
    #[error("Failed to create WebSocket: {0}")]
    Transport(String),
    #[error("WebSocket not connected")]
    NotConnected,
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Invalid WebSocket endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<url::ParseError> for HubError {
    fn from(err: url::ParseError) -> Self {
        HubError::InvalidEndpoint(err.to_string())
    }
}
