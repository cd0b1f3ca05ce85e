//! Connection state and the transport abstraction.
//!
//! A [`Connector`] opens a transport the way a browser opens a WebSocket:
//! construction either fails synchronously or returns immediately, and the
//! outcome (open, frames, error, close) arrives later as [`TransportEvent`]s.

use futures_channel::mpsc::UnboundedSender;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

use crate::error::HubError;

/// Connection state of a hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, ConnectionState::Connecting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable hub status: the connection state plus the last error message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HubStatus {
    pub state: ConnectionState,
    pub error: Option<String>,
}

impl HubStatus {
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }
}

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed and frames can flow
    Open,
    /// A text frame arrived
    Message(String),
    /// The transport reported an error; a `Closed` event usually follows
    Error(String),
    /// The transport is gone. Always the last event.
    Closed { reason: Option<String> },
}

/// Sending half for outbound text frames. Dropping it closes the transport.
pub type OutboundSender = UnboundedSender<String>;

/// A freshly constructed transport.
pub struct TransportHandle {
    pub outbound: OutboundSender,
    pub events: UnboundedReceiver<TransportEvent>,
}

/// Opens transports for the hub.
pub trait Connector: Send + Sync {
    /// Start opening a transport to `url`.
    ///
    /// Must not block. An `Err` models a synchronous construction failure;
    /// everything after that is reported through the returned event stream.
    ///
    /// Called with the hub's connection state locked, so it must not call
    /// back into the hub.
    fn open(&self, url: &Url) -> Result<TransportHandle, HubError>;
}

mod connection_native;
pub use connection_native::TungsteniteConnector;
