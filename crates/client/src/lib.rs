//! ReasonBridge realtime client
//!
//! This crate contains the notification hub that keeps a ReasonBridge
//! client informed of server-side changes over a WebSocket.

pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod ws;

pub use config::{HubConfig, ReconnectConfig};
pub use credentials::{CredentialProvider, SessionToken};
pub use endpoint::Endpoint;
pub use error::HubError;
pub use ws::{ConnectionState, HubStatus, NotificationHub, Subscription, WeakNotificationHub};
