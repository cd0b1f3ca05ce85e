//! Realtime notification hub.
//!
//! This module provides:
//! - A single managed WebSocket connection with bounded auto-reconnect
//! - Periodic liveness pings while connected
//! - Typed dispatch of inbound notifications to listeners registered by kind
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  NotificationHub                    │
//! │   (connection slot, status watch, reconnect timer)  │
//! └─────────────────────────────────────────────────────┘
//!          │                              ▲
//!          │ Connector::open              │ TransportEvent
//!          ▼                              │ (open / message / error / closed)
//!   ┌──────────────────────────────────────────────┐
//!   │ Transport (TungsteniteConnector by default)  │
//!   └──────────────────────────────────────────────┘
//!                         │ decoded ServerMessage
//!                         ▼
//!              ┌─────────────────────┐
//!              │ SubscriptionRegistry│
//!              └─────────────────────┘
//!                         │
//!          ┌──────────────┼──────────────┐
//!          ▼              ▼              ▼
//!   ┌────────────┐ ┌────────────┐ ┌────────────┐
//!   │ Listener   │ │ Listener   │ │ Listener   │
//!   │ (refetch   │ │ (refetch   │ │ (update    │
//!   │  topic)    │ │  analysis) │ │  status)   │
//!   └────────────┘ └────────────┘ └────────────┘
//! ```
//!
//! # Usage
//!
//! Listeners only learn that something changed; refetching the data is up
//! to them.
//!
//! ```rust,ignore
//! let hub = NotificationHub::with_tungstenite(HubConfig::from_env(), session.clone());
//!
//! let sub = hub.subscribe(MessageKind::NewResponse, move |msg| {
//!     if let Some(topic) = msg.topic_id() {
//!         cache.invalidate(topic);
//!     }
//! });
//!
//! // later, when the view goes away
//! sub.unsubscribe();
//! ```

mod connection;
mod heartbeat;
mod hub;
mod registry;

pub use connection::{
    ConnectionState, Connector, HubStatus, OutboundSender, TransportEvent, TransportHandle,
    TungsteniteConnector,
};
pub use hub::{NotificationHub, WeakNotificationHub};
pub use registry::{Listener, Subscription, SubscriptionRegistry};
