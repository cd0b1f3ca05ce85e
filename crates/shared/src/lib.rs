//! Shared types for the ReasonBridge realtime protocol.

pub mod models;
pub mod protocol;
pub mod error;

pub use models::*;
pub use protocol::*;
pub use error::*;
