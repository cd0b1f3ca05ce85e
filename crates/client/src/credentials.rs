//! Session credential lookup.
//!
//! The hub does not log users in or out. It asks a [`CredentialProvider`] for
//! the current token each time it opens a connection, so a token refreshed
//! between reconnects is picked up automatically.

use std::sync::{Arc, PoisonError, RwLock};

/// Supplies the session token used in the connection handshake.
///
/// The hub asks before locking its connection state, so a provider may
/// query the hub it belongs to.
pub trait CredentialProvider: Send + Sync {
    /// The current token, or `None` when no user is signed in.
    fn token(&self) -> Option<String>;
}

impl<F> CredentialProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// A shareable, mutable session token.
///
/// Clones share the same slot, so an auth layer can keep one clone and hand
/// another to the hub.
#[derive(Debug, Clone, Default)]
pub struct SessionToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// Replace the stored token (after login or refresh)
    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Forget the stored token (after logout)
    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl CredentialProvider for SessionToken {
    fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
