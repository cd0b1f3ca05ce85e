//! Listener registry keyed by message kind.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use reasonbridge_shared::{MessageKind, ServerMessage};

/// A shared listener callback.
///
/// Identity is the `Arc` allocation: registering the same `Arc` twice under
/// one kind keeps a single entry.
pub type Listener = Arc<dyn Fn(&ServerMessage) + Send + Sync>;

type ListenerMap = HashMap<MessageKind, Vec<Listener>>;

/// Maps message kinds to the listeners interested in them.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: Arc<Mutex<ListenerMap>>,
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

fn lock(map: &Mutex<ListenerMap>) -> MutexGuard<'_, ListenerMap> {
    // Listeners never run under the lock, so a poisoned map is still consistent
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for messages of `kind`.
    pub fn subscribe<F>(&self, kind: MessageKind, handler: F) -> Subscription
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.subscribe_listener(kind, Arc::new(handler))
    }

    /// Register a shared listener for messages of `kind`.
    ///
    /// A listener already registered under `kind` is not added again.
    pub fn subscribe_listener(&self, kind: MessageKind, listener: Listener) -> Subscription {
        {
            let mut map = lock(&self.inner);
            let entry = map.entry(kind).or_default();
            if !entry.iter().any(|existing| same_listener(existing, &listener)) {
                entry.push(listener.clone());
            }
        }

        Subscription {
            registry: Arc::downgrade(&self.inner),
            kind,
            listener,
        }
    }

    /// Deliver `message` to every listener registered for its kind.
    ///
    /// Each listener runs in isolation: a panicking listener is logged and
    /// skipped, and the rest still run. Returns how many listeners completed.
    pub fn dispatch(&self, message: &ServerMessage) -> usize {
        let kind = message.kind();
        // Snapshot so listeners can (un)subscribe while being called
        let listeners = match lock(&self.inner).get(&kind) {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| (*listener)(message))) {
                Ok(()) => delivered += 1,
                Err(cause) => {
                    crate::log_error!("Listener for {} panicked: {}", kind, panic_message(&*cause));
                }
            }
        }
        delivered
    }

    pub fn listener_count(&self, kind: MessageKind) -> usize {
        lock(&self.inner).get(&kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    /// Drop every listener. Outstanding subscriptions become no-ops.
    pub fn clear(&self) {
        lock(&self.inner).clear();
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(msg) = cause.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = cause.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Disposer returned by `subscribe`.
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "keep the Subscription to be able to unsubscribe later"]
pub struct Subscription {
    registry: Weak<Mutex<ListenerMap>>,
    kind: MessageKind,
    listener: Listener,
}

impl Subscription {
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Remove this listener.
    ///
    /// Safe to call more than once, and after the registry is gone.
    pub fn unsubscribe(&self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let mut map = lock(&inner);
        if let Some(listeners) = map.get_mut(&self.kind) {
            listeners.retain(|existing| !same_listener(existing, &self.listener));
            if listeners.is_empty() {
                map.remove(&self.kind);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
