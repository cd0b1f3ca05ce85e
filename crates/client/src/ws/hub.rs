//! The notification hub: one managed connection plus the listener registry.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use reasonbridge_shared::{decode_frame, InboundFrame, MessageKind, ServerMessage, PING_FRAME};
use serde::Serialize;
use tokio::sync::{mpsc::UnboundedReceiver, watch};
use tokio::task::JoinHandle;

use super::connection::{
    ConnectionState, Connector, HubStatus, OutboundSender, TransportEvent, TransportHandle,
    TungsteniteConnector,
};
use super::heartbeat;
use super::registry::{Listener, Subscription, SubscriptionRegistry};
use crate::config::HubConfig;
use crate::credentials::CredentialProvider;
use crate::error::HubError;

/// Generic message stored when the transport reports an error event
const TRANSPORT_ERROR_MESSAGE: &str = "WebSocket connection error";

/// Handle to a realtime notification hub.
///
/// Clones share the same hub. When the last handle is dropped the hub tears
/// down: the socket is closed and every pending timer is cancelled.
#[derive(Clone)]
pub struct NotificationHub {
    shared: Arc<HubShared>,
}

struct HubShared {
    config: HubConfig,
    credentials: Box<dyn CredentialProvider>,
    connector: Box<dyn Connector>,
    registry: SubscriptionRegistry,
    status: watch::Sender<HubStatus>,
    slot: Mutex<ConnectionSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SocketPhase {
    #[default]
    Idle,
    Opening,
    Open,
}

/// Everything tied to the current transport.
///
/// `generation` changes whenever the transport is replaced or detached;
/// events and timers carry the generation they were started for and are
/// ignored once it is stale.
#[derive(Default)]
struct ConnectionSlot {
    generation: u64,
    phase: SocketPhase,
    attempts: u32,
    outbound: Option<OutboundSender>,
    pump: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl ConnectionSlot {
    fn stop_heartbeat(&mut self) {
        if let Some(task) = self.heartbeat.take() {
            task.abort();
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(task) = self.reconnect.take() {
            task.abort();
        }
    }

    /// Cancel all timers, detach the event pump and drop the outbound sender,
    /// which closes the transport. Returns whether anything was active.
    fn teardown(&mut self) -> bool {
        let active = self.phase != SocketPhase::Idle || self.reconnect.is_some();
        self.cancel_reconnect();
        self.stop_heartbeat();
        if let Some(task) = self.pump.take() {
            task.abort();
        }
        self.outbound = None;
        self.phase = SocketPhase::Idle;
        self.attempts = 0;
        self.generation += 1;
        active
    }
}

impl NotificationHub {
    /// Create a hub.
    ///
    /// If `config.auto_connect` is set and `credentials` currently yields a
    /// token, the hub starts connecting immediately, which requires a Tokio
    /// runtime.
    pub fn new(
        config: HubConfig,
        credentials: impl CredentialProvider + 'static,
        connector: impl Connector + 'static,
    ) -> Self {
        let (status, _) = watch::channel(HubStatus::default());
        let hub = Self {
            shared: Arc::new(HubShared {
                config,
                credentials: Box::new(credentials),
                connector: Box::new(connector),
                registry: SubscriptionRegistry::new(),
                status,
                slot: Mutex::new(ConnectionSlot::default()),
            }),
        };

        if hub.shared.config.auto_connect && hub.shared.credentials.token().is_some() {
            hub.connect();
        }

        hub
    }

    /// Create a hub that connects with tokio-tungstenite.
    pub fn with_tungstenite(
        config: HubConfig,
        credentials: impl CredentialProvider + 'static,
    ) -> Self {
        Self::new(config, credentials, TungsteniteConnector)
    }

    pub fn config(&self) -> &HubConfig {
        &self.shared.config
    }

    /// Start connecting. Returns immediately; watch the status for the outcome.
    ///
    /// Does nothing if a connection is already open or opening.
    pub fn connect(&self) {
        self.shared.connect();
    }

    /// Close the connection and cancel every pending timer.
    ///
    /// Safe to call repeatedly and before any connection was made.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    /// Transmit `message` if the connection is open.
    ///
    /// Messages are never queued: while disconnected the message is dropped
    /// and `HubError::NotConnected` is returned.
    pub fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<(), HubError> {
        let text = serde_json::to_string(message)?;
        self.shared.send_text(text)
    }

    /// Register `handler` for messages of `kind`.
    ///
    /// Listeners stay registered across reconnects. The hub owns its
    /// listeners, so a listener that needs the hub should capture
    /// [`NotificationHub::downgrade`] rather than a clone; a clone keeps the
    /// hub alive and it is never torn down on drop.
    pub fn subscribe<F>(&self, kind: MessageKind, handler: F) -> Subscription
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe(kind, handler)
    }

    /// Register a shared listener; the same `Arc` is only added once per kind.
    pub fn subscribe_listener(&self, kind: MessageKind, listener: Listener) -> Subscription {
        self.shared.registry.subscribe_listener(kind, listener)
    }

    /// A handle that does not keep the hub alive.
    pub fn downgrade(&self) -> WeakNotificationHub {
        WeakNotificationHub {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.shared.registry
    }

    pub fn status(&self) -> HubStatus {
        self.shared.status.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.status.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// The last error message, if any
    pub fn error(&self) -> Option<String> {
        self.shared.status.borrow().error.clone()
    }

    /// Subscribe to status changes.
    pub fn watch_status(&self) -> watch::Receiver<HubStatus> {
        self.shared.status.subscribe()
    }

    /// Consecutive unexpected closes since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.slot().attempts
    }
}

/// Non-owning handle created by [`NotificationHub::downgrade`].
#[derive(Clone)]
pub struct WeakNotificationHub {
    shared: Weak<HubShared>,
}

impl WeakNotificationHub {
    /// The hub, unless every owning handle has been dropped
    pub fn upgrade(&self) -> Option<NotificationHub> {
        self.shared.upgrade().map(|shared| NotificationHub { shared })
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("endpoint", &self.shared.config.endpoint.to_string())
            .field("status", &*self.shared.status.borrow())
            .finish_non_exhaustive()
    }
}

impl HubShared {
    fn slot(&self) -> MutexGuard<'_, ConnectionSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_status(&self, f: impl FnOnce(&mut HubStatus)) {
        self.status.send_if_modified(|status| {
            let before = status.clone();
            f(status);
            *status != before
        });
    }

    fn fail(&self, message: String) {
        self.update_status(|status| {
            status.state = ConnectionState::Error;
            status.error = Some(message);
        });
    }

    fn connect(self: &Arc<Self>) {
        // User code; runs before the slot is locked
        let token = self.credentials.token();
        let mut slot = self.slot();
        slot.cancel_reconnect();
        self.connect_locked(&mut slot, token);
    }

    /// Open a new transport. The caller holds the slot for the whole attempt,
    /// so a concurrent `disconnect()` either runs first or sees the result.
    fn connect_locked(self: &Arc<Self>, slot: &mut ConnectionSlot, token: Option<String>) {
        if slot.phase != SocketPhase::Idle {
            crate::log_debug!("connect() ignored: connection already {:?}", slot.phase);
            return;
        }

        let Some(token) = token else {
            crate::log_warn!("Cannot connect to {}: user not authenticated", self.config.endpoint);
            self.fail(HubError::NotAuthenticated.to_string());
            return;
        };

        let url = match self.config.endpoint.url_with_token(&token) {
            Ok(url) => url,
            Err(e) => {
                crate::log_error!("Cannot connect: {}", e);
                self.fail(e.to_string());
                return;
            }
        };

        self.update_status(|status| status.state = ConnectionState::Connecting);
        crate::log_info!("Connecting to {}", self.config.endpoint);

        let TransportHandle { outbound, events } = match self.connector.open(&url) {
            Ok(handle) => handle,
            Err(e) => {
                crate::log_error!("Failed to construct WebSocket for {}: {}", self.config.endpoint, e);
                let message = if matches!(e, HubError::Transport(_)) {
                    e.to_string()
                } else {
                    HubError::Transport(e.to_string()).to_string()
                };
                self.fail(message);
                return;
            }
        };

        slot.generation += 1;
        let generation = slot.generation;
        slot.phase = SocketPhase::Opening;
        slot.outbound = Some(outbound);
        slot.pump = Some(tokio::spawn(pump_events(Arc::downgrade(self), generation, events)));
    }

    fn disconnect(&self) {
        let mut slot = self.slot();
        if slot.teardown() {
            crate::log_info!("Disconnected from {}", self.config.endpoint);
        }
        self.update_status(|status| {
            status.state = ConnectionState::Disconnected;
            status.error = None;
        });
    }

    fn send_text(&self, text: String) -> Result<(), HubError> {
        let slot = self.slot();
        let outbound = match (&slot.outbound, slot.phase) {
            (Some(outbound), SocketPhase::Open) => outbound,
            _ => {
                crate::log_warn!("WebSocket not connected, dropping outbound message");
                return Err(HubError::NotConnected);
            }
        };
        outbound.unbounded_send(text).map_err(|_| {
            crate::log_warn!("WebSocket closed while sending, dropping outbound message");
            HubError::NotConnected
        })
    }

    /// Heartbeat tick. Returns `false` once the heartbeat's connection is gone.
    fn send_ping(&self, generation: u64) -> bool {
        let slot = self.slot();
        if slot.generation != generation {
            return false;
        }
        if let (Some(outbound), SocketPhase::Open) = (&slot.outbound, slot.phase) {
            crate::log_debug!("Sending PING");
            let _ = outbound.unbounded_send(PING_FRAME.to_string());
        }
        true
    }

    fn handle_event(self: &Arc<Self>, generation: u64, event: TransportEvent) -> ControlFlow<()> {
        match event {
            TransportEvent::Open => self.on_open(generation),
            TransportEvent::Message(text) => self.on_message(generation, &text),
            TransportEvent::Error(reason) => self.on_transport_error(generation, &reason),
            TransportEvent::Closed { reason } => {
                self.on_close(generation, reason);
                ControlFlow::Break(())
            }
        }
    }

    fn on_open(self: &Arc<Self>, generation: u64) -> ControlFlow<()> {
        let mut slot = self.slot();
        if slot.generation != generation {
            return ControlFlow::Break(());
        }
        slot.phase = SocketPhase::Open;
        slot.attempts = 0;
        slot.stop_heartbeat();
        let hub = Arc::downgrade(self);
        slot.heartbeat = heartbeat::spawn(self.config.heartbeat_interval, move || {
            hub.upgrade().is_some_and(|hub| hub.send_ping(generation))
        });
        drop(slot);

        crate::log_info!("WebSocket connected to {}", self.config.endpoint);
        self.update_status(|status| {
            status.state = ConnectionState::Connected;
            status.error = None;
        });
        ControlFlow::Continue(())
    }

    fn on_message(&self, generation: u64, text: &str) -> ControlFlow<()> {
        if self.slot().generation != generation {
            return ControlFlow::Break(());
        }
        match decode_frame(text) {
            Ok(InboundFrame::Message(message)) => {
                self.registry.dispatch(&message);
            }
            Ok(InboundFrame::Pong) => crate::log_debug!("Received PONG"),
            Ok(InboundFrame::Unknown(kind)) => {
                crate::log_debug!("Ignoring message of unknown type '{}'", kind)
            }
            Err(e) => crate::log_warn!("Dropping inbound frame: {}", e),
        }
        ControlFlow::Continue(())
    }

    fn on_transport_error(&self, generation: u64, reason: &str) -> ControlFlow<()> {
        if self.slot().generation != generation {
            return ControlFlow::Break(());
        }
        crate::log_error!("WebSocket error on {}: {}", self.config.endpoint, reason);
        self.fail(TRANSPORT_ERROR_MESSAGE.to_string());
        ControlFlow::Continue(())
    }

    fn on_close(self: &Arc<Self>, generation: u64, reason: Option<String>) {
        let mut slot = self.slot();
        if slot.generation != generation {
            return;
        }
        slot.phase = SocketPhase::Idle;
        slot.outbound = None;
        slot.stop_heartbeat();
        // This runs on the pump task itself; let it finish on its own
        slot.pump = None;
        slot.attempts += 1;

        let attempts = slot.attempts;
        let reconnect = &self.config.reconnect;
        let retry = reconnect.allows(attempts);
        if retry {
            let hub = Arc::downgrade(self);
            let delay = reconnect.delay;
            slot.reconnect = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(hub) = hub.upgrade() {
                    hub.reconnect_now(generation);
                }
            }));
        }

        crate::log_info!(
            "WebSocket to {} closed ({})",
            self.config.endpoint,
            reason.as_deref().unwrap_or("no reason")
        );
        if retry {
            crate::log_info!(
                "Reconnecting in {}ms (attempt {}/{})",
                reconnect.delay.as_millis(),
                attempts,
                reconnect.max_attempts
            );
        } else if reconnect.enabled {
            crate::log_warn!(
                "Giving up after {} consecutive failed connections; call connect() to retry",
                attempts
            );
        }

        self.update_status(|status| status.state = ConnectionState::Disconnected);
    }

    /// Fired by the reconnect timer scheduled when connection `generation`
    /// closed. A timer that was cancelled or superseded does nothing, even if
    /// it already woke up.
    fn reconnect_now(self: &Arc<Self>, generation: u64) {
        let token = self.credentials.token();
        let mut slot = self.slot();
        if slot.generation != generation || slot.reconnect.is_none() {
            crate::log_debug!("Stale reconnect timer ignored");
            return;
        }
        // Detach our own handle rather than aborting the running task
        slot.reconnect = None;
        self.connect_locked(&mut slot, token);
    }
}

impl Drop for HubShared {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if slot.teardown() {
            crate::log_debug!("Notification hub dropped, connection torn down");
        }
    }
}

/// Feed transport events into the hub, in order, until the transport closes
/// or the hub goes away.
async fn pump_events(
    hub: Weak<HubShared>,
    generation: u64,
    mut events: UnboundedReceiver<TransportEvent>,
) {
    loop {
        let event = events.recv().await.unwrap_or(TransportEvent::Closed {
            reason: Some("transport dropped".to_string()),
        });
        let Some(hub) = hub.upgrade() else {
            return;
        };
        if hub.handle_event(generation, event).is_break() {
            return;
        }
    }
}
