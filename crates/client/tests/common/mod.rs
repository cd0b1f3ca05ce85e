//! Scripted transport for driving the hub without a network.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_channel::mpsc::{unbounded, UnboundedReceiver};
use futures_util::{FutureExt, StreamExt};
use reasonbridge_client::ws::{Connector, TransportEvent, TransportHandle};
use reasonbridge_client::{HubConfig, HubError};
use serde_json::json;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use url::Url;

struct Socket {
    url: Url,
    events: UnboundedSender<TransportEvent>,
    outbound: UnboundedReceiver<String>,
}

/// Records every transport the hub opens and lets the test play the server.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    sockets: Arc<Mutex<Vec<Socket>>>,
    fail_next: Arc<Mutex<Option<String>>>,
}

impl Connector for ScriptedConnector {
    fn open(&self, url: &Url) -> Result<TransportHandle, HubError> {
        if let Some(reason) = self.fail_next.lock().unwrap().take() {
            return Err(HubError::Transport(reason));
        }
        let (outbound_tx, outbound_rx) = unbounded();
        let (events_tx, events_rx) = unbounded_channel();
        self.sockets.lock().unwrap().push(Socket {
            url: url.clone(),
            events: events_tx,
            outbound: outbound_rx,
        });
        Ok(TransportHandle {
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}

impl ScriptedConnector {
    /// How many transports the hub has constructed
    pub fn opened(&self) -> usize {
        self.sockets.lock().unwrap().len()
    }

    /// Make the next `open` fail synchronously
    pub fn fail_next_open(&self, reason: &str) {
        *self.fail_next.lock().unwrap() = Some(reason.to_string());
    }

    pub fn url(&self, index: usize) -> Url {
        self.sockets.lock().unwrap()[index].url.clone()
    }

    /// Deliver a transport event. Events for detached transports are dropped.
    pub fn emit(&self, index: usize, event: TransportEvent) {
        let _ = self.sockets.lock().unwrap()[index].events.send(event);
    }

    pub fn accept(&self, index: usize) {
        self.emit(index, TransportEvent::Open);
    }

    pub fn close(&self, index: usize) {
        self.emit(index, TransportEvent::Closed { reason: None });
    }

    pub fn frame(&self, index: usize, frame: serde_json::Value) {
        self.emit(index, TransportEvent::Message(frame.to_string()));
    }

    pub fn raw_frame(&self, index: usize, text: &str) {
        self.emit(index, TransportEvent::Message(text.to_string()));
    }

    /// Drain the frames the hub has written to a transport so far
    pub fn sent(&self, index: usize) -> Vec<String> {
        let mut sockets = self.sockets.lock().unwrap();
        let outbound = &mut sockets[index].outbound;
        let mut frames = Vec::new();
        while let Some(Some(frame)) = outbound.next().now_or_never() {
            frames.push(frame);
        }
        frames
    }

    /// Whether the hub has let go of a transport. Discards unread frames.
    pub fn released(&self, index: usize) -> bool {
        let mut sockets = self.sockets.lock().unwrap();
        let outbound = &mut sockets[index].outbound;
        loop {
            match outbound.next().now_or_never() {
                Some(Some(_)) => continue,
                Some(None) => return true,
                None => return false,
            }
        }
    }
}

/// Let spawned hub tasks run until they are idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn token() -> impl Fn() -> Option<String> + Send + Sync + 'static {
    || Some("test-token".to_string())
}

pub fn config() -> HubConfig {
    HubConfig::default()
}

pub fn new_response(topic_id: &str, response_id: &str) -> serde_json::Value {
    json!({
        "type": "NEW_RESPONSE",
        "payload": {
            "topicId": topic_id,
            "responseId": response_id,
            "authorId": "u-1",
            "authorName": "Ada",
            "timestamp": "2024-05-01T12:00:00Z"
        }
    })
}

pub fn status_change(topic_id: &str) -> serde_json::Value {
    json!({
        "type": "TOPIC_STATUS_CHANGE",
        "payload": {
            "topicId": topic_id,
            "oldStatus": "SEEDING",
            "newStatus": "ACTIVE",
            "timestamp": "2024-05-01T12:00:00Z"
        }
    })
}
