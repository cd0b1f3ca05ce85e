//! Native WebSocket transport using tokio-tungstenite.

use futures_channel::mpsc::{unbounded, UnboundedReceiver};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::{Connector, TransportEvent, TransportHandle};
use crate::error::HubError;

/// Opens WebSocket connections with tokio-tungstenite.
///
/// Each transport is driven by one background task that forwards inbound
/// text frames and writes outbound ones. Must be used inside a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    fn open(&self, url: &Url) -> Result<TransportHandle, HubError> {
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(HubError::Transport(format!(
                    "unsupported URL scheme '{other}'"
                )))
            }
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| HubError::Transport(e.to_string()))?;

        let (outbound_tx, outbound_rx) = unbounded();
        let (events_tx, events_rx) = unbounded_channel();

        runtime.spawn(run_socket(url.to_string(), outbound_rx, events_tx));

        Ok(TransportHandle {
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}

async fn run_socket(
    url: String,
    mut outbound: UnboundedReceiver<String>,
    events: UnboundedSender<TransportEvent>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            crate::log_error!("WebSocket connect failed: {}", e);
            let _ = events.send(TransportEvent::Error(e.to_string()));
            let _ = events.send(TransportEvent::Closed {
                reason: Some(e.to_string()),
            });
            return;
        }
    };

    if events.send(TransportEvent::Open).is_err() {
        // Nobody is listening any more; dropping the stream closes it
        return;
    }

    let (mut write, mut read) = stream.split();

    let reason = loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if events.send(TransportEvent::Message(text.as_str().to_owned())).is_err() {
                        let _ = write.send(Message::Close(None)).await;
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    crate::log_info!("WebSocket received close frame");
                    break frame.map(|f| f.reason.as_str().to_owned());
                }
                Some(Ok(_)) => {
                    // Binary frames are not part of the protocol; pings are answered by tungstenite
                }
                Some(Err(e)) => {
                    crate::log_error!("WebSocket read error: {}", e);
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break Some(e.to_string());
                }
                None => break None,
            },
            command = outbound.next() => match command {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        crate::log_error!("Send failed: {}", e);
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break Some(e.to_string());
                    }
                }
                None => {
                    crate::log_debug!("Outbound sender dropped, closing WebSocket");
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
            },
        }
    };

    let _ = events.send(TransportEvent::Closed { reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn next_event(handle: &mut TransportHandle) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(5), handle.events.recv())
            .await
            .expect("transport event timed out")
            .expect("event stream ended")
    }

    #[tokio::test]
    async fn rejects_non_websocket_scheme() {
        let url = Url::parse("http://localhost/ws").unwrap();
        let result = TungsteniteConnector.open(&url);
        assert!(matches!(result, Err(HubError::Transport(_))));
    }

    #[tokio::test]
    async fn refused_connection_reports_error_then_close() {
        // Bind and drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
        let mut handle = TungsteniteConnector.open(&url).unwrap();

        assert!(matches!(next_event(&mut handle).await, TransportEvent::Error(_)));
        assert!(matches!(
            next_event(&mut handle).await,
            TransportEvent::Closed { reason: Some(_) }
        ));
    }

    #[tokio::test]
    async fn exchanges_text_frames_with_a_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text(r#"{"type":"PONG"}"#.to_string().into()))
                .await
                .unwrap();
            // Remember the last client frame until the client closes
            let mut received = None;
            while let Some(Ok(frame)) = ws.next().await {
                match frame {
                    Message::Text(text) => received = Some(text.as_str().to_owned()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            received
        });

        let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
        let mut handle = TungsteniteConnector.open(&url).unwrap();

        assert_eq!(next_event(&mut handle).await, TransportEvent::Open);
        assert_eq!(
            next_event(&mut handle).await,
            TransportEvent::Message(r#"{"type":"PONG"}"#.to_string())
        );

        handle
            .outbound
            .unbounded_send(r#"{"type":"PING"}"#.to_string())
            .unwrap();
        // Give the writer a chance to flush before closing
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(handle);

        let received = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server timed out")
            .unwrap();
        assert_eq!(received.as_deref(), Some(r#"{"type":"PING"}"#));
    }
}
