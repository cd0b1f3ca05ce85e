//! ReasonBridge listener - Main entry point
//!
//! Connects a notification hub with settings from the environment and logs
//! every notification and state change until Ctrl-C.

use anyhow::Context;
use reasonbridge_client::{log_info, ConnectionState, HubConfig, NotificationHub};
use reasonbridge_shared::MessageKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reasonbridge_client=debug")),
        )
        .init();

    let config = HubConfig::from_env();
    // Re-read on every connect so a refreshed token is picked up
    let credentials = || {
        std::env::var("REASONBRIDGE_TOKEN")
            .ok()
            .filter(|token| !token.is_empty())
    };

    let hub = NotificationHub::with_tungstenite(config, credentials);

    let subscriptions: Vec<_> = MessageKind::ALL
        .into_iter()
        .map(|kind| {
            hub.subscribe(kind, move |message| {
                log_info!("{} {:?}", kind, message);
            })
        })
        .collect();

    // Also covers auto-connect skipped for a missing token, so the
    // authentication error gets reported
    if hub.state() == ConnectionState::Disconnected {
        hub.connect();
    }

    let mut status = hub.watch_status();
    log_info!("Hub state: {}", status.borrow().state);

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                match current.error {
                    Some(error) => log_info!("Hub state: {} ({})", current.state, error),
                    None => log_info!("Hub state: {}", current.state),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    for subscription in &subscriptions {
        subscription.unsubscribe();
    }
    hub.disconnect();
    Ok(())
}
