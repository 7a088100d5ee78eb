//! Native realtime driver on tokio-tungstenite.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::channel::{Outgoing, RealtimeChannel};
use super::RealtimeConnector;

/// Spawns [`run`] on the current tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioConnector;

impl RealtimeConnector for TokioConnector {
    fn start(&self, channel: Arc<RealtimeChannel>) {
        tokio::spawn(run(channel));
    }
}

/// Drive the channel until it is disposed or gives up reconnecting
pub async fn run(channel: Arc<RealtimeChannel>) {
    loop {
        if channel.is_disposed() {
            break;
        }

        match connect_async(channel.url()).await {
            Ok((stream, _response)) => {
                let (mut write, mut read) = stream.split();
                let mut outgoing = channel.opened();

                loop {
                    tokio::select! {
                        inbound = read.next() => match inbound {
                            Some(Ok(WsMessage::Text(text))) => {
                                channel.handle_text(&text);
                            }
                            Some(Ok(WsMessage::Close(frame))) => {
                                tracing::debug!(?frame, "Realtime socket closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, "Realtime socket error");
                                break;
                            }
                            None => break,
                        },
                        item = outgoing.recv() => match item {
                            Some(Outgoing::Text(text)) => {
                                if let Err(e) = write.send(WsMessage::Text(text)).await {
                                    tracing::warn!(error = %e, "Realtime write failed");
                                    break;
                                }
                            }
                            Some(Outgoing::Close) | None => {
                                let _ = write.send(WsMessage::Close(None)).await;
                                break;
                            }
                        },
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Realtime connection failed");
            }
        }

        match channel.closed() {
            Some(delay) => tokio::time::sleep(delay).await,
            None => break,
        }
    }

    tracing::debug!("Realtime driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockBackend, GOOD_TOKEN};
    use crate::realtime::{kind, ConnectionStatus, InboundEvent, ReconnectPolicy};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: 5,
            base_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_five_retries() {
        let backend = MockBackend::start().await;
        let ws_url = format!("ws://{}", backend.addr);
        let channel = Arc::new(RealtimeChannel::new(&ws_url, "rejected", policy()));

        tokio::time::timeout(Duration::from_secs(10), run(Arc::clone(&channel)))
            .await
            .expect("driver should stop");

        // One initial attempt plus five reconnects
        assert_eq!(backend.state.ws_attempts.load(Ordering::SeqCst), 6);
        assert_eq!(channel.status().snapshot(), ConnectionStatus::GaveUp);
    }

    #[tokio::test]
    async fn test_dispatches_and_sends_until_disposed() {
        let backend = MockBackend::start().await;
        let ws_url = format!("ws://{}", backend.addr);
        let channel = Arc::new(RealtimeChannel::new(&ws_url, GOOD_TOKEN, policy()));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        channel.on_fn(kind::NEW_MESSAGE, move |frame| {
            if let InboundEvent::Message(message) = frame.event()? {
                let _ = tx.send(message.id);
            }
            Ok(())
        });

        let driver = tokio::spawn(run(Arc::clone(&channel)));
        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(50));
        assert!(channel.is_connected());

        channel.join_group(7).unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while backend.state.ws_received.lock().unwrap().is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "frame never arrived");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(backend.state.ws_received.lock().unwrap()[0].contains("join_group"));

        channel.dispose();
        tokio::time::timeout(Duration::from_secs(5), driver)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(backend.state.ws_attempts.load(Ordering::SeqCst), 1);
    }
}
