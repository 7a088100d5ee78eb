//! Transport-independent realtime channel.
//!
//! Owns the dispatch table, the reconnect budget and the outbound queue of
//! the currently open socket. Platform drivers report `opened` / `closed`
//! / inbound text and pump [`Outgoing`] items into the socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use super::dispatch::{DispatchReport, Dispatcher, Handler};
use super::frame::{Frame, OutboundFrame};
use super::reconnect::{ReconnectPolicy, ReconnectState};
use crate::error::{ClientError, ClientResult};
use crate::models::GroupId;
use crate::store::Store;

/// Item a driver writes to the socket
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Text(String),
    Close,
}

/// Connection state for status indicators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Reconnecting {
        attempt: u32,
    },
    /// Reconnect budget spent; a new session is needed
    GaveUp,
    /// Disposed on logout
    Closed,
}

pub struct RealtimeChannel {
    url: String,
    policy: ReconnectPolicy,
    dispatcher: Dispatcher,
    reconnect: Mutex<ReconnectState>,
    outgoing: Mutex<Option<mpsc::UnboundedSender<Outgoing>>>,
    disposed: AtomicBool,
    status: Store<ConnectionStatus>,
}

impl RealtimeChannel {
    /// Channel for `{ws_base}/ws?token=...`
    pub fn new(ws_base: &str, token: &str, policy: ReconnectPolicy) -> Self {
        Self {
            url: Self::endpoint(ws_base, token),
            policy,
            dispatcher: Dispatcher::new(),
            reconnect: Mutex::new(ReconnectState::default()),
            outgoing: Mutex::new(None),
            disposed: AtomicBool::new(false),
            status: Store::default(),
        }
    }

    pub fn endpoint(ws_base: &str, token: &str) -> String {
        format!(
            "{}/ws?token={}",
            ws_base.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn status(&self) -> &Store<ConnectionStatus> {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.outgoing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(false, |tx| !tx.is_closed())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .attempts()
    }

    pub fn on(&self, kind: &str, handler: Handler) -> Handler {
        self.dispatcher.on(kind, handler)
    }

    pub fn on_fn<F>(&self, kind: &str, f: F) -> Handler
    where
        F: Fn(&Frame) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.dispatcher.on_fn(kind, f)
    }

    pub fn off(&self, kind: &str, handler: &Handler) -> bool {
        self.dispatcher.off(kind, handler)
    }

    /// Socket is open. Resets the retry budget and hands the driver the
    /// queue it must drain into the socket.
    pub fn opened(&self) -> mpsc::UnboundedReceiver<Outgoing> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.outgoing.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        self.reconnect
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reset();

        tracing::info!("Realtime channel connected");
        self.status.replace(ConnectionStatus::Connected);
        rx
    }

    /// Socket closed or failed to open. Returns the delay before the next
    /// attempt, or `None` when the driver must stop.
    pub fn closed(&self) -> Option<Duration> {
        self.outgoing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if self.is_disposed() {
            return None;
        }

        let (delay, attempt) = {
            let mut state = self.reconnect.lock().unwrap_or_else(|e| e.into_inner());
            let delay = state.next_delay(&self.policy);
            (delay, state.attempts())
        };

        match delay {
            Some(delay) => {
                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Realtime channel closed, scheduling reconnect"
                );
                self.status
                    .replace(ConnectionStatus::Reconnecting { attempt });
                Some(delay)
            }
            None => {
                tracing::error!(
                    max_attempts = self.policy.max_attempts,
                    "Max reconnect attempts reached"
                );
                self.status.replace(ConnectionStatus::GaveUp);
                None
            }
        }
    }

    /// Decode and dispatch one inbound text frame
    pub fn handle_text(&self, text: &str) -> Option<DispatchReport> {
        match Frame::decode(text) {
            Ok(frame) => Some(self.dispatcher.dispatch(&frame)),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable realtime frame");
                None
            }
        }
    }

    /// Write a frame if the socket is open; never queued for later
    pub fn send(&self, frame: &Frame) -> ClientResult<()> {
        let text = frame.encode()?;
        let guard = self.outgoing.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = guard.as_ref() else {
            tracing::warn!(frame_type = %frame.kind, "Realtime channel not connected, frame not sent");
            return Err(ClientError::NotConnected);
        };

        tx.send(Outgoing::Text(text)).map_err(|_| {
            tracing::warn!(frame_type = %frame.kind, "Realtime socket gone, frame not sent");
            ClientError::NotConnected
        })
    }

    pub fn send_outbound(&self, frame: OutboundFrame) -> ClientResult<()> {
        self.send(&frame.to_frame())
    }

    pub fn join_group(&self, group_id: GroupId) -> ClientResult<()> {
        self.send_outbound(OutboundFrame::JoinGroup(group_id))
    }

    pub fn leave_group(&self, group_id: GroupId) -> ClientResult<()> {
        self.send_outbound(OutboundFrame::LeaveGroup(group_id))
    }

    pub fn send_typing(&self, group_id: GroupId, is_typing: bool) -> ClientResult<()> {
        self.send_outbound(OutboundFrame::Typing {
            group_id,
            is_typing,
        })
    }

    /// Close the socket and suppress reconnection
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(tx) = self
            .outgoing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            let _ = tx.send(Outgoing::Close);
        }
        self.dispatcher.clear();
        self.status.replace(ConnectionStatus::Closed);
        tracing::info!("Realtime channel disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn channel(max_attempts: u32) -> RealtimeChannel {
        RealtimeChannel::new(
            "ws://localhost:8000/",
            "tok en",
            ReconnectPolicy {
                max_attempts,
                base_interval: Duration::from_millis(100),
            },
        )
    }

    #[test]
    fn test_endpoint_carries_token() {
        let ch = channel(5);
        assert_eq!(ch.url(), "ws://localhost:8000/ws?token=tok%20en");
    }

    #[test]
    fn test_send_while_disconnected_is_reported() {
        let ch = channel(5);
        let err = ch.join_group(1).unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[test]
    fn test_send_after_open() {
        let ch = channel(5);
        let mut rx = ch.opened();
        ch.send_typing(7, true).unwrap();

        match rx.try_recv().unwrap() {
            Outgoing::Text(text) => assert!(text.contains(r#""type":"typing""#)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(ch.is_connected());
    }

    #[test]
    fn test_five_closes_then_give_up() {
        let ch = channel(5);
        let mut delays = Vec::new();
        while let Some(delay) = ch.closed() {
            delays.push(delay.as_millis());
        }
        assert_eq!(delays, vec![100, 200, 300, 400, 500]);
        assert_eq!(ch.status().snapshot(), ConnectionStatus::GaveUp);
        assert_eq!(ch.closed(), None);
    }

    #[test]
    fn test_open_resets_attempts() {
        let ch = channel(5);
        ch.closed();
        ch.closed();
        assert_eq!(ch.reconnect_attempts(), 2);

        let _rx = ch.opened();
        assert_eq!(ch.reconnect_attempts(), 0);
        assert_eq!(ch.closed(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_dispose_stops_reconnect() {
        let ch = channel(5);
        let mut rx = ch.opened();
        ch.dispose();

        assert_eq!(rx.try_recv().unwrap(), Outgoing::Close);
        assert_eq!(ch.closed(), None);
        assert_eq!(ch.status().snapshot(), ConnectionStatus::Closed);
    }

    #[test]
    fn test_bad_frame_dropped() {
        let ch = channel(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        ch.on_fn("message", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(ch.handle_text("not json").is_none());
        assert!(ch.handle_text(r#"{"no_type": true}"#).is_none());
        let report = ch.handle_text(r#"{"type": "message", "data": {}}"#).unwrap();

        assert_eq!(report.invoked, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
