//! Realtime Channel
//!
//! One WebSocket per session, authenticated with the session token in the
//! query string, fanning typed frames out to subscribers.
//!
//! The channel itself ([`RealtimeChannel`]) holds no socket; a driver owns
//! the socket and reports lifecycle events back. Natively that driver is
//! [`native::run`]; the browser front end supplies its own.

pub mod channel;
pub mod dispatch;
pub mod frame;
pub mod reconnect;

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

use std::sync::Arc;

pub use channel::{ConnectionStatus, Outgoing, RealtimeChannel};
pub use dispatch::{DispatchReport, Dispatcher, Handler};
pub use frame::{kind, Frame, FrameError, InboundEvent, OutboundFrame};
pub use reconnect::{ReconnectPolicy, ReconnectState};

/// Starts a platform driver for a freshly created channel
pub trait RealtimeConnector: Send + Sync {
    fn start(&self, channel: Arc<RealtimeChannel>);
}

/// Leaves the channel disconnected; sends report `NotConnected`
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineConnector;

impl RealtimeConnector for OfflineConnector {
    fn start(&self, _channel: Arc<RealtimeChannel>) {
        tracing::debug!("Realtime disabled for this client");
    }
}
