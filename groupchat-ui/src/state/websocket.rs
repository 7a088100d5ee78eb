//! Browser Realtime Driver
//!
//! Drives a [`RealtimeChannel`] with `web_sys::WebSocket`. The channel owns
//! the retry budget and frame dispatch; this module only moves bytes and
//! schedules the reconnect timer the channel asks for.

use groupchat::realtime::{Outgoing, RealtimeChannel, RealtimeConnector};
use leptos::spawn_local;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserConnector;

impl RealtimeConnector for BrowserConnector {
    fn start(&self, channel: Arc<RealtimeChannel>) {
        connect(channel);
    }
}

fn connect(channel: Arc<RealtimeChannel>) {
    if channel.is_disposed() {
        return;
    }

    match WebSocket::new(channel.url()) {
        Ok(ws) => setup_handlers(&ws, channel),
        Err(e) => {
            tracing::error!(error = ?e, "WebSocket connection failed");
            schedule_reconnect(channel);
        }
    }
}

fn setup_handlers(ws: &WebSocket, channel: Arc<RealtimeChannel>) {
    // On open
    let ch = Arc::clone(&channel);
    let socket = ws.clone();
    let on_open = Closure::wrap(Box::new(move |_: JsValue| {
        // Logged out while the handshake was in flight
        if ch.is_disposed() {
            let _ = socket.close();
            return;
        }
        let outgoing = ch.opened();
        spawn_local(pump(socket.clone(), outgoing));
    }) as Box<dyn FnMut(JsValue)>);
    ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
    on_open.forget();

    // On message
    let ch = Arc::clone(&channel);
    let on_message = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(text) = event.data().dyn_into::<js_sys::JsString>() {
            let text: String = text.into();
            ch.handle_text(&text);
        }
    }) as Box<dyn FnMut(MessageEvent)>);
    ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
    on_message.forget();

    // On close; a failed handshake also ends here
    let ch = Arc::clone(&channel);
    let on_close = Closure::wrap(Box::new(move |event: CloseEvent| {
        tracing::info!(code = event.code(), reason = %event.reason(), "WebSocket closed");
        schedule_reconnect(Arc::clone(&ch));
    }) as Box<dyn FnMut(CloseEvent)>);
    ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));
    on_close.forget();

    // On error
    let on_error = Closure::wrap(Box::new(move |_: JsValue| {
        tracing::warn!("WebSocket error");
    }) as Box<dyn FnMut(JsValue)>);
    ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    on_error.forget();
}

fn schedule_reconnect(channel: Arc<RealtimeChannel>) {
    let Some(delay) = channel.closed() else {
        return;
    };

    let delay_ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
    gloo_timers::callback::Timeout::new(delay_ms, move || {
        tracing::info!(
            attempt = channel.reconnect_attempts(),
            "Attempting realtime reconnect"
        );
        connect(channel);
    })
    .forget();
}

/// Write queued frames until the channel drops the queue or asks to close
async fn pump(ws: WebSocket, mut outgoing: UnboundedReceiver<Outgoing>) {
    while let Some(item) = outgoing.recv().await {
        match item {
            Outgoing::Text(text) => {
                if let Err(e) = ws.send_with_str(&text) {
                    tracing::warn!(error = ?e, "WebSocket send failed");
                }
            }
            Outgoing::Close => {
                let _ = ws.close();
                break;
            }
        }
    }
}
