//! Google Callback Page
//!
//! Runs inside the sign-in popup. Google redirects here with an ID token
//! (or an error) in the URL; the page posts it to the opener and closes.

use groupchat::google::{self, GoogleAuthMessage};
use groupchat::store::session::NO_GOOGLE_CREDENTIAL;
use leptos::*;
use wasm_bindgen::{JsCast, JsValue};

#[component]
pub fn GoogleCallback() -> impl IntoView {
    let (status, set_status) = create_signal("Processing authentication...".to_string());

    create_effect(move |_| {
        let message = read_redirect();
        if let GoogleAuthMessage::Error { error } = &message {
            tracing::warn!(%error, "Google redirect carried an error");
        }
        match post_to_opener(&message) {
            Ok(()) => {
                if let Some(window) = web_sys::window() {
                    let _ = window.close();
                }
            }
            Err(reason) => set_status.set(reason),
        }
    });

    view! {
        <div class="min-h-screen flex items-center justify-center bg-gray-50">
            <div class="text-center space-y-4">
                <div class="loading-spinner w-8 h-8 mx-auto" />
                <p class="text-gray-600">{move || status.get()}</p>
            </div>
        </div>
    }
}

fn read_redirect() -> GoogleAuthMessage {
    let location = web_sys::window().map(|w| w.location());
    let fragment = location
        .as_ref()
        .and_then(|l| l.hash().ok())
        .unwrap_or_default();
    let query = location
        .as_ref()
        .and_then(|l| l.search().ok())
        .unwrap_or_default();

    google::parse_callback(&fragment, &query).unwrap_or_else(|| GoogleAuthMessage::Error {
        error: NO_GOOGLE_CREDENTIAL.to_string(),
    })
}

fn post_to_opener(message: &GoogleAuthMessage) -> Result<(), String> {
    let window = web_sys::window().ok_or("No browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| "Unknown page origin".to_string())?;

    let opener: web_sys::Window = window
        .opener()
        .ok()
        .filter(|o| !o.is_null() && !o.is_undefined())
        .and_then(|o| o.dyn_into().ok())
        .ok_or("This page must be opened from the sign-in window")?;

    let payload = serde_json::to_string(message).map_err(|e| e.to_string())?;
    opener
        .post_message(&JsValue::from_str(&payload), &origin)
        .map_err(|_| "Could not reach the sign-in window".to_string())
}
