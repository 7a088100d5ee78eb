//! GroupChat AI
//!
//! Browser front end for the AI-assisted group chat, built with Leptos (WASM).
//!
//! # Features
//!
//! - Email/password and Google sign-in
//! - Group list, group creation and invitations
//! - Live chat over the realtime channel with typing indicators
//! - Notification dropdown with polling
//! - Credit balance and per-model pricing
//!
//! # Architecture
//!
//! A client-side rendered (CSR) Leptos application. All backend traffic
//! and client state live in the `groupchat` core crate; this crate supplies
//! the browser storage, navigation and WebSocket driver and renders the
//! stores through signals.

use leptos::*;

mod app;
mod components;
mod logging;
mod pages;
mod state;

fn main() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();
    logging::init();

    mount_to_body(|| view! { <app::App /> });
}
