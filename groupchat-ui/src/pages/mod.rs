//! Pages
//!
//! Top-level page components for each route.

pub mod chat;
pub mod credits;
pub mod google_callback;
pub mod login;

pub use chat::Chat;
pub use credits::Credits;
pub use google_callback::GoogleCallback;
pub use login::Login;
