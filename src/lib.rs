//! # GroupChat
//!
//! Client core for an AI-assisted group chat service: REST API client,
//! realtime channel, observable stores and the session lifecycle that ties
//! them together. Shared by the terminal client and the browser front end.
//!
//! ## Modules
//!
//! - [`api`]: REST client for the backend's `/api/v1` endpoints
//! - [`realtime`]: WebSocket channel with typed dispatch and bounded reconnect
//! - [`store`]: session, groups, chat and notification stores plus persistence
//! - [`client`]: facade running the session lifecycle
//! - [`config`]: TOML configuration with `GROUPCHAT_*` overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use groupchat::{CancellationToken, Config, GroupChatClient, NoopNavigator};
//! use groupchat::realtime::native::TokioConnector;
//! use groupchat::store::MemoryStorage;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GroupChatClient::new(
//!         Config::from_env(),
//!         Arc::new(MemoryStorage::new()),
//!         Arc::new(NoopNavigator),
//!         Arc::new(TokioConnector),
//!     )?;
//!
//!     let cancel = CancellationToken::new();
//!     client.login("ada@example.com", "secret", &cancel).await?;
//!     client.fetch_groups(&cancel).await?;
//!
//!     for group in client.groups().groups() {
//!         println!("{} ({} members)", group.name, group.member_count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod credits;
pub mod display;
pub mod error;
pub mod google;
pub mod models;
pub mod realtime;
pub mod store;

#[cfg(not(target_arch = "wasm32"))]
pub mod logging;

pub use client::{GroupChatClient, Navigator, NoopNavigator};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use tokio_util::sync::{CancellationToken, DropGuard};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
