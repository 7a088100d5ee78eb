//! State Management
//!
//! Global application state bridging the client core's stores into
//! signals, plus the browser implementations of the core's platform seams.

pub mod global;
pub mod storage;
pub mod websocket;

pub use global::{provide_global_state, scoped_cancel, GlobalState};
