//! UI Components
//!
//! Reusable Leptos components for the chat screens.

pub mod chat_window;
pub mod create_group_modal;
pub mod loading;
pub mod navbar;
pub mod notification_dropdown;
pub mod sidebar;
pub mod toast;

pub use chat_window::ChatWindow;
pub use create_group_modal::CreateGroupModal;
pub use loading::{InlineLoading, ListSkeleton, Loading};
pub use navbar::Navbar;
pub use notification_dropdown::NotificationDropdown;
pub use sidebar::Sidebar;
pub use toast::Toast;
