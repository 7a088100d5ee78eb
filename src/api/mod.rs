//! GroupChat REST API
//!
//! Typed client for the backend's `/api/v1` surface.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /auth/login`, `POST /auth/register`, `POST /auth/google`
//! - `GET /auth/me`, `POST /auth/refresh`
//!
//! ## Groups
//! - `GET/POST /groups/`, `GET/PUT/DELETE /groups/:id`
//! - `POST /groups/:id/join`, `POST /groups/:id/leave`, `POST /groups/:id/invite`
//! - `GET /groups/:id/members`, `PUT/DELETE /groups/:id/members/:user_id`
//!
//! ## Messages
//! - `GET/POST /groups/:id/messages`, `PUT/DELETE /messages/:id`
//!
//! ## Users
//! - `GET /users/`, `GET /users/:id`, `PUT /users/me`
//! - `GET/POST /users/credits`
//!
//! ## Notifications
//! - `GET /notifications/`, `GET /notifications/count`
//! - `PUT /notifications/:id/read`, `PUT /notifications/read-all`
//! - `POST /invitations/:id/accept`

mod auth;
pub mod client;
pub mod dto;
mod groups;
mod messages;
#[cfg(test)]
pub(crate) mod mock;
mod notifications;
mod users;

pub use client::{with_cancel, ApiClient, UnauthorizedHook, API_PREFIX};
pub use dto::{
    CreateGroupRequest, InvitationAccepted, MessagePage, ProfileUpdate, RegisterRequest,
    TokenResponse, UpdateGroupRequest,
};
