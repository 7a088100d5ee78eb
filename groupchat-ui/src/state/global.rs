//! Global Application State
//!
//! The client core keeps all chat state in observable stores. Each store
//! bumps a revision signal on change; views track the revision and read a
//! fresh snapshot from the core.

use groupchat::realtime::ConnectionStatus;
use groupchat::store::Listener;
use groupchat::{CancellationToken, ClientError, ClientResult, Config, GroupChatClient, Navigator};
use leptos::*;
use std::sync::{Arc, Weak};

use super::storage::LocalStorage;
use super::websocket::BrowserConnector;

/// Where the router mounts the login page
pub const LOGIN_PATH: &str = "/auth/login";

/// Global application state provided to all components
#[derive(Clone)]
pub struct GlobalState {
    /// Client core: API, stores, realtime channel
    pub client: Arc<GroupChatClient>,
    /// Bumped whenever the session store changes
    pub session_rev: RwSignal<u64>,
    pub groups_rev: RwSignal<u64>,
    pub chat_rev: RwSignal<u64>,
    pub notifications_rev: RwSignal<u64>,
    /// Realtime connection status
    pub ws_status: RwSignal<ConnectionStatus>,
    /// Create-group dialog visibility
    pub show_create_group: RwSignal<bool>,
    /// Error message to display
    pub error: RwSignal<Option<String>>,
    /// Success message (for toasts)
    pub success: RwSignal<Option<String>>,
}

/// Sends the browser to the login page after a forced logout
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn go_to_login(&self) {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.location().set_href(LOGIN_PATH) {
                tracing::warn!(error = ?e, "Redirect to login failed");
            }
        }
    }
}

/// Build-time configuration, e.g. `GROUPCHAT_API_URL=... trunk build`
fn build_env(key: &str) -> Option<String> {
    let value = match key {
        "GROUPCHAT_API_URL" => option_env!("GROUPCHAT_API_URL"),
        "GROUPCHAT_WS_URL" => option_env!("GROUPCHAT_WS_URL"),
        "GROUPCHAT_GOOGLE_CLIENT_ID" => option_env!("GROUPCHAT_GOOGLE_CLIENT_ID"),
        "GROUPCHAT_ENABLE_AI_CHAT" => option_env!("GROUPCHAT_ENABLE_AI_CHAT"),
        "GROUPCHAT_ENABLE_GOOGLE_AUTH" => option_env!("GROUPCHAT_ENABLE_GOOGLE_AUTH"),
        "GROUPCHAT_APP_NAME" => option_env!("GROUPCHAT_APP_NAME"),
        "GROUPCHAT_APP_VERSION" => option_env!("GROUPCHAT_APP_VERSION"),
        _ => None,
    };
    value.map(str::to_string)
}

/// Provide global state to the component tree and resume a saved session
pub fn provide_global_state() -> ClientResult<()> {
    let client = GroupChatClient::new(
        Config::from_lookup(build_env),
        Arc::new(LocalStorage),
        Arc::new(BrowserNavigator),
        Arc::new(BrowserConnector),
    )?;

    let state = GlobalState {
        client,
        session_rev: create_rw_signal(0),
        groups_rev: create_rw_signal(0),
        chat_rev: create_rw_signal(0),
        notifications_rev: create_rw_signal(0),
        ws_status: create_rw_signal(ConnectionStatus::Closed),
        show_create_group: create_rw_signal(false),
        error: create_rw_signal(None),
        success: create_rw_signal(None),
    };

    state.bind_stores();
    if state.client.restore() {
        state.watch_realtime();
    }

    provide_context(state);
    Ok(())
}

/// Token cancelled when the calling component is torn down
pub fn scoped_cancel() -> CancellationToken {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    on_cleanup(move || drop(guard));
    token
}

fn bump(signal: RwSignal<u64>) -> Listener {
    Arc::new(move || signal.update(|rev| *rev = rev.wrapping_add(1)))
}

impl GlobalState {
    fn bind_stores(&self) {
        let client = &self.client;
        client.session().store().subscribe(bump(self.session_rev));
        client.groups().store().subscribe(bump(self.groups_rev));
        client.chat().store().subscribe(bump(self.chat_rev));
        client.notifications().store().subscribe(bump(self.notifications_rev));
    }

    /// Follow the status of the channel opened for the current session
    pub fn watch_realtime(&self) {
        let Some(channel) = self.client.realtime() else {
            self.ws_status.set(ConnectionStatus::Closed);
            return;
        };

        let status = self.ws_status;
        status.set(channel.status().snapshot());

        let weak = Arc::downgrade(&channel);
        channel.status().subscribe(Arc::new(move || {
            if let Some(channel) = Weak::upgrade(&weak) {
                status.set(channel.status().snapshot());
            }
        }));
    }

    /// Tracked read of the authentication flag
    pub fn is_authenticated(&self) -> bool {
        self.session_rev.track();
        self.client.is_authenticated()
    }

    pub fn logout(&self) {
        self.client.logout();
        self.ws_status.set(ConnectionStatus::Closed);
    }

    /// Show a success message (auto-clears after timeout)
    pub fn show_success(&self, message: &str) {
        self.success.set(Some(message.to_string()));

        let success_signal = self.success;
        gloo_timers::callback::Timeout::new(3000, move || {
            success_signal.set(None);
        })
        .forget();
    }

    /// Show an error message (auto-clears after timeout)
    pub fn show_error(&self, message: &str) {
        self.error.set(Some(message.to_string()));

        let error_signal = self.error;
        gloo_timers::callback::Timeout::new(5000, move || {
            error_signal.set(None);
        })
        .forget();
    }

    /// Toast a failed action; cancellations stay silent
    pub fn report(&self, error: &ClientError, fallback: &str) {
        if error.is_cancelled() {
            return;
        }
        self.show_error(&error.user_message(fallback));
    }

    pub fn clear_error(&self) {
        self.error.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_build_key() {
        assert_eq!(build_env("GROUPCHAT_NOT_A_KEY"), None);
    }

    #[test]
    fn test_build_config_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.app.name, "GroupChatAI");
    }
}
