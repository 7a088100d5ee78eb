//! Navigation Bar
//!
//! Brand, connection status, credit balance, notifications and logout.

use groupchat::credits::format_credits;
use groupchat::realtime::ConnectionStatus;
use leptos::*;
use leptos_router::*;

use super::NotificationDropdown;
use crate::state::global::LOGIN_PATH;
use crate::state::GlobalState;

#[component]
pub fn Navbar() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let navigate = use_navigate();
    let app_name = state.client.config().app.name.clone();

    let user = {
        let state = state.clone();
        move || {
            state.session_rev.track();
            state.client.session().user()
        }
    };
    let credits = {
        let user = user.clone();
        move || format_credits(user().map_or(0.0, |u| u.credits))
    };
    let display_name = move || user().map(|u| u.display_name().to_string()).unwrap_or_default();

    let on_logout = {
        let state = state.clone();
        move |_: ev::MouseEvent| {
            state.logout();
            state.show_success("Logged out");
            navigate(LOGIN_PATH, Default::default());
        }
    };

    view! {
        <nav class="bg-white border-b border-gray-200 shadow-sm">
            <div class="px-4">
                <div class="flex items-center justify-between h-16">
                    <div class="flex items-center space-x-3">
                        <A href="/chat" class="text-xl font-bold text-gray-900">{app_name}</A>
                        <ConnectionDot />
                    </div>

                    <div class="flex items-center space-x-4">
                        <A
                            href="/credits"
                            class="flex items-center space-x-1 px-3 py-1 rounded-full bg-yellow-50
                                   text-yellow-700 text-sm font-medium hover:bg-yellow-100"
                        >
                            <span>"💰"</span>
                            <span>{credits}</span>
                        </A>

                        <NotificationDropdown />

                        <span class="text-sm text-gray-700 hidden sm:inline">{display_name}</span>

                        <button
                            on:click=on_logout
                            class="px-3 py-1 text-sm text-gray-600 hover:text-gray-900 hover:bg-gray-100 rounded-lg"
                        >
                            "Logout"
                        </button>
                    </div>
                </div>
            </div>
        </nav>
    }
}

/// Realtime status indicator
#[component]
fn ConnectionDot() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let status = state.ws_status;

    move || {
        let (dot, label) = match status.get() {
            ConnectionStatus::Connected => ("bg-green-500", "Live".to_string()),
            ConnectionStatus::Connecting => ("bg-yellow-400", "Connecting".to_string()),
            ConnectionStatus::Reconnecting { attempt } => {
                ("bg-yellow-400", format!("Reconnecting ({})", attempt))
            }
            ConnectionStatus::GaveUp => ("bg-red-500", "Offline".to_string()),
            ConnectionStatus::Closed => ("bg-gray-400", "Disconnected".to_string()),
        };
        view! {
            <span class="flex items-center space-x-1 text-xs text-gray-500">
                <span class=format!("w-2 h-2 rounded-full {}", dot) />
                <span>{label}</span>
            </span>
        }
    }
}
