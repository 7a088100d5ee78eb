//! Chat Page
//!
//! Navbar, group sidebar and the conversation of the selected group.

use leptos::*;

use crate::components::{ChatWindow, CreateGroupModal, Navbar, Sidebar};
use crate::state::{scoped_cancel, GlobalState};

#[component]
pub fn Chat() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let cancel = scoped_cancel();

    // Group list and the badge counter, once per visit
    {
        let state = state.clone();
        spawn_local(async move {
            if let Err(e) = state.client.fetch_groups(&cancel).await {
                state.report(&e, "Failed to fetch groups");
            }
            let _ = state.client.refresh_notification_count(&cancel).await;
        });
    }

    let show_modal = state.show_create_group;

    view! {
        <div class="h-screen flex flex-col">
            <Navbar />
            <div class="flex flex-1 overflow-hidden">
                <Sidebar />
                <ChatWindow />
            </div>
            <Show when=move || show_modal.get()>
                <CreateGroupModal />
            </Show>
        </div>
    }
}
