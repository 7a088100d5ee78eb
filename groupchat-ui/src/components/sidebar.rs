//! Group Sidebar
//!
//! The user's groups; clicking one makes it the active conversation.

use groupchat::models::Group;
use leptos::*;

use super::ListSkeleton;
use crate::state::GlobalState;

#[component]
pub fn Sidebar() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let show_modal = state.show_create_group;

    let snapshot = {
        let state = state.clone();
        move || {
            state.groups_rev.track();
            state.client.groups().store().snapshot()
        }
    };

    view! {
        <aside class="w-72 bg-white border-r border-gray-200 flex flex-col">
            <div class="flex items-center justify-between px-4 py-3 border-b border-gray-200">
                <h2 class="font-semibold text-gray-900">"Groups"</h2>
                <button
                    on:click=move |_| show_modal.set(true)
                    title="Create group"
                    class="w-8 h-8 flex items-center justify-center rounded-full bg-blue-600
                           hover:bg-blue-700 text-white text-lg"
                >
                    "+"
                </button>
            </div>

            <div class="flex-1 overflow-y-auto">
                {move || {
                    let groups = snapshot();
                    if groups.loading && groups.groups.is_empty() {
                        return view! { <ListSkeleton count=4 /> }.into_view();
                    }
                    if groups.groups.is_empty() {
                        return view! {
                            <div class="p-6 text-center text-sm text-gray-500">
                                <p>"No groups yet."</p>
                                <p>"Create one or accept an invitation."</p>
                            </div>
                        }
                        .into_view();
                    }
                    let selected = groups.selected;
                    groups
                        .groups
                        .into_iter()
                        .map(|group| {
                            let active = selected == Some(group.id);
                            view! { <GroupRow group=group active=active /> }
                        })
                        .collect_view()
                }}
            </div>
        </aside>
    }
}

#[component]
fn GroupRow(group: Group, active: bool) -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let id = group.id;
    let initial = group
        .name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default();

    let row_class = if active {
        "w-full flex items-center space-x-3 px-4 py-3 text-left bg-blue-50 border-l-4 border-blue-600"
    } else {
        "w-full flex items-center space-x-3 px-4 py-3 text-left hover:bg-gray-50 border-l-4 border-transparent"
    };

    view! {
        <button class=row_class on:click=move |_| state.client.select_group(Some(id))>
            <div class="w-10 h-10 rounded-full bg-blue-100 text-blue-700 flex items-center justify-center font-semibold">
                {initial}
            </div>
            <div class="flex-1 min-w-0">
                <div class="flex items-center space-x-1">
                    <span class="font-medium text-gray-900 truncate">{group.name.clone()}</span>
                    {group.is_private.then(|| view! { <span title="Private">"🔒"</span> })}
                    {group.ai_enabled.then(|| view! { <span title="AI enabled">"🤖"</span> })}
                </div>
                <p class="text-xs text-gray-500">
                    {format!("{} member{}", group.member_count, if group.member_count == 1 { "" } else { "s" })}
                </p>
            </div>
        </button>
    }
}
