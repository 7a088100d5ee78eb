//! Create Group Dialog

use groupchat::api::CreateGroupRequest;
use groupchat::store::groups::{validate_create, AI_MODELS, DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS};
use leptos::*;

use super::InlineLoading;
use crate::state::{scoped_cancel, GlobalState};

#[component]
pub fn CreateGroupModal() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let cancel = scoped_cancel();
    let ai_available = state.client.config().features.enable_ai_chat;
    let show = state.show_create_group;

    let name = create_rw_signal(String::new());
    let description = create_rw_signal(String::new());
    let is_private = create_rw_signal(false);
    let ai_enabled = create_rw_signal(false);
    let ai_model = create_rw_signal(AI_MODELS[0].0.to_string());
    let submitting = create_rw_signal(false);
    let form_error = create_rw_signal(None::<String>);

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if submitting.get_untracked() {
            return;
        }

        let description = description.get_untracked();
        let ai = ai_available && ai_enabled.get_untracked();
        let request = CreateGroupRequest {
            name: name.get_untracked().trim().to_string(),
            description: Some(description.trim().to_string()).filter(|d| !d.is_empty()),
            is_private: is_private.get_untracked(),
            ai_enabled: ai,
            ai_model: ai.then(|| ai_model.get_untracked()),
        };
        if let Err(e) = validate_create(&request) {
            form_error.set(Some(e.to_string()));
            return;
        }

        submitting.set(true);
        form_error.set(None);
        let state = state.clone();
        let cancel = cancel.clone();
        spawn_local(async move {
            match state.client.create_group(&request, &cancel).await {
                Ok(group) => {
                    state.show_success(&format!("Created {}", group.name));
                    state.client.select_group(Some(group.id));
                    show.set(false);
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => form_error.set(Some(e.user_message("Failed to create group"))),
            }
            submitting.set(false);
        });
    };

    view! {
        <div class="fixed inset-0 z-40 bg-black/40 flex items-center justify-center px-4">
            <div class="w-full max-w-lg bg-white rounded-xl shadow-xl">
                <div class="flex items-center justify-between px-6 py-4 border-b">
                    <h2 class="text-lg font-semibold text-gray-900">"Create New Group"</h2>
                    <button on:click=move |_| show.set(false) class="text-gray-400 hover:text-gray-600 text-xl">
                        "×"
                    </button>
                </div>

                <form on:submit=on_submit class="px-6 py-4 space-y-4">
                    {move || form_error.get().map(|message| view! {
                        <div class="bg-red-50 border border-red-200 text-red-700 px-3 py-2 rounded text-sm">
                            {message}
                        </div>
                    })}

                    <label class="block">
                        <span class="block text-sm font-medium text-gray-700 mb-1">"Group name"</span>
                        <input
                            type="text"
                            maxlength=NAME_MAX_CHARS.to_string()
                            placeholder="e.g. Book Club"
                            class="w-full border border-gray-300 rounded-lg px-3 py-2"
                            prop:value=move || name.get()
                            on:input=move |ev| name.set(event_target_value(&ev))
                        />
                    </label>

                    <label class="block">
                        <span class="block text-sm font-medium text-gray-700 mb-1">"Description"</span>
                        <textarea
                            rows="3"
                            maxlength=DESCRIPTION_MAX_CHARS.to_string()
                            placeholder="What is this group about?"
                            class="w-full border border-gray-300 rounded-lg px-3 py-2 resize-none"
                            prop:value=move || description.get()
                            on:input=move |ev| description.set(event_target_value(&ev))
                        />
                        <span class="block text-xs text-gray-400 text-right">
                            {move || format!("{}/{}", description.get().chars().count(), DESCRIPTION_MAX_CHARS)}
                        </span>
                    </label>

                    <label class="flex items-center space-x-2">
                        <input
                            type="checkbox"
                            prop:checked=move || is_private.get()
                            on:change=move |ev| is_private.set(event_target_checked(&ev))
                        />
                        <span class="text-sm text-gray-700">"Private group (invite only)"</span>
                    </label>

                    {ai_available.then(|| view! {
                        <div class="rounded-lg border border-purple-200 bg-purple-50 p-3 space-y-3">
                            <label class="flex items-center space-x-2">
                                <input
                                    type="checkbox"
                                    prop:checked=move || ai_enabled.get()
                                    on:change=move |ev| ai_enabled.set(event_target_checked(&ev))
                                />
                                <span class="text-sm text-gray-700">"Enable AI assistant"</span>
                            </label>
                            <Show when=move || ai_enabled.get()>
                                <select
                                    class="w-full border border-gray-300 rounded-lg px-3 py-2 bg-white"
                                    on:change=move |ev| ai_model.set(event_target_value(&ev))
                                >
                                    {AI_MODELS
                                        .iter()
                                        .map(|(id, label)| {
                                            let id = *id;
                                            view! {
                                                <option value=id selected=move || ai_model.get() == id>
                                                    {*label}
                                                </option>
                                            }
                                        })
                                        .collect_view()}
                                </select>
                            </Show>
                        </div>
                    })}

                    <div class="flex justify-end space-x-3 pt-2">
                        <button
                            type="button"
                            on:click=move |_| show.set(false)
                            class="px-4 py-2 text-gray-700 hover:bg-gray-100 rounded-lg"
                        >
                            "Cancel"
                        </button>
                        <button
                            type="submit"
                            disabled=move || submitting.get()
                            class="px-4 py-2 bg-blue-600 hover:bg-blue-700 disabled:bg-gray-400 text-white
                                   rounded-lg font-medium flex items-center space-x-2"
                        >
                            {move || submitting.get().then(|| view! { <InlineLoading /> })}
                            <span>"Create Group"</span>
                        </button>
                    </div>
                </form>
            </div>
        </div>
    }
}
