//! Chat Window
//!
//! History, typing indicator and composer for the selected group.

use chrono::Utc;
use gloo_timers::callback::{Interval, Timeout};
use groupchat::display::{message_time, typing_line};
use groupchat::models::{GroupId, GroupMember, Message, UserId};
use groupchat::store::TypingAnnouncer;
use groupchat::GroupChatClient;
use leptos::html::Div;
use leptos::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::{InlineLoading, Loading};
use crate::state::{scoped_cancel, GlobalState};

/// Idle time after the last keystroke before "stopped typing" is sent
const TYPING_IDLE_MS: u32 = 3000;

#[component]
pub fn ChatWindow() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");

    // Changes only when another group is picked, not on every list update
    let selected = create_memo(move |_| {
        state.groups_rev.track();
        state.client.groups().selected()
    });

    move || match selected.get() {
        Some(group_id) => view! { <Conversation group_id=group_id /> }.into_view(),
        None => view! { <NoGroupSelected /> }.into_view(),
    }
}

#[component]
fn NoGroupSelected() -> impl IntoView {
    view! {
        <div class="flex-1 flex items-center justify-center bg-gray-50">
            <div class="text-center text-gray-500">
                <div class="text-5xl mb-4">"💬"</div>
                <h2 class="text-xl font-semibold text-gray-700">"Welcome to GroupChat"</h2>
                <p>"Select a group from the sidebar to start chatting"</p>
            </div>
        </div>
    }
}

/// One group's conversation; torn down (and its requests cancelled) on switch
#[component]
fn Conversation(group_id: GroupId) -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let client = Arc::clone(&state.client);
    let cancel = scoped_cancel();
    let chat_rev = state.chat_rev;
    let groups_rev = state.groups_rev;

    // First page and member list
    {
        let state = state.clone();
        let cancel = cancel.clone();
        spawn_local(async move {
            if let Err(e) = state.client.chat().fetch_messages(group_id, 1, &cancel).await {
                state.report(&e, "Failed to fetch messages");
            }
            let _ = state.client.chat().fetch_members(group_id, &cancel).await;
        });
    }

    // Join/leave notices mark the member list stale
    let refreshing_members = store_value(false);
    {
        let client = Arc::clone(&client);
        let cancel = cancel.clone();
        create_effect(move |_| {
            chat_rev.track();
            if !client.chat().members_stale(group_id) || refreshing_members.get_value() {
                return;
            }
            refreshing_members.set_value(true);
            let client = Arc::clone(&client);
            let cancel = cancel.clone();
            spawn_local(async move {
                let _ = client.chat().fetch_members(group_id, &cancel).await;
                refreshing_members.set_value(false);
            });
        });
    }

    // Typing indicators expire without any frame arriving
    let now = create_rw_signal(Utc::now());
    {
        let client = Arc::clone(&client);
        let ticker = Interval::new(1000, move || {
            let at = Utc::now();
            client.chat().prune_typing(at);
            now.set(at);
        });
        on_cleanup(move || drop(ticker));
    }

    let group = {
        let client = Arc::clone(&client);
        move || {
            groups_rev.track();
            client.groups().get(group_id)
        }
    };

    let messages = {
        let client = Arc::clone(&client);
        move || {
            chat_rev.track();
            client.chat().messages(group_id)
        }
    };

    let typing = {
        let client = Arc::clone(&client);
        move || {
            chat_rev.track();
            let ids = client.chat().typing_users(group_id, now.get());
            let members = client.chat().members(group_id);
            let names: Vec<String> = ids.into_iter().map(|id| member_name(&members, id)).collect();
            typing_line(&names)
        }
    };

    let chat_state = {
        let client = Arc::clone(&client);
        move || {
            chat_rev.track();
            client.chat().store().read(|s| {
                (
                    s.loading_messages,
                    s.cursors.get(&group_id).map_or(true, |c| c.has_more),
                    s.messages.contains_key(&group_id),
                )
            })
        }
    };

    // Keep the newest message in view
    let end_ref = create_node_ref::<Div>();
    {
        let messages = messages.clone();
        create_effect(move |_| {
            let count = messages().len();
            if let Some(end) = end_ref.get() {
                end.scroll_into_view();
            }
            count
        });
    }

    let load_older = {
        let state = state.clone();
        let cancel = cancel.clone();
        move |_: ev::MouseEvent| {
            let state = state.clone();
            let cancel = cancel.clone();
            spawn_local(async move {
                if let Err(e) = state.client.chat().load_more(group_id, &cancel).await {
                    state.report(&e, "Failed to fetch messages");
                }
            });
        }
    };

    let on_leave = {
        let state = state.clone();
        let cancel = cancel.clone();
        move |_: ev::MouseEvent| {
            let state = state.clone();
            let cancel = cancel.clone();
            spawn_local(async move {
                match state.client.leave_group(group_id, &cancel).await {
                    Ok(()) => state.show_success("Left group"),
                    Err(e) => state.report(&e, "Failed to leave group"),
                }
            });
        }
    };

    let current_user = client.current_user_id();

    view! {
        <section class="flex-1 flex flex-col bg-gray-50 min-w-0">
            // Header
            {move || group().map(|g| view! {
                <header class="bg-white border-b border-gray-200 px-6 py-3 flex items-center justify-between">
                    <div class="min-w-0">
                        <h2 class="text-lg font-semibold text-gray-900 truncate">{g.name.clone()}</h2>
                        <p class="text-sm text-gray-500 truncate">
                            {format!("{} members", g.member_count)}
                            {g.description.clone().filter(|d| !d.is_empty()).map(|d| format!(" · {}", d))}
                        </p>
                    </div>
                    <div class="flex items-center space-x-3">
                        {g.ai_enabled.then(|| view! {
                            <span class="px-2 py-1 text-xs rounded-full bg-purple-100 text-purple-700">
                                {format!("AI: {}", g.ai_model.clone().unwrap_or_else(|| "enabled".to_string()))}
                            </span>
                        })}
                    </div>
                </header>
            })}
            <div class="bg-white px-6 pb-2 flex justify-end">
                <button on:click=on_leave class="text-xs text-red-600 hover:underline">"Leave group"</button>
            </div>

            // History
            <div class="flex-1 overflow-y-auto p-4 space-y-4 scrollbar-thin">
                {move || {
                        let (loading, has_more, loaded) = chat_state();
                        if !loaded && loading {
                            return view! { <Loading /> }.into_view();
                        }
                        (has_more && loaded).then(|| view! {
                            <div class="flex justify-center">
                                <button
                                    on:click=load_older.clone()
                                    disabled=loading
                                    class="text-sm text-blue-600 hover:underline disabled:text-gray-400"
                                >
                                    {if loading { "Loading..." } else { "Load older messages" }}
                                </button>
                            </div>
                        })
                        .into_view()
                }}

                {move || {
                    let list = messages();
                    if list.is_empty() {
                        return view! {
                            <p class="text-center text-gray-400 text-sm py-8">
                                "No messages yet. Say hello!"
                            </p>
                        }
                        .into_view();
                    }
                    list.into_iter()
                        .map(|message| {
                            let own = current_user == Some(message.user_id) && !message.is_ai_message;
                            view! { <MessageBubble message=message own=own /> }
                        })
                        .collect_view()
                }}

                {move || typing().map(|line| view! {
                    <p class="text-sm text-gray-500 italic">{line}</p>
                })}

                <div node_ref=end_ref />
            </div>

            <Composer group_id=group_id client=client />
        </section>
    }
}

#[component]
fn MessageBubble(message: Message, own: bool) -> impl IntoView {
    let (row, bubble) = if own {
        ("flex justify-end", "bg-blue-600 text-white")
    } else if message.is_ai_message {
        ("flex justify-start", "bg-purple-50 border border-purple-200 text-gray-900")
    } else {
        ("flex justify-start", "bg-white border border-gray-200 text-gray-900")
    };
    let author = message.author_name();
    let time = message_time(message.created_at);
    let credits = message
        .credits_used
        .filter(|c| *c > 0.0)
        .map(|c| format!(" · {:.2} credits", c));

    view! {
        <div class=row>
            <div class=format!("max-w-lg rounded-2xl px-4 py-2 shadow-sm {}", bubble)>
                {(!own).then(|| view! {
                    <p class="text-xs font-semibold mb-1 opacity-75">
                        {message.is_ai_message.then_some("🤖 ")}
                        {author}
                    </p>
                })}
                <p class="whitespace-pre-wrap break-words">{message.content.clone()}</p>
                <p class="text-xs mt-1 opacity-60 text-right">
                    {time}
                    {credits}
                    {message.edited_at.map(|_| " · edited")}
                </p>
            </div>
        </div>
    }
}

/// Message input with typing notifications
#[component]
fn Composer(group_id: GroupId, client: Arc<GroupChatClient>) -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let cancel = scoped_cancel();
    let draft = create_rw_signal(String::new());
    let sending = create_rw_signal(false);
    let announcer: Rc<RefCell<TypingAnnouncer>> = Rc::default();
    let idle_timer: Rc<RefCell<Option<Timeout>>> = Rc::default();

    let stop_typing = {
        let client = Arc::clone(&client);
        let announcer = Rc::clone(&announcer);
        move || {
            if announcer.borrow_mut().stop() {
                let _ = client.send_typing(group_id, false);
            }
        }
    };

    // Pending "stopped typing" timer is dropped, which clears it
    let settle_typing = {
        let idle_timer = Rc::clone(&idle_timer);
        let stop_typing = stop_typing.clone();
        move || {
            idle_timer.borrow_mut().take();
            stop_typing();
        }
    };

    // Announce while keystrokes continue, retract after a quiet spell
    let on_input = {
        let client = Arc::clone(&client);
        let settle_typing = settle_typing.clone();
        move |ev: ev::Event| {
            let value = event_target_value(&ev);
            let has_text = !value.trim().is_empty();
            draft.set(value);

            if !has_text {
                settle_typing();
                return;
            }
            let announce = announcer.borrow_mut().on_keystroke(Utc::now());
            if announce && client.send_typing(group_id, true).is_err() {
                announcer.borrow_mut().stop();
            }
            let stop_typing = stop_typing.clone();
            *idle_timer.borrow_mut() = Some(Timeout::new(TYPING_IDLE_MS, stop_typing));
        }
    };

    let send = {
        let state = state.clone();
        let cancel = cancel.clone();
        let settle_typing = settle_typing.clone();
        move || {
            let content = draft.get_untracked();
            if content.trim().is_empty() || sending.get_untracked() {
                return;
            }
            settle_typing();
            sending.set(true);

            let state = state.clone();
            let cancel = cancel.clone();
            spawn_local(async move {
                match state.client.chat().send_message(group_id, &content, &cancel).await {
                    Ok(_) => draft.set(String::new()),
                    Err(e) => state.report(&e, "Failed to send message"),
                }
                sending.set(false);
            });
        }
    };

    let on_submit = {
        let send = send.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            send();
        }
    };

    // Enter sends, Shift+Enter breaks the line
    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    on_cleanup(settle_typing);

    view! {
        <form on:submit=on_submit class="bg-white border-t border-gray-200 p-4 flex items-end space-x-3">
            <textarea
                rows="1"
                placeholder="Type a message..."
                class="flex-1 resize-none border border-gray-300 rounded-lg px-3 py-2
                       focus:outline-none focus:ring-2 focus:ring-blue-500"
                prop:value=move || draft.get()
                on:input=on_input
                on:keydown=on_keydown
            />
            <button
                type="submit"
                disabled=move || sending.get() || draft.get().trim().is_empty()
                class="px-4 py-2 bg-blue-600 hover:bg-blue-700 disabled:bg-gray-400 text-white rounded-lg
                       font-medium flex items-center space-x-2"
            >
                {move || if sending.get() {
                    view! { <InlineLoading /> }.into_view()
                } else {
                    view! { <span>"Send"</span> }.into_view()
                }}
            </button>
        </form>
    }
}

/// Username of a group member, for the typing line
fn member_name(members: &[GroupMember], user_id: UserId) -> String {
    members
        .iter()
        .find(|m| m.user_id == user_id)
        .and_then(|m| m.user.as_ref())
        .map(|u| u.full_name.clone().unwrap_or_else(|| u.username.clone()))
        .unwrap_or_else(|| format!("User {}", user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(user_id: UserId, username: &str) -> GroupMember {
        serde_json::from_value(serde_json::json!({
            "id": user_id * 10, "user_id": user_id, "group_id": 7, "role": "member",
            "joined_at": "2024-03-01T10:00:00Z",
            "user": {"id": user_id, "username": username}
        }))
        .unwrap()
    }

    #[test]
    fn test_member_name_lookup() {
        let members = vec![member(1, "alice"), member(2, "bob")];
        assert_eq!(member_name(&members, 2), "bob");
        assert_eq!(member_name(&members, 9), "User 9");
    }
}
