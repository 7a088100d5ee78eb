//! Notification Dropdown
//!
//! Bell with an unread badge. The counter is polled while the navbar is
//! mounted; the list is fetched when the panel opens.

use chrono::Utc;
use gloo_timers::callback::Interval;
use groupchat::display::time_ago;
use groupchat::models::Notification;
use groupchat::store::notifications::badge_label;
use groupchat::store::NOTIFICATION_POLL_INTERVAL;
use leptos::*;

use super::InlineLoading;
use crate::state::{scoped_cancel, GlobalState};

#[component]
pub fn NotificationDropdown() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let cancel = scoped_cancel();
    let open = create_rw_signal(false);
    let notifications_rev = state.notifications_rev;

    // Unread counter polling
    {
        let state = state.clone();
        let cancel = cancel.clone();
        let period_ms = u32::try_from(NOTIFICATION_POLL_INTERVAL.as_millis()).unwrap_or(u32::MAX);
        let poller = Interval::new(period_ms, move || {
            let state = state.clone();
            let cancel = cancel.clone();
            spawn_local(async move {
                let _ = state.client.refresh_notification_count(&cancel).await;
            });
        });
        on_cleanup(move || drop(poller));
    }

    let snapshot = {
        let state = state.clone();
        move || {
            notifications_rev.track();
            state.client.notifications().store().snapshot()
        }
    };
    let badge = {
        let snapshot = snapshot.clone();
        move || badge_label(snapshot().unread_count)
    };

    let toggle = {
        let state = state.clone();
        let cancel = cancel.clone();
        move |_: ev::MouseEvent| {
            let opening = !open.get_untracked();
            open.set(opening);
            if !opening {
                return;
            }
            let state = state.clone();
            let cancel = cancel.clone();
            spawn_local(async move {
                if let Err(e) = state.client.fetch_notifications(&cancel).await {
                    state.report(&e, "Failed to fetch notifications");
                }
            });
        }
    };

    let mark_all = {
        let state = state.clone();
        let cancel = cancel.clone();
        move |_: ev::MouseEvent| {
            let state = state.clone();
            let cancel = cancel.clone();
            spawn_local(async move {
                if let Err(e) = state.client.mark_all_notifications_read(&cancel).await {
                    state.report(&e, "Failed to mark all notifications as read");
                }
            });
        }
    };

    view! {
        <div class="relative">
            <button
                on:click=toggle
                title="Notifications"
                class="relative p-2 rounded-full hover:bg-gray-100 text-xl"
            >
                "🔔"
                {move || badge().map(|label| view! {
                    <span class="absolute -top-1 -right-1 min-w-[1.25rem] h-5 px-1 rounded-full bg-red-500
                                 text-white text-xs flex items-center justify-center">
                        {label}
                    </span>
                })}
            </button>

            <Show when=move || open.get()>
                <div class="absolute right-0 mt-2 w-96 bg-white rounded-xl shadow-xl border border-gray-200 z-50">
                    <div class="flex items-center justify-between px-4 py-3 border-b">
                        <h3 class="font-semibold text-gray-900">"Notifications"</h3>
                        <button on:click=mark_all.clone() class="text-sm text-blue-600 hover:underline">
                            "Mark all as read"
                        </button>
                    </div>
                    <div class="max-h-96 overflow-y-auto">
                        {
                            let snapshot = snapshot.clone();
                            move || {
                                let current = snapshot();
                                if current.loading && current.notifications.is_empty() {
                                    return view! {
                                        <div class="p-6 flex justify-center"><InlineLoading /></div>
                                    }
                                    .into_view();
                                }
                                if current.notifications.is_empty() {
                                    return view! {
                                        <p class="p-6 text-center text-sm text-gray-500">"No notifications"</p>
                                    }
                                    .into_view();
                                }
                                current
                                    .notifications
                                    .into_iter()
                                    .map(|notification| view! { <NotificationItem notification=notification /> })
                                    .collect_view()
                            }
                        }
                    </div>
                </div>
            </Show>
        </div>
    }
}

#[component]
fn NotificationItem(notification: Notification) -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let cancel = scoped_cancel();
    let busy = create_rw_signal(false);
    let id = notification.id;
    let unread = !notification.is_read;
    let pending_invitation = unread && notification.invitation_id().is_some();
    let when = time_ago(notification.created_at, Utc::now());

    let on_read = {
        let state = state.clone();
        let cancel = cancel.clone();
        move |_: ev::MouseEvent| {
            if !unread || pending_invitation {
                return;
            }
            let state = state.clone();
            let cancel = cancel.clone();
            spawn_local(async move {
                if let Err(e) = state.client.mark_notification_read(id, &cancel).await {
                    state.report(&e, "Failed to mark notification as read");
                }
            });
        }
    };

    let on_accept = {
        let state = state.clone();
        let cancel = cancel.clone();
        let notification = notification.clone();
        move |_: ev::MouseEvent| {
            busy.set(true);
            let state = state.clone();
            let cancel = cancel.clone();
            let notification = notification.clone();
            spawn_local(async move {
                match state.client.accept_invitation(&notification, &cancel).await {
                    Ok(group_name) => state.show_success(&format!("Joined {}", group_name)),
                    Err(e) => state.report(&e, "Failed to accept invitation"),
                }
                busy.set(false);
            });
        }
    };

    let on_decline = {
        let notification = notification.clone();
        move |_: ev::MouseEvent| {
            busy.set(true);
            let state = state.clone();
            let cancel = cancel.clone();
            let notification = notification.clone();
            spawn_local(async move {
                match state.client.decline_invitation(&notification, &cancel).await {
                    Ok(()) => state.show_success("Invitation declined"),
                    Err(e) => state.report(&e, "Failed to decline invitation"),
                }
                busy.set(false);
            });
        }
    };

    let row_class = if unread {
        "px-4 py-3 border-b last:border-0 bg-blue-50 cursor-pointer"
    } else {
        "px-4 py-3 border-b last:border-0 hover:bg-gray-50"
    };

    view! {
        <div class=row_class on:click=on_read>
            <div class="flex items-start justify-between">
                <p class="font-medium text-gray-900 text-sm">{notification.title.clone()}</p>
                <span class="text-xs text-gray-400 ml-2 whitespace-nowrap">{when}</span>
            </div>
            <p class="text-sm text-gray-600 mt-1">{notification.message.clone()}</p>
            {pending_invitation.then(|| view! {
                <div class="flex space-x-2 mt-2">
                    <button
                        on:click=on_accept
                        disabled=move || busy.get()
                        class="px-3 py-1 text-sm bg-blue-600 hover:bg-blue-700 disabled:bg-gray-400 text-white rounded"
                    >
                        "Accept"
                    </button>
                    <button
                        on:click=on_decline
                        disabled=move || busy.get()
                        class="px-3 py-1 text-sm border border-gray-300 hover:bg-gray-100 rounded"
                    >
                        "Decline"
                    </button>
                </div>
            })}
        </div>
    }
}
