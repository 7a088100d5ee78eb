//! Credits Page
//!
//! Current balance, per-model pricing and how far the balance goes.

use groupchat::credits::{estimated_messages, format_credits, MODEL_PRICES};
use leptos::*;
use leptos_router::*;

use crate::components::Navbar;
use crate::state::{scoped_cancel, GlobalState};

#[component]
pub fn Credits() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let cancel = scoped_cancel();
    let refreshing = create_rw_signal(true);

    {
        let state = state.clone();
        spawn_local(async move {
            if let Err(e) = state.client.refresh_credits(&cancel).await {
                state.report(&e, "Failed to load credits");
            }
            refreshing.set(false);
        });
    }

    let balance = {
        let state = state.clone();
        move || {
            state.session_rev.track();
            state.client.session().user().map_or(0.0, |u| u.credits)
        }
    };
    let balance_for_rows = balance.clone();

    view! {
        <div class="h-screen flex flex-col">
            <Navbar />
            <main class="flex-1 overflow-y-auto">
                <div class="max-w-3xl mx-auto px-4 py-8 space-y-6">
                    <A href="/chat" class="text-blue-600 hover:underline text-sm">"← Back to chat"</A>

                    <div class="bg-white rounded-xl shadow p-6">
                        <h1 class="text-2xl font-bold text-gray-900 mb-2">"Your Credits"</h1>
                        <div class="flex items-baseline space-x-2">
                            <span class="text-4xl font-bold text-blue-600">
                                {move || format_credits(balance())}
                            </span>
                            <span class="text-gray-500">"credits"</span>
                            {move || refreshing.get().then(|| view! {
                                <span class="inline-block loading-spinner w-4 h-4" />
                            })}
                        </div>
                    </div>

                    <div class="bg-white rounded-xl shadow p-6">
                        <h2 class="text-lg font-semibold text-gray-900 mb-4">"AI Model Pricing"</h2>
                        <table class="w-full text-left">
                            <thead>
                                <tr class="text-sm text-gray-500 border-b">
                                    <th class="py-2">"Model"</th>
                                    <th class="py-2">"Credits per reply"</th>
                                    <th class="py-2">"Replies left"</th>
                                </tr>
                            </thead>
                            <tbody>
                                {MODEL_PRICES
                                    .iter()
                                    .map(|(id, label, price)| {
                                        let balance = balance_for_rows.clone();
                                        let id = *id;
                                        view! {
                                            <tr class="border-b last:border-0">
                                                <td class="py-3 font-medium">{*label}</td>
                                                <td class="py-3">{format!("{:.2}", price)}</td>
                                                <td class="py-3 text-gray-600">
                                                    {move || estimated_messages(balance(), id).to_string()}
                                                </td>
                                            </tr>
                                        }
                                    })
                                    .collect_view()}
                            </tbody>
                        </table>
                    </div>

                    <p class="text-sm text-gray-500">
                        "Credits are spent when an AI assistant replies in a group with AI enabled."
                    </p>
                </div>
            </main>
        </div>
    }
}
