//! App Root Component
//!
//! Routing, the authentication guard and global providers.

use leptos::*;
use leptos_router::*;

use crate::components::Toast;
use crate::pages::{Chat, Credits, GoogleCallback, Login};
use crate::state::global::LOGIN_PATH;
use crate::state::{provide_global_state, GlobalState};

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    if let Err(e) = provide_global_state() {
        tracing::error!(error = %e, "Client setup failed");
        return view! { <StartupError message=e.to_string() /> }.into_view();
    }

    view! {
        <Router>
            <div class="h-screen bg-gray-50 flex flex-col">
                <Routes>
                    <Route path="/" view=Home />
                    <Route path="/auth/login" view=Login />
                    <Route path="/auth/google/callback" view=GoogleCallback />
                    <Route path="/chat" view=|| view! { <RequireAuth><Chat /></RequireAuth> } />
                    <Route path="/credits" view=|| view! { <RequireAuth><Credits /></RequireAuth> } />
                    <Route path="/*any" view=NotFound />
                </Routes>

                // Toast notifications
                <Toast />
            </div>
        </Router>
    }
    .into_view()
}

/// Sends the visitor to the chat or the login page
#[component]
fn Home() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");

    move || {
        if state.is_authenticated() {
            view! { <Redirect path="/chat" /> }.into_view()
        } else {
            view! { <Redirect path=LOGIN_PATH /> }.into_view()
        }
    }
}

/// Renders its children only for a signed-in user
#[component]
fn RequireAuth(children: ChildrenFn) -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");

    view! {
        <Show
            when=move || state.is_authenticated()
            fallback=|| view! { <Redirect path=LOGIN_PATH /> }
        >
            {children()}
        </Show>
    }
}

#[component]
fn StartupError(#[prop(into)] message: String) -> impl IntoView {
    view! {
        <div class="min-h-screen flex items-center justify-center bg-gray-50">
            <div class="bg-white rounded-lg shadow p-8 text-center">
                <h1 class="text-xl font-bold text-red-600 mb-2">"Unable to start"</h1>
                <p class="text-gray-600">{message}</p>
            </div>
        </div>
    }
}

/// 404 Not Found page
#[component]
fn NotFound() -> impl IntoView {
    view! {
        <div class="flex flex-col items-center justify-center min-h-[60vh] text-center">
            <h1 class="text-3xl font-bold mb-2">"Page Not Found"</h1>
            <p class="text-gray-500 mb-6">"The page you're looking for doesn't exist."</p>
            <A
                href="/chat"
                class="px-6 py-3 bg-blue-600 hover:bg-blue-700 text-white rounded-lg font-medium transition-colors"
            >
                "Back to Chat"
            </A>
        </div>
    }
}
