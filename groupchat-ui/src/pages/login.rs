//! Login Page
//!
//! Email/password sign-in, registration and the Google popup flow.

use groupchat::api::RegisterRequest;
use groupchat::google::{self, GoogleAuthMessage};
use groupchat::models::User;
use groupchat::store::session::{GOOGLE_LOGIN_FAILED, LOGIN_FAILED, REGISTRATION_FAILED};
use groupchat::ClientResult;
use leptos::*;
use leptos_router::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::MessageEvent;

use crate::components::InlineLoading;
use crate::state::{scoped_cancel, GlobalState};

#[derive(Clone, Copy, PartialEq)]
enum AuthMode {
    Login,
    Register,
}

impl AuthMode {
    fn fallback(self) -> &'static str {
        match self {
            AuthMode::Login => LOGIN_FAILED,
            AuthMode::Register => REGISTRATION_FAILED,
        }
    }
}

/// Login / registration page
#[component]
pub fn Login() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let navigate = use_navigate();
    let cancel = scoped_cancel();

    let (mode, set_mode) = create_signal(AuthMode::Login);
    let email = create_rw_signal(String::new());
    let password = create_rw_signal(String::new());
    let username = create_rw_signal(String::new());
    let full_name = create_rw_signal(String::new());
    let submitting = create_rw_signal(false);
    let form_error = create_rw_signal(None::<String>);

    // Already signed in
    {
        let state = state.clone();
        let navigate = navigate.clone();
        create_effect(move |_| {
            if state.is_authenticated() {
                navigate("/chat", Default::default());
            }
        });
    }

    // Shared tail of every sign-in path
    let finish = {
        let state = state.clone();
        let navigate = navigate.clone();
        move |result: ClientResult<User>, fallback: &str| {
            submitting.set(false);
            match result {
                Ok(user) => {
                    state.watch_realtime();
                    state.show_success(&format!("Welcome, {}!", user.display_name()));
                    navigate("/chat", Default::default());
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => form_error.set(Some(e.user_message(fallback))),
            }
        }
    };

    let on_submit = {
        let state = state.clone();
        let cancel = cancel.clone();
        let finish = finish.clone();
        move |ev: web_sys::SubmitEvent| {
            ev.prevent_default();
            if submitting.get_untracked() {
                return;
            }
            submitting.set(true);
            form_error.set(None);

            let state = state.clone();
            let cancel = cancel.clone();
            let finish = finish.clone();
            let mode = mode.get_untracked();
            let email = email.get_untracked();
            let password = password.get_untracked();
            let username = username.get_untracked();
            let full_name = full_name.get_untracked();

            spawn_local(async move {
                let result = match mode {
                    AuthMode::Login => state.client.login(email.trim(), &password, &cancel).await,
                    AuthMode::Register => {
                        let request = RegisterRequest {
                            email: email.trim().to_string(),
                            username: username.trim().to_string(),
                            password,
                            full_name: Some(full_name.trim().to_string()).filter(|n| !n.is_empty()),
                        };
                        state.client.register(&request, &cancel).await
                    }
                };
                finish(result, mode.fallback());
            });
        }
    };

    // The popup reports back through window.postMessage
    {
        let state = state.clone();
        let cancel = cancel.clone();
        let finish = finish.clone();
        let listener = Closure::wrap(Box::new(move |event: MessageEvent| {
            let Some(message) = popup_message(&event) else {
                return;
            };
            match message {
                GoogleAuthMessage::Success { token } => {
                    submitting.set(true);
                    form_error.set(None);
                    let state = state.clone();
                    let cancel = cancel.clone();
                    let finish = finish.clone();
                    spawn_local(async move {
                        let result = state.client.login_with_google(Some(&token), &cancel).await;
                        finish(result, GOOGLE_LOGIN_FAILED);
                    });
                }
                GoogleAuthMessage::Error { error } => {
                    tracing::warn!(%error, "Google sign-in failed");
                    form_error.set(Some(GOOGLE_LOGIN_FAILED.to_string()));
                }
            }
        }) as Box<dyn FnMut(MessageEvent)>);

        if let Some(window) = web_sys::window() {
            let _ = window.add_event_listener_with_callback("message", listener.as_ref().unchecked_ref());
        }
        on_cleanup(move || {
            if let Some(window) = web_sys::window() {
                let _ = window
                    .remove_event_listener_with_callback("message", listener.as_ref().unchecked_ref());
            }
            drop(listener);
        });
    }

    let google_client_id = state.client.config().auth.google_client_id.clone();
    let google_enabled = state.client.config().google_auth_available();
    let app_name = state.client.config().app.name.clone();

    let on_google = move |_: ev::MouseEvent| {
        if let Err(message) = open_google_popup(&google_client_id) {
            form_error.set(Some(message));
        }
    };

    view! {
        <div class="min-h-screen flex items-center justify-center bg-gradient-to-br from-blue-50 to-indigo-100 px-4">
            <div class="w-full max-w-md bg-white rounded-xl shadow-lg p-8 space-y-6">
                <div class="text-center">
                    <h1 class="text-3xl font-bold text-gray-900">{app_name}</h1>
                    <p class="text-gray-500 mt-2">
                        {move || match mode.get() {
                            AuthMode::Login => "Sign in to your account",
                            AuthMode::Register => "Create a new account",
                        }}
                    </p>
                </div>

                {move || form_error.get().map(|message| view! {
                    <div class="bg-red-50 border border-red-200 text-red-700 px-4 py-3 rounded-lg text-sm">
                        {message}
                    </div>
                })}

                <form on:submit=on_submit class="space-y-4">
                    <TextField label="Email" kind="email" value=email />

                    {move || (mode.get() == AuthMode::Register).then(|| view! {
                        <TextField label="Username" kind="text" value=username />
                        <TextField label="Full name (optional)" kind="text" value=full_name is_optional=true />
                    })}

                    <TextField label="Password" kind="password" value=password />

                    <button
                        type="submit"
                        disabled=move || submitting.get()
                        class="w-full bg-blue-600 hover:bg-blue-700 disabled:bg-gray-400
                               disabled:cursor-not-allowed text-white rounded-lg py-3 font-semibold
                               transition-colors flex items-center justify-center space-x-2"
                    >
                        {move || if submitting.get() {
                            view! { <InlineLoading /> <span>"Please wait..."</span> }.into_view()
                        } else {
                            match mode.get() {
                                AuthMode::Login => view! { <span>"Sign In"</span> }.into_view(),
                                AuthMode::Register => view! { <span>"Create Account"</span> }.into_view(),
                            }
                        }}
                    </button>
                </form>

                {google_enabled.then(|| view! {
                    <div class="relative">
                        <div class="absolute inset-0 flex items-center">
                            <div class="w-full border-t border-gray-200" />
                        </div>
                        <div class="relative flex justify-center text-sm">
                            <span class="px-2 bg-white text-gray-500">"or"</span>
                        </div>
                    </div>
                    <button
                        on:click=on_google
                        disabled=move || submitting.get()
                        class="w-full border border-gray-300 hover:bg-gray-50 rounded-lg py-3 font-medium transition-colors"
                    >
                        "Continue with Google"
                    </button>
                })}

                <p class="text-center text-sm text-gray-600">
                    {move || match mode.get() {
                        AuthMode::Login => "Don't have an account? ",
                        AuthMode::Register => "Already have an account? ",
                    }}
                    <button
                        class="text-blue-600 hover:underline font-medium"
                        on:click=move |_| {
                            form_error.set(None);
                            set_mode.update(|m| *m = match m {
                                AuthMode::Login => AuthMode::Register,
                                AuthMode::Register => AuthMode::Login,
                            });
                        }
                    >
                        {move || match mode.get() {
                            AuthMode::Login => "Sign up",
                            AuthMode::Register => "Sign in",
                        }}
                    </button>
                </p>
            </div>
        </div>
    }
}

#[component]
fn TextField(
    label: &'static str,
    kind: &'static str,
    value: RwSignal<String>,
    #[prop(optional)] is_optional: bool,
) -> impl IntoView {
    view! {
        <label class="block">
            <span class="block text-sm font-medium text-gray-700 mb-1">{label}</span>
            <input
                type=kind
                required={!is_optional}
                class="w-full border border-gray-300 rounded-lg px-3 py-2
                       focus:outline-none focus:ring-2 focus:ring-blue-500"
                prop:value=move || value.get()
                on:input=move |ev| value.set(event_target_value(&ev))
            />
        </label>
    }
}

/// Decode a popup message from our own origin
fn popup_message(event: &MessageEvent) -> Option<GoogleAuthMessage> {
    let own_origin = web_sys::window()?.location().origin().ok()?;
    if event.origin() != own_origin {
        return None;
    }
    let raw = event.data().as_string()?;
    serde_json::from_str(&raw).ok()
}

fn open_google_popup(client_id: &str) -> Result<(), String> {
    let window = web_sys::window().ok_or_else(|| GOOGLE_LOGIN_FAILED.to_string())?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| GOOGLE_LOGIN_FAILED.to_string())?;

    let nonce = format!("{:016x}", (js_sys::Math::random() * u64::MAX as f64) as u64);
    let url = google::authorization_url(client_id, &origin, &nonce);

    match window.open_with_url_and_target_and_features(&url, "google-auth", "width=500,height=600") {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err("Popup blocked. Allow popups for this site and try again.".to_string()),
        Err(e) => {
            tracing::warn!(error = ?e, "Opening the Google popup failed");
            Err(GOOGLE_LOGIN_FAILED.to_string())
        }
    }
}
