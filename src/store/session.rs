//! Session Store
//!
//! Authenticated user, bearer token and the login flow state.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::Store;
use crate::api::{ApiClient, RegisterRequest, TokenResponse};
use crate::error::{ClientError, ClientResult};
use crate::models::User;

pub const LOGIN_FAILED: &str = "Login failed";
pub const GOOGLE_LOGIN_FAILED: &str = "Google login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const NO_GOOGLE_CREDENTIAL: &str = "No credential received from Google";

/// Who is signed in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

impl Session {
    pub fn authenticated(user: User, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
            is_authenticated: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub session: Session,
    /// A login, Google login or registration is in flight
    pub loading: bool,
    pub error: Option<String>,
}

pub struct SessionStore {
    api: ApiClient,
    store: Store<SessionState>,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            store: Store::default(),
        }
    }

    pub fn store(&self) -> &Store<SessionState> {
        &self.store
    }

    pub fn session(&self) -> Session {
        self.store.read(|s| s.session.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.read(|s| s.session.is_authenticated)
    }

    pub fn user(&self) -> Option<User> {
        self.store.read(|s| s.session.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.store.read(|s| s.session.token.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.store.read(|s| s.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.store.read(|s| s.error.clone())
    }

    pub fn clear_error(&self) {
        self.store.update(|s| s.error = None);
    }

    /// Adopt a previously persisted session and install its credential
    pub fn restore(&self, session: Session) {
        if session.is_authenticated {
            self.api.set_token(session.token.clone());
        }
        self.store.update(|s| s.session = session);
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<User> {
        self.begin();
        let result = self.api.login(email, password, cancel).await;
        self.finish(result, LOGIN_FAILED)
    }

    /// Exchange a Google ID token. The browser obtains the token first.
    pub async fn login_with_google(
        &self,
        id_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> ClientResult<User> {
        self.begin();
        let result = match id_token.filter(|t| !t.is_empty()) {
            Some(token) => self.api.google_login(token, cancel).await,
            None => Err(ClientError::Validation(NO_GOOGLE_CREDENTIAL.to_string())),
        };
        self.finish(result, GOOGLE_LOGIN_FAILED)
    }

    /// Create the account, then sign in with the same credentials
    pub async fn register(
        &self,
        request: &RegisterRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<User> {
        self.begin();
        if let Err(e) = self.api.register(request, cancel).await {
            return self.finish(Err(e), REGISTRATION_FAILED);
        }
        tracing::info!(email = %request.email, "Account registered, signing in");
        let result = self.api.login(&request.email, &request.password, cancel).await;
        self.finish(result, REGISTRATION_FAILED)
    }

    /// Local only; the server is not told
    pub fn logout(&self) {
        self.api.clear_token();
        self.store.replace(SessionState::default());
    }

    /// Re-fetch the current user; logs out when the token is rejected
    pub async fn refresh_user(&self, cancel: &CancellationToken) -> ClientResult<()> {
        if self.token().is_none() {
            return Ok(());
        }

        match self.api.me(cancel).await {
            Ok(user) => {
                self.store.update(|s| s.session.user = Some(user));
                Ok(())
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to refresh user, logging out");
                self.logout();
                Err(e)
            }
        }
    }

    /// Set the cached balance
    pub fn update_credits(&self, amount: f64) {
        self.store.update(|s| {
            if let Some(user) = s.session.user.as_mut() {
                user.credits = amount;
            }
        });
    }

    /// Fetch the balance from the backend and apply it
    pub async fn refresh_credits(&self, cancel: &CancellationToken) -> ClientResult<f64> {
        let balance = self.api.credits(cancel).await?;
        self.update_credits(balance.credits);
        Ok(balance.credits)
    }

    fn begin(&self) {
        self.store.update(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn finish(&self, result: ClientResult<TokenResponse>, fallback: &str) -> ClientResult<User> {
        match result {
            Ok(response) => {
                self.api.set_token(Some(response.access_token.clone()));
                let user = response.user.clone();
                self.store.update(|s| {
                    s.session = Session::authenticated(response.user, response.access_token);
                    s.loading = false;
                    s.error = None;
                });
                tracing::info!(user_id = user.id, "Signed in");
                Ok(user)
            }
            Err(e) => {
                let message = (!e.is_cancelled()).then(|| e.user_message(fallback));
                self.store.update(|s| {
                    s.loading = false;
                    s.error = message;
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockBackend, GOOD_TOKEN, PASSWORD, TAKEN_EMAIL};

    async fn setup() -> (MockBackend, SessionStore) {
        let backend = MockBackend::start().await;
        let api = ApiClient::new(&backend.config().api).unwrap();
        (backend, SessionStore::new(api))
    }

    #[tokio::test]
    async fn test_login_installs_token() {
        let (backend, session) = setup().await;
        let cancel = CancellationToken::new();

        let user = session.login("ada@example.com", PASSWORD, &cancel).await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.token().as_deref(), Some(GOOD_TOKEN));

        session.refresh_user(&cancel).await.unwrap();
        assert_eq!(
            backend.last_authorization(),
            Some(format!("Bearer {}", GOOD_TOKEN))
        );
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_detail() {
        let (_backend, session) = setup().await;

        let result = session
            .login("ada@example.com", "wrong", &CancellationToken::new())
            .await;

        assert!(result.unwrap_err().is_unauthorized());
        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.error().as_deref(), Some("Incorrect email or password"));
    }

    #[tokio::test]
    async fn test_register_logs_in() {
        let (_backend, session) = setup().await;
        let request = RegisterRequest {
            email: "new@example.com".into(),
            username: "newbie".into(),
            password: PASSWORD.into(),
            full_name: None,
        };

        session.register(&request, &CancellationToken::new()).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.user().unwrap().email, "new@example.com");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (_backend, session) = setup().await;
        let request = RegisterRequest {
            email: TAKEN_EMAIL.into(),
            username: "dup".into(),
            password: PASSWORD.into(),
            full_name: None,
        };

        assert!(session.register(&request, &CancellationToken::new()).await.is_err());
        assert_eq!(session.error().as_deref(), Some("Email already registered"));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_google_without_credential() {
        let (_backend, session) = setup().await;
        let result = session.login_with_google(None, &CancellationToken::new()).await;

        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert_eq!(session.error().as_deref(), Some(NO_GOOGLE_CREDENTIAL));
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_refresh_user_rejected_logs_out() {
        let (_backend, session) = setup().await;
        session.restore(Session {
            user: None,
            token: Some("expired".into()),
            is_authenticated: true,
        });

        assert!(session.refresh_user(&CancellationToken::new()).await.is_err());
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[test]
    fn test_update_credits_local() {
        let api = ApiClient::new(&crate::config::ApiConfig::default()).unwrap();
        let session = SessionStore::new(api);
        session.update_credits(5.0);
        assert!(session.user().is_none());

        let user: User = serde_json::from_value(crate::api::mock::user_json("a@b.c")).unwrap();
        session.restore(Session::authenticated(user, "t".into()));
        session.update_credits(2.5);
        assert_eq!(session.user().unwrap().credits, 2.5);
    }
}
