//! Authentication endpoints

use tokio_util::sync::CancellationToken;

use super::client::ApiClient;
use super::dto::{GoogleLoginRequest, LoginRequest, RegisterRequest, TokenResponse};
use crate::error::ClientResult;
use crate::models::User;

impl ApiClient {
    /// `POST /auth/login`
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<TokenResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/auth/login", &body, cancel).await
    }

    /// `POST /auth/register`, returns the created account
    pub async fn register(
        &self,
        request: &RegisterRequest,
        cancel: &CancellationToken,
    ) -> ClientResult<User> {
        self.post("/auth/register", request, cancel).await
    }

    /// Exchange a Google ID token for a session
    pub async fn google_login(
        &self,
        id_token: &str,
        cancel: &CancellationToken,
    ) -> ClientResult<TokenResponse> {
        let body = GoogleLoginRequest {
            google_token: id_token.to_string(),
        };
        self.post("/auth/google", &body, cancel).await
    }

    /// Current user for the installed token
    pub async fn me(&self, cancel: &CancellationToken) -> ClientResult<User> {
        self.get("/auth/me", &[], cancel).await
    }

    pub async fn refresh_token(&self, cancel: &CancellationToken) -> ClientResult<TokenResponse> {
        self.post("/auth/refresh", &serde_json::json!({}), cancel).await
    }
}
