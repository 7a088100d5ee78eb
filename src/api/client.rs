//! Backend REST Client
//!
//! Thin reqwest wrapper that owns the installed bearer credential, turns
//! non-success statuses into [`ClientError`] and races every request
//! against a [`CancellationToken`].

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};

/// Path prefix of every REST endpoint
pub const API_PREFIX: &str = "/api/v1";

/// Called when any request comes back 401
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Endpoints where 401 means "bad credentials", not "session expired"
const CREDENTIAL_EXCHANGE_PATHS: [&str; 3] = ["/auth/login", "/auth/register", "/auth/google"];

/// Backend REST API client.
///
/// Cheap to clone; clones share the credential and the 401 hook.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: String,
    token: RwLock<Option<String>>,
    on_unauthorized: RwLock<Option<UnauthorizedHook>>,
}

impl ApiClient {
    /// Create a new API client with the given configuration
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let http = build_http_client(config)?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                token: RwLock::new(None),
                on_unauthorized: RwLock::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Install the bearer token sent with every later request
    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.inner.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }

    pub fn token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_token(&self) {
        self.set_token(None);
    }

    /// Register the global forced-logout hook
    pub fn set_unauthorized_hook(&self, hook: UnauthorizedHook) {
        let mut guard = self
            .inner
            .on_unauthorized
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *guard = Some(hook);
    }

    /// Absolute URL of an endpoint path such as `/groups/`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.inner.base_url, API_PREFIX, path)
    }

    pub(crate) async fn get<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let builder = self.request(Method::GET, path).query(query);
        self.execute(path, builder, cancel).await
    }

    pub(crate) async fn post<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        self.execute(path, builder, cancel).await
    }

    pub(crate) async fn put<B, T>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).json(body);
        self.execute(path, builder, cancel).await
    }

    pub(crate) async fn delete<T>(&self, path: &str, cancel: &CancellationToken) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let builder = self.request(Method::DELETE, path);
        self.execute(path, builder, cancel).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.inner.http.request(method, self.url(path));
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T>(
        &self,
        path: &str,
        builder: RequestBuilder,
        cancel: &CancellationToken,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let result = with_cancel(cancel, async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, ClientError>((status, body))
        })
        .await;

        let (status, body) = match result {
            Ok(ok) => ok,
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::warn!(path = %path, error = %e, "Request failed");
                }
                return Err(e);
            }
        };

        if !status.is_success() {
            let err = ClientError::from_status(status.as_u16(), &body);
            tracing::debug!(path = %path, status = status.as_u16(), "Request rejected");
            if err.is_unauthorized() && !is_credential_exchange(path) {
                self.fire_unauthorized();
            }
            return Err(err);
        }

        // Some endpoints answer with an empty body
        let raw = if body.trim().is_empty() { "null" } else { &body };
        Ok(serde_json::from_str(raw)?)
    }

    fn fire_unauthorized(&self) {
        let hook = self
            .inner
            .on_unauthorized
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        if let Some(hook) = hook {
            tracing::info!("Session rejected by backend, forcing logout");
            hook();
        }
    }
}

fn is_credential_exchange(path: &str) -> bool {
    CREDENTIAL_EXCHANGE_PATHS.contains(&path)
}

#[cfg(not(target_arch = "wasm32"))]
fn build_http_client(config: &ApiConfig) -> ClientResult<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(ClientError::from)
}

#[cfg(target_arch = "wasm32")]
fn build_http_client(_config: &ApiConfig) -> ClientResult<Client> {
    // The browser's fetch has no client-level timeout
    Client::builder().build().map_err(ClientError::from)
}

/// Resolve `fut`, or fail with [`ClientError::Cancelled`] as soon as the token fires
pub async fn with_cancel<F, T>(cancel: &CancellationToken, fut: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(ClientError::Cancelled);
    }

    let cancelled = cancel.cancelled();
    futures_util::pin_mut!(fut);
    futures_util::pin_mut!(cancelled);

    match futures_util::future::select(cancelled, fut).await {
        futures_util::future::Either::Left(_) => Err(ClientError::Cancelled),
        futures_util::future::Either::Right((result, _)) => result,
    }
}
