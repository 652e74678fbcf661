//! The authenticated HTTP client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use healthlog_core::{
    AccessToken, Error, InvalidInputError, RefreshToken, Result, SessionStore, TransportError,
};

use crate::config::{ClientConfig, RefreshMode};
use crate::endpoints::{REFRESH, RefreshRequest, RefreshResponse};
use crate::request::{ApiRequest, ApiResponse};

/// HTTP client that authenticates every request from a [`SessionStore`].
///
/// The client never caches tokens: each attempt reads the store, and a
/// successful refresh or an unrecoverable 401 writes back through it. It is
/// cheap to clone and safe to share across tasks.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn SessionStore>,
    refresh_gate: Mutex<()>,
}

/// One send of a logical request.
///
/// `retried` is set only on the attempt built after a refresh, and an
/// attempt that is already retried can never produce another one.
struct Attempt<'a> {
    request: &'a ApiRequest,
    token: Option<AccessToken>,
    retried: bool,
}

impl<'a> Attempt<'a> {
    fn first(request: &'a ApiRequest, token: Option<AccessToken>) -> Self {
        Self {
            request,
            token,
            retried: false,
        }
    }

    fn retry_with(self, token: AccessToken) -> Self {
        Self {
            request: self.request,
            token: Some(token),
            retried: true,
        }
    }
}

impl AuthClient {
    /// Create a client over the given session store.
    pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| TransportError::Http {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                config,
                store,
                refresh_gate: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the session store this client reads from.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    /// Send a request with the current bearer token.
    ///
    /// A 401 triggers at most one refresh exchange for this request. If the
    /// refresh succeeds the request is resubmitted once with the new token
    /// and that outcome is returned; a 401 on the resubmission, a missing
    /// refresh token, or a failed refresh clears the session and returns
    /// [`Error::SessionExpired`]. Other non-success statuses map to their
    /// error variants and transport failures are never retried.
    #[instrument(skip_all, fields(method = %request.method(), path = request.path()))]
    pub async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut attempt = Attempt::first(request, self.inner.store.access_token());

        loop {
            let response = self.send(&attempt).await?;

            if response.status() != 401 {
                return response.error_for_status();
            }

            attempt = self.recover(attempt).await?;
        }
    }

    /// Handle a 401 for `attempt`, producing the single permitted retry.
    async fn recover<'a>(&self, attempt: Attempt<'a>) -> Result<Attempt<'a>> {
        if attempt.retried {
            warn!("Request rejected again after refresh");
            self.expire();
            return Err(Error::SessionExpired);
        }

        debug!("Access token rejected, refreshing");
        let token = self.refresh_after(attempt.token.as_ref()).await?;
        Ok(attempt.retry_with(token))
    }

    async fn refresh_after(&self, rejected: Option<&AccessToken>) -> Result<AccessToken> {
        match self.inner.config.refresh_mode() {
            RefreshMode::PerRequest => self.refresh_exchange().await,
            RefreshMode::Coalesced => {
                let _gate = self.inner.refresh_gate.lock().await;

                if let Some(current) = self.inner.store.access_token()
                    && Some(&current) != rejected
                {
                    debug!("Access token already replaced by a concurrent refresh");
                    return Ok(current);
                }

                self.refresh_exchange().await
            }
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Any failure of the exchange ends the session. A session that was
    /// cleared while the exchange was in flight stays cleared. A store
    /// that fails to persist the new token is logged and the token is
    /// still returned.
    pub(crate) async fn refresh_exchange(&self) -> Result<AccessToken> {
        let Some(refresh_token) = self.inner.store.refresh_token() else {
            warn!("No refresh token available");
            self.expire();
            return Err(Error::SessionExpired);
        };

        let access_token = match self.request_refresh(&refresh_token).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.expire();
                return Err(Error::SessionExpired);
            }
        };

        match self.inner.store.set_access_token(access_token.clone()) {
            Ok(true) => info!("Access token refreshed"),
            Ok(false) => {
                warn!("Session ended while refreshing, discarding new token");
                return Err(Error::SessionExpired);
            }
            Err(e) => warn!(error = %e, "Failed to store refreshed access token"),
        }
        Ok(access_token)
    }

    async fn request_refresh(&self, refresh_token: &RefreshToken) -> Result<AccessToken> {
        let request = ApiRequest::post(REFRESH).with_json(&RefreshRequest {
            refresh_token: refresh_token.as_str(),
        })?;

        let response: RefreshResponse = self
            .send_unauthenticated(&request)
            .await?
            .error_for_status()?
            .json()?;

        Ok(AccessToken::new(response.access_token))
    }

    /// Drop the session after an unrecoverable 401.
    pub(crate) fn expire(&self) {
        info!("Clearing session");
        if let Err(e) = self.inner.store.clear_session() {
            warn!(error = %e, "Failed to clear session");
        }
    }

    async fn send(&self, attempt: &Attempt<'_>) -> Result<ApiResponse> {
        trace!(retried = attempt.retried, authed = attempt.token.is_some(), "Sending");
        self.execute(attempt.request, attempt.token.as_ref()).await
    }

    /// Send a request that must not carry the session's bearer token.
    pub(crate) async fn send_unauthenticated(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.execute(request, None).await
    }

    async fn execute(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        let config = &self.inner.config;
        let url = config.base_url().endpoint(request.path());
        let timeout = request.timeout().unwrap_or(config.timeout());
        debug!(method = %request.method(), %url, "HTTP request");

        let mut builder = self
            .inner
            .http
            .request(request.method().clone(), &url)
            .headers(request.headers().clone())
            .timeout(timeout);

        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, bearer_header(token)?);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        trace!(status, bytes = body.len(), "HTTP response");
        Ok(ApiResponse::new(status, headers, body.to_vec()))
    }
}

fn bearer_header(token: &AccessToken) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&token.bearer()).map_err(|e| {
        InvalidInputError::Header {
            name: AUTHORIZATION.to_string(),
            reason: format!("access token is not a valid header value: {}", e),
        }
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout {
            duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Network(transport)
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("base_url", self.inner.config.base_url())
            .field("refresh_mode", &self.inner.config.refresh_mode())
            .field("store", &self.inner.store)
            .finish()
    }
}
