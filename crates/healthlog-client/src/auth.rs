//! Login, registration and logout.

use serde::Serialize;
use tracing::{debug, info, instrument};

use healthlog_core::{
    AccessToken, ApiError, Credentials, Error, RefreshToken, Registration, Result, SessionData,
    UserProfile,
};

use crate::client::AuthClient;
use crate::endpoints::{AuthResponse, LOGIN, REGISTER};
use crate::request::ApiRequest;

impl AuthClient {
    /// Authenticate and store a new session.
    ///
    /// Sent without a bearer token and outside the refresh path; a 401 here
    /// means the credentials were rejected.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Option<UserProfile>> {
        info!("Logging in");
        self.authenticate(LOGIN, credentials).await
    }

    /// Create an account and store the session it returns.
    #[instrument(skip(self, registration), fields(email = %registration.email()))]
    pub async fn register(&self, registration: &Registration) -> Result<Option<UserProfile>> {
        info!("Registering account");
        self.authenticate(REGISTER, registration).await
    }

    /// End the session locally. Safe to call when already logged out.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<()> {
        info!("Logging out");
        self.store().clear_session()
    }

    /// Run a refresh exchange now, without waiting for a 401.
    ///
    /// On failure the session is cleared and [`Error::SessionExpired`] is
    /// returned, exactly as when a dispatch triggers the refresh.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        self.refresh_exchange().await.map(|_| ())
    }

    /// The user profile stored with the current session.
    pub fn current_user(&self) -> Option<UserProfile> {
        self.store().user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store().is_authenticated()
    }

    async fn authenticate<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<UserProfile>> {
        let request = ApiRequest::post(path).with_json(body)?;
        let response = self.send_unauthenticated(&request).await?;

        if response.status() == 401 {
            let rejection = ApiError::from_body(401, response.body());
            debug!(reason = ?rejection.message, "Credentials rejected");
            return Err(Error::InvalidCredentials);
        }

        let auth: AuthResponse = response.error_for_status()?.json()?;
        let user = auth.user.map(UserProfile::new);

        let mut session = SessionData::new(
            AccessToken::new(auth.access_token),
            auth.refresh_token.map(RefreshToken::new),
        );
        session.user = user.clone();

        self.store().set_session(session)?;
        debug!(has_user = user.is_some(), "Session stored");
        Ok(user)
    }
}
