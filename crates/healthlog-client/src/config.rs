//! Client configuration.

use std::time::Duration;

use healthlog_core::ApiUrl;

/// Timeout applied to requests that do not carry their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How concurrent 401s share refresh exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    /// Every rejected request runs its own refresh exchange. Two requests
    /// failing at once may cause two refresh calls.
    #[default]
    PerRequest,

    /// Refreshes pass through a single gate. A request that reaches the gate
    /// after another request already replaced the rejected token reuses the
    /// new token instead of refreshing again.
    Coalesced,
}

/// Configuration for an [`AuthClient`](crate::AuthClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: ApiUrl,
    timeout: Duration,
    refresh_mode: RefreshMode,
    user_agent: String,
}

impl ClientConfig {
    /// Configuration with the default timeout and refresh mode.
    pub fn new(base_url: ApiUrl) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            refresh_mode: RefreshMode::default(),
            user_agent: concat!("healthlog/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn base_url(&self) -> &ApiUrl {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        self.refresh_mode
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
