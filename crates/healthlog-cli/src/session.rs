//! Building the authenticated client from CLI settings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use healthlog_client::{AuthClient, ClientConfig, RefreshMode};
use healthlog_core::{ApiUrl, SessionStore};
use healthlog_store::FileSessionStore;

use crate::cli::GlobalArgs;

/// Default session file location.
fn default_session_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "healthlog").context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("session.json"))
}

/// Open the persisted session and build a client over it.
pub fn connect(args: &GlobalArgs) -> Result<AuthClient> {
    let api = ApiUrl::new(&args.api).context("Invalid API URL")?;

    let path = match &args.session_file {
        Some(path) => path.clone(),
        None => default_session_path()?,
    };
    debug!(path = %path.display(), "Using session file");
    let store = FileSessionStore::open(&path)
        .with_context(|| format!("Failed to open session file {}", path.display()))?;

    let mode = if args.coalesce_refresh {
        RefreshMode::Coalesced
    } else {
        RefreshMode::PerRequest
    };
    let config = ClientConfig::new(api)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_refresh_mode(mode)
        .with_user_agent(concat!("healthlog-cli/", env!("HEALTHLOG_VERSION")));

    let store: Arc<dyn SessionStore> = Arc::new(store);
    AuthClient::new(config, store).context("Failed to build HTTP client")
}

/// Build a client and require an existing session.
pub fn connect_authenticated(args: &GlobalArgs) -> Result<AuthClient> {
    let client = connect(args)?;
    anyhow::ensure!(
        client.is_authenticated(),
        "No active session. Run 'healthlog login' first."
    );
    Ok(client)
}
