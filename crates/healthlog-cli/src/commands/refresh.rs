//! Refresh command implementation.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

use super::explain;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect_authenticated(global)?;

    eprintln!("{}", "Refreshing session...".dimmed());

    // The store persists the new access token as part of the exchange.
    client.refresh().await.map_err(explain)?;

    output::success("Session refreshed successfully");
    Ok(())
}
