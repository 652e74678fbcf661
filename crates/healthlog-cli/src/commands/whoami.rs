//! Whoami command implementation.

use anyhow::Result;
use clap::Args;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub fn run(_args: WhoamiArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect_authenticated(global)?;

    output::field("API", client.config().base_url().as_str());
    match client.current_user() {
        Some(user) => {
            if let Some(email) = user.email() {
                output::field("Email", email);
            }
            if let Some(name) = user.name() {
                output::field("Name", name);
            }
            if let Some(id) = user.id() {
                output::field("User ID", &id);
            }
        }
        None => output::field("User", "(no profile stored)"),
    }

    Ok(())
}
