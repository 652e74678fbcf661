//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use healthlog_core::{Credentials, UserProfile};

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "HEALTHLOG_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;
    let credentials = Credentials::new(&args.email, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let user = client
        .login(&credentials)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    print_user(user.as_ref(), credentials.email());

    Ok(())
}

/// Print the fields of a user profile the backend returned.
pub fn print_user(user: Option<&UserProfile>, fallback_email: &str) {
    let email = user.and_then(UserProfile::email).unwrap_or(fallback_email);
    output::field("Email", email);

    if let Some(name) = user.and_then(UserProfile::name) {
        output::field("Name", name);
    }
    if let Some(id) = user.and_then(UserProfile::id) {
        output::field("User ID", &id);
    }
}
