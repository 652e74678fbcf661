//! Register command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use healthlog_core::Registration;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

use super::login::print_user;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long, env = "HEALTHLOG_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,
}

pub async fn run(args: RegisterArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect(global)?;

    let mut registration = Registration::new(&args.email, &args.password);
    if let Some(name) = args.name {
        registration = registration.with_name(name);
    }

    eprintln!("{}", "Creating account...".dimmed());

    let user = client
        .register(&registration)
        .await
        .context("Failed to register")?;

    output::success("Account created");
    print_user(user.as_ref(), &args.email);

    Ok(())
}
