//! Subcommand implementations.

mod login;
mod logout;
mod records;
mod refresh;
mod register;
mod request;
mod whoami;

use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;

use crate::cli::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and save the session
    Login(login::LoginArgs),

    /// Create an account and save the session
    Register(register::RegisterArgs),

    /// Forget the saved session
    Logout(logout::LogoutArgs),

    /// Display the logged-in user
    Whoami(whoami::WhoamiArgs),

    /// Exchange the refresh token for a new access token
    Refresh(refresh::RefreshArgs),

    /// List a collection (days, meals, exercises, water-intakes, sleep, moods, notes, agents)
    List(records::ListArgs),

    /// Fetch one item from a collection
    Get(records::GetArgs),

    /// Create an item in a collection
    Create(records::CreateArgs),

    /// Replace an item in a collection
    Update(records::UpdateArgs),

    /// Delete an item from a collection
    Delete(records::DeleteArgs),

    /// Send an arbitrary authenticated request
    Request(request::RequestArgs),
}

pub async fn handle(cmd: Command, global: &GlobalArgs) -> Result<()> {
    match cmd {
        Command::Login(args) => login::run(args, global).await,
        Command::Register(args) => register::run(args, global).await,
        Command::Logout(args) => logout::run(args, global),
        Command::Whoami(args) => whoami::run(args, global),
        Command::Refresh(args) => refresh::run(args, global).await,
        Command::List(args) => records::list(args, global).await,
        Command::Get(args) => records::get(args, global).await,
        Command::Create(args) => records::create(args, global).await,
        Command::Update(args) => records::update(args, global).await,
        Command::Delete(args) => records::delete(args, global).await,
        Command::Request(args) => request::run(args, global).await,
    }
}

/// A JSON request body given inline or read from a file.
#[derive(Args, Debug)]
pub struct BodyArgs {
    /// JSON file with the request body (use - for stdin)
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,

    /// Inline JSON request body
    #[arg(long)]
    pub data: Option<String>,
}

impl BodyArgs {
    /// Read the body, if one was given.
    pub fn read(&self) -> Result<Option<Value>> {
        if let Some(ref data) = self.data {
            return serde_json::from_str(data)
                .context("Invalid JSON in --data")
                .map(Some);
        }

        let Some(ref path) = self.json else {
            return Ok(None);
        };

        let content = if path == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        } else {
            std::fs::read_to_string(path).context("Failed to read JSON file")?
        };

        serde_json::from_str(&content)
            .context("Invalid JSON body")
            .map(Some)
    }

    /// Read the body, failing if none was given.
    pub fn require(&self) -> Result<Value> {
        self.read()?
            .context("A request body is required (--json or --data)")
    }
}

/// Attach a re-login hint to session expiry.
pub fn explain(err: healthlog_core::Error) -> anyhow::Error {
    if err.is_session_expired() {
        anyhow::Error::new(err).context("Session expired. Run 'healthlog login' again.")
    } else {
        err.into()
    }
}
