//! Raw request command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use healthlog_client::{ApiRequest, Method};

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

use super::records::parse_pairs;
use super::{BodyArgs, explain};

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    pub method: String,

    /// Path relative to the API base, e.g. /days
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query", value_name = "KEY=VALUE")]
    pub query: Vec<String>,

    /// Extra header as name=value (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME=VALUE")]
    pub header: Vec<String>,

    #[command(flatten)]
    pub body: BodyArgs,
}

pub async fn run(args: RequestArgs, global: &GlobalArgs) -> Result<()> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;

    let mut request = ApiRequest::new(method, &args.path);
    for (key, value) in parse_pairs(&args.query)? {
        request = request.with_query(key, value);
    }
    for (name, value) in parse_pairs(&args.header)? {
        request = request.with_header(name, value)?;
    }
    if let Some(body) = args.body.read()? {
        request = request.with_body(body);
    }

    let client = session::connect_authenticated(global)?;
    let response = client.dispatch(&request).await.map_err(explain)?;

    eprintln!("{}", format!("HTTP {}", response.status()).dimmed());
    if response.body().is_empty() {
        return Ok(());
    }
    match response.json_value() {
        Ok(value) => output::json_pretty(&value),
        Err(_) => {
            println!("{}", response.text());
            Ok(())
        }
    }
}
