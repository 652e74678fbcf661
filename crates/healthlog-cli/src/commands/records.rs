//! Collection commands: list, get, create, update, delete.

use anyhow::{Context, Result, bail};
use clap::Args;

use healthlog_core::Resource;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

use super::{BodyArgs, explain};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Collection name
    pub resource: Resource,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query", value_name = "KEY=VALUE")]
    pub query: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Collection name
    pub resource: Resource,

    /// Item identifier
    pub id: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Collection name
    pub resource: Resource,

    #[command(flatten)]
    pub body: BodyArgs,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Collection name
    pub resource: Resource,

    /// Item identifier
    pub id: String,

    #[command(flatten)]
    pub body: BodyArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Collection name
    pub resource: Resource,

    /// Item identifier
    pub id: String,
}

pub async fn list(args: ListArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect_authenticated(global)?;
    let query = parse_pairs(&args.query)?;

    let items = client
        .resource(args.resource)
        .list(&query)
        .await
        .map_err(explain)
        .with_context(|| format!("Failed to list {}", args.resource))?;

    output::json_pretty(&items)
}

pub async fn get(args: GetArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect_authenticated(global)?;

    let item = client
        .resource(args.resource)
        .get(&args.id)
        .await
        .map_err(explain)
        .with_context(|| format!("Failed to fetch {} {}", args.resource, args.id))?;

    output::json_pretty(&item)
}

pub async fn create(args: CreateArgs, global: &GlobalArgs) -> Result<()> {
    let body = args.body.require()?;
    let client = session::connect_authenticated(global)?;

    let created = client
        .resource(args.resource)
        .create(&body)
        .await
        .map_err(explain)
        .with_context(|| format!("Failed to create {}", args.resource))?;

    output::success(&format!("Created in {}", args.resource));
    output::json_pretty(&created)
}

pub async fn update(args: UpdateArgs, global: &GlobalArgs) -> Result<()> {
    let body = args.body.require()?;
    let client = session::connect_authenticated(global)?;

    let updated = client
        .resource(args.resource)
        .update(&args.id, &body)
        .await
        .map_err(explain)
        .with_context(|| format!("Failed to update {} {}", args.resource, args.id))?;

    output::success(&format!("Updated {} {}", args.resource, args.id));
    output::json_pretty(&updated)
}

pub async fn delete(args: DeleteArgs, global: &GlobalArgs) -> Result<()> {
    let client = session::connect_authenticated(global)?;

    client
        .resource(args.resource)
        .delete(&args.id)
        .await
        .map_err(explain)
        .with_context(|| format!("Failed to delete {} {}", args.resource, args.id))?;

    output::success(&format!("Deleted {} {}", args.resource, args.id));
    Ok(())
}

/// Split `key=value` arguments.
pub(super) fn parse_pairs(raw: &[String]) -> Result<Vec<(&str, &str)>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key, value)),
            _ => bail!("Expected KEY=VALUE, got '{}'", pair),
        })
        .collect()
}
