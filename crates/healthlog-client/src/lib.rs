//! healthlog-client - Authenticated HTTP client for the healthlog backend.
//!
//! Every request goes through [`AuthClient::dispatch`], which attaches the
//! current bearer token and recovers from an expired access token with a
//! single refresh exchange before giving up.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use healthlog_client::{ApiRequest, AuthClient, ClientConfig};
//! use healthlog_core::{ApiUrl, Credentials, MemorySessionStore, Resource};
//!
//! # async fn example() -> Result<(), healthlog_core::Error> {
//! let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
//! let client = AuthClient::new(config, Arc::new(MemorySessionStore::new()))?;
//!
//! client.login(&Credentials::new("alice@example.com", "hunter2")).await?;
//!
//! let days = client.resource(Resource::Days).list(&[("date", "2024-05-01")]).await?;
//! println!("{days}");
//!
//! let response = client.dispatch(&ApiRequest::get("/agents/summary")).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod config;
mod endpoints;
mod request;
mod resources;

pub use client::AuthClient;
pub use config::{ClientConfig, DEFAULT_TIMEOUT, RefreshMode};
pub use request::{ApiRequest, ApiResponse};
pub use resources::ResourceClient;

pub use reqwest::Method;
