//! healthlog-core - Core types and traits for the healthlog API client.
//!
//! This crate holds everything the transport and storage crates agree on:
//! the opaque token types, the [`SessionStore`] contract, the API base URL,
//! the domain [`Resource`] collections and the unified [`Error`] taxonomy.

pub mod credentials;
pub mod error;
pub mod session;
pub mod tokens;
pub mod types;

pub use credentials::{Credentials, Registration};
pub use error::{ApiError, Error, InvalidInputError, StoreError, TransportError};
pub use session::{MemorySessionStore, SessionData, SessionStore, UserProfile};
pub use tokens::{AccessToken, RefreshToken};
pub use types::{ApiUrl, Resource};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
