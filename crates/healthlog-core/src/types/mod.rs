//! Validated value types.

mod api_url;
mod resource;

pub use api_url::ApiUrl;
pub use resource::Resource;
