//! Pass-through CRUD for the domain collections.

use serde_json::Value;
use tracing::{debug, instrument};

use healthlog_core::{Resource, Result};

use crate::client::AuthClient;
use crate::request::ApiRequest;

/// CRUD calls against one [`Resource`] collection.
///
/// Payloads are opaque JSON; each call is a single
/// [`dispatch`](AuthClient::dispatch) and inherits its refresh behavior.
#[derive(Debug, Clone, Copy)]
pub struct ResourceClient<'a> {
    client: &'a AuthClient,
    resource: Resource,
}

impl AuthClient {
    /// Access one of the domain collections.
    pub fn resource(&self, resource: Resource) -> ResourceClient<'_> {
        ResourceClient {
            client: self,
            resource,
        }
    }
}

impl ResourceClient<'_> {
    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// List the collection. Query parameters are forwarded verbatim.
    #[instrument(skip(self), fields(resource = %self.resource))]
    pub async fn list(&self, query: &[(&str, &str)]) -> Result<Value> {
        debug!("Listing");
        let request = query
            .iter()
            .fold(ApiRequest::get(self.resource.path()), |req, (k, v)| {
                req.with_query(*k, *v)
            });
        self.client.dispatch(&request).await?.json_value()
    }

    #[instrument(skip(self), fields(resource = %self.resource))]
    pub async fn get(&self, id: &str) -> Result<Value> {
        debug!("Fetching");
        let request = ApiRequest::get(self.resource.item_path(id)?);
        self.client.dispatch(&request).await?.json_value()
    }

    #[instrument(skip(self, body), fields(resource = %self.resource))]
    pub async fn create(&self, body: &Value) -> Result<Value> {
        debug!("Creating");
        let request = ApiRequest::post(self.resource.path()).with_body(body.clone());
        self.client.dispatch(&request).await?.json_value()
    }

    #[instrument(skip(self, body), fields(resource = %self.resource))]
    pub async fn update(&self, id: &str, body: &Value) -> Result<Value> {
        debug!("Updating");
        let request = ApiRequest::put(self.resource.item_path(id)?).with_body(body.clone());
        self.client.dispatch(&request).await?.json_value()
    }

    #[instrument(skip(self), fields(resource = %self.resource))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        debug!("Deleting");
        let request = ApiRequest::delete(self.resource.item_path(id)?);
        self.client.dispatch(&request).await?;
        Ok(())
    }
}
