//! UCMDB API access.
//!
//! [`UcmdbApi`] is the seam between provider logic and the network. The
//! provider holds an `Arc<dyn UcmdbApi>` built at configure time and passes it
//! to every data source and resource operation; [`RestClient`] is the
//! production implementation.

mod error;
mod models;
mod rest;

use async_trait::async_trait;

pub use error::{ClientError, Result};
pub use models::{
    AttributeCondition, ConfigurationItem, DataModelChange, Node, TopologyData, TopologyQuery,
    TopologyResult,
};
pub use rest::RestClient;

/// The calls the provider makes against UCMDB.
#[async_trait]
pub trait UcmdbApi: Send + Sync {
    /// Run a topology query.
    async fn execute_query(&self, query: &TopologyQuery) -> Result<TopologyResult>;

    /// Fetch one configuration item by id.
    async fn get_configuration_item(&self, id: &str) -> Result<ConfigurationItem>;

    /// Create (or merge) the given CIs.
    async fn create_data_model(&self, data: &TopologyData) -> Result<DataModelChange>;

    /// Replace the properties of one configuration item.
    async fn update_configuration_item(
        &self,
        id: &str,
        item: &ConfigurationItem,
    ) -> Result<DataModelChange>;

    /// Delete one configuration item.
    async fn delete_configuration_item(&self, id: &str) -> Result<DataModelChange>;
}
