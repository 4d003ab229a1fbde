//! The UCMDB provider: schema, configuration and dispatch.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::client::{RestClient, UcmdbApi};
use crate::config::{resolve_credentials, Credentials, TargetEnv};
use crate::data_sources::ucmdb_list;
use crate::error::ProviderError;
use crate::resources::data_model_ci;
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema, StringRule};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Builds the API handle for resolved credentials.
pub type Connector =
    Box<dyn Fn(&Credentials) -> Result<Arc<dyn UcmdbApi>, ProviderError> + Send + Sync>;

/// Provider for UCMDB configuration items.
///
/// `configure` resolves credentials for the chosen target environment and
/// builds one API handle, which every later operation uses.
pub struct UcmdbProvider {
    connector: Connector,
    client: RwLock<Option<Arc<dyn UcmdbApi>>>,
}

impl UcmdbProvider {
    /// A provider that connects through [`RestClient`].
    pub fn new() -> Self {
        Self::with_connector(|credentials| {
            Ok(Arc::new(RestClient::new(credentials)?) as Arc<dyn UcmdbApi>)
        })
    }

    /// A provider that builds its API handle with `connector` at configure time.
    pub fn with_connector<F>(connector: F) -> Self
    where
        F: Fn(&Credentials) -> Result<Arc<dyn UcmdbApi>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            connector: Box::new(connector),
            client: RwLock::new(None),
        }
    }

    /// A provider that is already configured with `client`.
    pub fn configured(client: Arc<dyn UcmdbApi>) -> Self {
        let provider = Self::with_connector(|_| {
            Err(ProviderError::Configuration(
                "provider was built with a fixed client".into(),
            ))
        });
        Self {
            client: RwLock::new(Some(client)),
            ..provider
        }
    }

    /// Schema of the provider block.
    pub fn provider_schema() -> Schema {
        let targets = TargetEnv::ALL.iter().map(|t| t.as_str().to_string()).collect();
        Schema::v0().with_attribute(
            "target_env",
            Attribute::required_string()
                .with_description("UCMDB environment to manage: CMS, OPSB or APM")
                .with_rule(StringRule::OneOf {
                    values: targets,
                    ignore_case: true,
                }),
        )
    }

    async fn client(&self) -> Result<Arc<dyn UcmdbApi>, ProviderError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }

    fn check_resource(resource_type: &str) -> Result<(), ProviderError> {
        if resource_type == data_model_ci::NAME {
            Ok(())
        } else {
            Err(ProviderError::UnknownResource(resource_type.to_string()))
        }
    }

    fn check_data_source(data_source_type: &str) -> Result<(), ProviderError> {
        if data_source_type == ucmdb_list::NAME {
            Ok(())
        } else {
            Err(ProviderError::UnknownResource(format!(
                "data source {}",
                data_source_type
            )))
        }
    }
}

impl Default for UcmdbProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderService for UcmdbProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(Self::provider_schema())
            .with_resource(data_model_ci::NAME, data_model_ci::schema())
            .with_data_source(ucmdb_list::NAME, ucmdb_list::schema())
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            plan_destroy: true,
            ..ProviderMetadata::from_schema(&self.schema())
        }
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&Self::provider_schema(), &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate(&Self::provider_schema(), &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let target_env = config.get("target_env");
        let target: TargetEnv = target_env
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::type_mismatch("target_env", "string", target_env))?
            .parse()?;
        let credentials = resolve_credentials(target)?;
        let client = (self.connector)(&credentials)?;

        *self.client.write().await = Some(client);
        info!(target = %target, address = %credentials.address, "Configured UCMDB provider");
        Ok(diagnostics)
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Self::check_resource(resource_type)?;
        Ok(validate(&data_model_ci::schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        Self::check_resource(resource_type)?;
        data_model_ci::plan(prior_state.as_ref(), &proposed_state)
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        Self::check_resource(resource_type)?;
        let client = self.client().await?;
        data_model_ci::create(client.as_ref(), &planned_state).await
    }

    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        Self::check_resource(resource_type)?;
        let client = self.client().await?;
        data_model_ci::read(client.as_ref(), &current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        Self::check_resource(resource_type)?;
        let client = self.client().await?;
        data_model_ci::update(client.as_ref(), &prior_state, &planned_state).await
    }

    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        Self::check_resource(resource_type)?;
        let client = self.client().await?;
        data_model_ci::delete(client.as_ref(), &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Self::check_resource(resource_type)?;
        Ok(vec![ImportedResource::new(
            data_model_ci::NAME,
            data_model_ci::import(id),
        )])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Self::check_data_source(data_source_type)?;
        Ok(validate(&ucmdb_list::schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        Self::check_data_source(data_source_type)?;
        let client = self.client().await?;
        ucmdb_list::read(client.as_ref(), &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeUcmdb;
    use serde_json::json;

    #[test]
    fn test_schema_lists_types() {
        let provider = UcmdbProvider::new();
        let metadata = provider.metadata();
        assert_eq!(metadata.resources, vec!["data_model_ci".to_string()]);
        assert_eq!(metadata.data_sources, vec!["ucmdb_list".to_string()]);
        assert!(metadata.plan_destroy);
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = UcmdbProvider::new();
        let err = provider
            .read("data_model_ci", json!({"id": "4d1c0a"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));

        let err = provider
            .read_data_source("ucmdb_list", json!({"filter": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured));
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = UcmdbProvider::configured(Arc::new(FakeUcmdb::new()));
        let err = provider.read("aws_instance", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(ref t) if t == "aws_instance"));

        let err = provider
            .read_data_source("aws_ami", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure_rejects_bad_target() {
        let provider = UcmdbProvider::new();
        let diags = provider
            .configure(json!({"target_env": "PROD"}))
            .await
            .unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("target_env"));
        assert_eq!(
            diags[0].detail.as_deref(),
            Some("expected target_env to be one of [CMS OPSB APM], got PROD")
        );

        let diags = provider.configure(json!({})).await.unwrap();
        assert!(diags.iter().any(Diagnostic::is_error));
    }

    #[tokio::test]
    async fn test_import_is_passthrough() {
        let provider = UcmdbProvider::new();
        let imported = provider
            .import_resource("data_model_ci", "4d1c0a")
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].state, json!({"id": "4d1c0a"}));
    }
}
