//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] in-process, without a gRPC
//! server. [`FakeUcmdb`] is an in-memory [`UcmdbApi`] that stores CIs,
//! answers topology queries by type and name, and records every call.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hemmer_provider_ucmdb::testing::{FakeUcmdb, ProviderTester};
//! use hemmer_provider_ucmdb::UcmdbProvider;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let fake = Arc::new(FakeUcmdb::new());
//! let tester = ProviderTester::new(UcmdbProvider::configured(fake.clone()));
//!
//! let state = tester
//!     .lifecycle_create(
//!         "data_model_ci",
//!         json!({"type": "node", "properties": [{"name": "web01"}]}),
//!     )
//!     .await
//!     .unwrap();
//!
//! assert_eq!(state["properties"][0]["name"], "web01");
//! assert_eq!(fake.call_count("create_data_model"), 1);
//! # });
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{
    ClientError, ConfigurationItem, DataModelChange, Result as ClientResult, TopologyData,
    TopologyQuery, TopologyResult, UcmdbApi,
};
use crate::error::ProviderError;
use crate::schema::Diagnostic;
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// A test harness for a [`ProviderService`].
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Validate provider configuration; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Plan, create, then read. Returns the state after the read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read. Returns the state after the read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// Plan a destroy, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation returned error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  {}", diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that a plan creates the resource in place.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan has no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan changes the attribute at `path`.
///
/// # Panics
///
/// Panics if the plan has no change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that some error diagnostic's summary or detail contains `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let matches = |d: &&Diagnostic| {
        d.is_error()
            && (d.summary.contains(substring)
                || d.detail.as_deref().is_some_and(|detail| detail.contains(substring)))
    };
    assert!(
        diagnostics.iter().any(|d| matches(&d)),
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[derive(Default)]
struct FakeState {
    cis: BTreeMap<String, ConfigurationItem>,
    next_id: u64,
    create_responses: VecDeque<DataModelChange>,
    query_responses: VecDeque<TopologyResult>,
    failures: VecDeque<(u16, String)>,
    calls: Vec<&'static str>,
}

/// In-memory stand-in for a UCMDB server.
///
/// Creating a CI whose type and name match a stored CI merges into it and is
/// reported as an update, the way UCMDB reconciles identical CIs.
#[derive(Default)]
pub struct FakeUcmdb {
    state: Mutex<FakeState>,
}

impl FakeUcmdb {
    /// An empty server.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a call and return the scripted failure for it, if any.
    fn begin(&self, call: &'static str) -> ClientResult<MutexGuard<'_, FakeState>> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some((status, message)) => Err(ClientError::Api {
                status,
                url: format!("fake://{}", call),
                message,
            }),
            None => Ok(state),
        }
    }

    /// Store a CI with the given id, type and name.
    pub fn insert(&self, id: &str, ci_type: &str, name: &str, description: &str) {
        let mut properties = serde_json::Map::new();
        properties.insert("name".into(), Value::String(name.into()));
        properties.insert("description".into(), Value::String(description.into()));
        self.insert_item(ConfigurationItem {
            ucmdb_id: id.into(),
            ci_type: ci_type.into(),
            properties,
        });
    }

    /// Store a CI as-is.
    pub fn insert_item(&self, item: ConfigurationItem) {
        self.lock().cis.insert(item.ucmdb_id.clone(), item);
    }

    /// Fetch a stored CI.
    pub fn get(&self, id: &str) -> Option<ConfigurationItem> {
        self.lock().cis.get(id).cloned()
    }

    /// Number of stored CIs.
    pub fn len(&self) -> usize {
        self.lock().cis.len()
    }

    /// Whether no CIs are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Answer the next create call with `change` instead of storing anything.
    pub fn respond_to_create(&self, change: DataModelChange) {
        self.lock().create_responses.push_back(change);
    }

    /// Answer the next topology query with `result` instead of matching stored CIs.
    pub fn respond_to_query(&self, result: TopologyResult) {
        self.lock().query_responses.push_back(result);
    }

    /// Fail the next call of any kind with an API error.
    pub fn fail_next(&self, status: u16, message: &str) {
        self.lock().failures.push_back((status, message.to_string()));
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    /// How many times `call` was made.
    pub fn call_count(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == call).count()
    }

    fn not_found(id: &str) -> ClientError {
        ClientError::NotFound(format!("/rest-api/dataModel/ci/{}", id))
    }
}

fn matches_node(ci: &ConfigurationItem, node: &crate::client::Node) -> bool {
    if ci.ci_type != node.ci_type {
        return false;
    }
    node.attribute_conditions.iter().all(|condition| {
        let actual = ci.properties.get(&condition.attribute);
        match (condition.operator.as_str(), &condition.value) {
            ("in", Value::Array(values)) => actual.is_some_and(|a| values.contains(a)),
            _ => actual == Some(&condition.value),
        }
    })
}

#[async_trait]
impl UcmdbApi for FakeUcmdb {
    async fn execute_query(&self, query: &TopologyQuery) -> ClientResult<TopologyResult> {
        let mut state = self.begin("execute_query")?;
        if let Some(result) = state.query_responses.pop_front() {
            return Ok(result);
        }
        let cis = state
            .cis
            .values()
            .filter(|ci| query.nodes.iter().any(|node| matches_node(ci, node)))
            .cloned()
            .collect();
        Ok(TopologyResult {
            cis,
            relations: Vec::new(),
        })
    }

    async fn get_configuration_item(&self, id: &str) -> ClientResult<ConfigurationItem> {
        let state = self.begin("get_configuration_item")?;
        state.cis.get(id).cloned().ok_or_else(|| Self::not_found(id))
    }

    async fn create_data_model(&self, data: &TopologyData) -> ClientResult<DataModelChange> {
        let mut state = self.begin("create_data_model")?;
        if let Some(scripted) = state.create_responses.pop_front() {
            return Ok(scripted);
        }

        let mut change = DataModelChange::default();
        for item in &data.cis {
            let existing = state
                .cis
                .values_mut()
                .find(|ci| {
                    ci.ci_type == item.ci_type
                        && ci.properties.get("name") == item.properties.get("name")
                });
            if let Some(ci) = existing {
                ci.properties.extend(item.properties.clone());
                change.updated_cis.push(ci.ucmdb_id.clone());
                continue;
            }

            state.next_id += 1;
            let id = format!("{:032x}", state.next_id);
            state.cis.insert(
                id.clone(),
                ConfigurationItem {
                    ucmdb_id: id.clone(),
                    ci_type: item.ci_type.clone(),
                    properties: item.properties.clone(),
                },
            );
            change.added_cis.push(id);
        }
        Ok(change)
    }

    async fn update_configuration_item(
        &self,
        id: &str,
        item: &ConfigurationItem,
    ) -> ClientResult<DataModelChange> {
        let mut state = self.begin("update_configuration_item")?;
        let ci = state.cis.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        ci.ci_type = item.ci_type.clone();
        ci.properties = item.properties.clone();
        Ok(DataModelChange {
            updated_cis: vec![id.to_string()],
            ..Default::default()
        })
    }

    async fn delete_configuration_item(&self, id: &str) -> ClientResult<DataModelChange> {
        let mut state = self.begin("delete_configuration_item")?;
        state.cis.remove(id).ok_or_else(|| Self::not_found(id))?;
        Ok(DataModelChange {
            removed_cis: vec![id.to_string()],
            ..Default::default()
        })
    }
}
