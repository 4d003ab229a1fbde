//! The `data_model_ci` resource: one UCMDB configuration item.
//!
//! The CI is created through the data model endpoint, read back by id,
//! replaced wholesale on update and deleted by id. State is
//! `{id, type, properties: [{name, description}], last_updated}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::client::{ConfigurationItem, DataModelChange, TopologyData, UcmdbApi};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Block, NestedBlock, Presence, Schema, StringRule};
use crate::types::{AttributeChange, PlanResult};

/// Resource type name.
pub const NAME: &str = "data_model_ci";

/// `last_updated` format: RFC 850, e.g. `Monday, 02-Jan-06 15:04:05 UTC`.
const LAST_UPDATED_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S UTC";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
    })
}

/// The single `properties` block of a CI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiProperties {
    /// CI name.
    pub name: String,
    /// CI description; empty when not set.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl CiProperties {
    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("description".into(), Value::String(self.description.clone()));
        map
    }
}

/// Resource state document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CiState {
    /// UCMDB id; empty while the CI is absent or its identity is unresolved.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// CI type.
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub ci_type: String,
    /// Exactly one block once configured.
    #[serde(default, deserialize_with = "one_or_many")]
    pub properties: Vec<CiProperties>,
    /// Time of the last in-place update.
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl CiState {
    /// Parse a state or configuration document. `null` is an absent CI.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Render the state document.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    fn properties_block(&self) -> Result<&CiProperties, ProviderError> {
        match self.properties.as_slice() {
            [block] => Ok(block),
            blocks => Err(ProviderError::Validation(format!(
                "expected exactly one properties block, got {}",
                blocks.len()
            ))),
        }
    }

    /// Build the CI payload for this state under `ucmdb_id`.
    pub fn payload(&self, ucmdb_id: &str) -> Result<ConfigurationItem, ProviderError> {
        Ok(ConfigurationItem {
            ucmdb_id: ucmdb_id.to_string(),
            ci_type: self.ci_type.clone(),
            properties: self.properties_block()?.to_map(),
        })
    }

    fn differs_from(&self, other: &CiState) -> bool {
        self.ci_type != other.ci_type || self.properties != other.properties
    }
}

/// How UCMDB answered a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A single new CI was added.
    Added(String),
    /// Nothing was added; a single existing CI was merged into.
    Updated(String),
    /// Nothing was added; a single CI was ignored.
    Ignored(String),
    /// Any other response shape.
    Unexpected(DataModelChange),
}

impl CreateOutcome {
    /// Classify a create response. Checked in order: one added, then one
    /// updated with none added, then one ignored with none added.
    pub fn classify(change: &DataModelChange) -> Self {
        match (
            change.added_cis.as_slice(),
            change.updated_cis.as_slice(),
            change.ignored_cis.as_slice(),
        ) {
            ([id], _, _) => CreateOutcome::Added(id.clone()),
            ([], [id], _) => CreateOutcome::Updated(id.clone()),
            ([], _, [id]) => CreateOutcome::Ignored(id.clone()),
            _ => CreateOutcome::Unexpected(change.clone()),
        }
    }
}

fn format_last_updated(at: DateTime<Utc>) -> String {
    at.format(LAST_UPDATED_FORMAT).to_string()
}

/// Schema for `data_model_ci`.
pub fn schema() -> Schema {
    let properties = Block::new()
        .with_attribute(
            "name",
            Attribute::required_string().with_description("CI name"),
        )
        .with_attribute(
            "description",
            Attribute::optional_string().with_description("CI description"),
        );

    Schema::v0()
        .with_description("A UCMDB configuration item")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_description("CI type.")
                .with_rule(StringRule::NotEmpty),
        )
        .with_attribute(
            "last_updated",
            Attribute::new(AttributeType::String, Presence::OptionalComputed),
        )
        .with_block(
            "properties",
            NestedBlock::set(properties).with_min_items(1).with_max_items(1),
        )
}

/// Plan a create, update or destroy.
pub fn plan(prior: Option<&Value>, proposed: &Value) -> Result<PlanResult, ProviderError> {
    let prior = match prior {
        Some(value) if !value.is_null() => Some(CiState::from_value(value)?),
        _ => None,
    };

    if proposed.is_null() {
        let changes = prior
            .map(|state| -> Result<_, ProviderError> {
                Ok(vec![
                    AttributeChange::removed("type", Value::String(state.ci_type.clone())),
                    AttributeChange::removed(
                        "properties",
                        serde_json::to_value(&state.properties)?,
                    ),
                ])
            })
            .transpose()?
            .unwrap_or_default();
        return Ok(PlanResult::with_changes(Value::Null, changes));
    }

    let mut planned = CiState::from_value(proposed)?;
    let Some(prior) = prior else {
        let changes = vec![
            AttributeChange::added("type", Value::String(planned.ci_type.clone())),
            AttributeChange::added("properties", serde_json::to_value(&planned.properties)?),
        ];
        return Ok(PlanResult::with_changes(planned.to_value()?, changes));
    };

    planned.id = prior.id.clone();
    if planned.last_updated.is_none() {
        planned.last_updated = prior.last_updated.clone();
    }

    let mut changes = Vec::new();
    if planned.ci_type != prior.ci_type {
        changes.push(AttributeChange::modified(
            "type",
            Value::String(prior.ci_type.clone()),
            Value::String(planned.ci_type.clone()),
        ));
    }
    if planned.properties != prior.properties {
        changes.push(AttributeChange::modified(
            "properties",
            serde_json::to_value(&prior.properties)?,
            serde_json::to_value(&planned.properties)?,
        ));
    }

    if changes.is_empty() {
        Ok(PlanResult::no_change(planned.to_value()?))
    } else {
        Ok(PlanResult::with_changes(planned.to_value()?, changes))
    }
}

/// Create the CI and return its refreshed state.
///
/// When UCMDB merges the payload into an existing CI (updated or ignored)
/// the resulting id is not reported back, so the state is left without an
/// identity and the follow-up read reports the resource absent.
pub async fn create(api: &dyn UcmdbApi, planned: &Value) -> Result<Value, ProviderError> {
    let mut state = CiState::from_value(planned)?;
    // UCMDB resolves data-model references by CI type.
    let payload = TopologyData {
        cis: vec![state.payload(&state.ci_type)?],
        relations: Vec::new(),
    };

    let change = api.create_data_model(&payload).await?;
    state.id = match CreateOutcome::classify(&change) {
        CreateOutcome::Added(id) => {
            info!(ci = %id, ci_type = %state.ci_type, "Created configuration item");
            id
        }
        CreateOutcome::Updated(id) => {
            warn!(ci = %id, "resource ci updated");
            String::new()
        }
        CreateOutcome::Ignored(id) => {
            warn!(ci = %id, "resource ci ignored");
            String::new()
        }
        CreateOutcome::Unexpected(change) => {
            warn!(%change, "create resource ci returned an unexpected result");
            return Err(ProviderError::AmbiguousCreate(change.to_string()));
        }
    };

    refresh(api, state).await
}

/// Read the CI named by the state's id. Returns `Value::Null` when absent.
pub async fn read(api: &dyn UcmdbApi, current: &Value) -> Result<Value, ProviderError> {
    refresh(api, CiState::from_value(current)?).await
}

async fn refresh(api: &dyn UcmdbApi, mut state: CiState) -> Result<Value, ProviderError> {
    if state.id.is_empty() {
        debug!("No configuration item id in state; treating as absent");
        return Ok(Value::Null);
    }

    let ci = api.get_configuration_item(&state.id).await?;
    state.ci_type = ci.ci_type.clone();
    state.properties = vec![CiProperties {
        name: ci.required_string_property("name")?.to_string(),
        description: ci.required_string_property("description")?.to_string(),
    }];
    state.to_value()
}

/// Apply a planned change in place and return the refreshed state.
///
/// The update call is made only when `type` or `properties` changed.
pub async fn update(
    api: &dyn UcmdbApi,
    prior: &Value,
    planned: &Value,
) -> Result<Value, ProviderError> {
    let prior = CiState::from_value(prior)?;
    let mut state = CiState::from_value(planned)?;
    state.id = prior.id.clone();

    if state.differs_from(&prior) {
        let item = state.payload(&state.id)?;
        let change = api.update_configuration_item(&state.id, &item).await?;
        debug!(ci = %state.id, %change, "Updated configuration item");
        state.last_updated = Some(format_last_updated(Utc::now()));
    } else if state.last_updated.is_none() {
        state.last_updated = prior.last_updated;
    }

    refresh(api, state).await
}

/// Delete the CI named by the state's id.
pub async fn delete(api: &dyn UcmdbApi, current: &Value) -> Result<(), ProviderError> {
    let state = CiState::from_value(current)?;
    if state.id.is_empty() {
        debug!("No configuration item id in state; nothing to delete");
        return Ok(());
    }

    let change = api.delete_configuration_item(&state.id).await?;
    info!(ci = %state.id, %change, "Deleted configuration item");
    Ok(())
}

/// State for an imported CI: the given id, filled in by the next read.
pub fn import(id: &str) -> Value {
    serde_json::json!({ "id": id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn change(added: &[&str], updated: &[&str], ignored: &[&str]) -> DataModelChange {
        let ids = |ids: &[&str]| ids.iter().map(|s| s.to_string()).collect();
        DataModelChange {
            added_cis: ids(added),
            removed_cis: Vec::new(),
            updated_cis: ids(updated),
            ignored_cis: ids(ignored),
        }
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(
            CreateOutcome::classify(&change(&["CI123"], &["u"], &[])),
            CreateOutcome::Added("CI123".into())
        );
        assert_eq!(
            CreateOutcome::classify(&change(&[], &["u"], &["i"])),
            CreateOutcome::Updated("u".into())
        );
        assert_eq!(
            CreateOutcome::classify(&change(&[], &[], &["i"])),
            CreateOutcome::Ignored("i".into())
        );
    }

    #[test]
    fn test_classify_unexpected_shapes() {
        for shape in [
            change(&[], &[], &["i1", "i2"]),
            change(&[], &[], &[]),
            change(&["a1", "a2"], &[], &[]),
            change(&[], &["u1", "u2"], &[]),
        ] {
            assert!(matches!(
                CreateOutcome::classify(&shape),
                CreateOutcome::Unexpected(_)
            ));
        }
    }

    #[test]
    fn test_state_parsing() {
        let state = CiState::from_value(&json!({
            "id": null,
            "type": "node",
            "properties": {"name": "web01", "description": null}
        }))
        .unwrap();
        assert_eq!(state.id, "");
        assert_eq!(
            state.properties,
            vec![CiProperties {
                name: "web01".into(),
                description: String::new()
            }]
        );

        let imported = CiState::from_value(&import("4d1c0a")).unwrap();
        assert_eq!(imported.id, "4d1c0a");
        assert!(imported.properties.is_empty());
    }

    #[test]
    fn test_payload_uses_declared_properties() {
        let state = CiState::from_value(&json!({
            "type": "node",
            "properties": [{"name": "web01"}]
        }))
        .unwrap();
        let item = state.payload("node").unwrap();
        assert_eq!(item.ucmdb_id, "node");
        assert_eq!(item.ci_type, "node");
        assert_eq!(item.properties["name"], "web01");
        assert_eq!(item.properties["description"], "");

        let empty = CiState::default();
        assert!(matches!(
            empty.payload("x"),
            Err(ProviderError::Validation(_))
        ));
    }

    #[test]
    fn test_last_updated_format() {
        let at = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(format_last_updated(at), "Monday, 02-Jan-06 15:04:05 UTC");
    }

    #[test]
    fn test_plan_create_update_destroy() {
        let proposed = json!({"type": "node", "properties": [{"name": "web01"}]});

        let create = plan(None, &proposed).unwrap();
        assert_eq!(create.changes.len(), 2);
        assert!(!create.requires_replace);

        let prior = json!({
            "id": "4d1c0a",
            "type": "node",
            "properties": [{"name": "web01", "description": ""}],
            "last_updated": null
        });
        let unchanged = plan(Some(&prior), &proposed).unwrap();
        assert!(unchanged.changes.is_empty());
        assert_eq!(unchanged.planned_state["id"], "4d1c0a");

        let renamed = json!({"type": "node", "properties": [{"name": "web02"}]});
        let update = plan(Some(&prior), &renamed).unwrap();
        assert_eq!(update.changes.len(), 1);
        assert_eq!(update.changes[0].path, "properties");

        let destroy = plan(Some(&prior), &Value::Null).unwrap();
        assert!(destroy.planned_state.is_null());
        assert_eq!(destroy.changes.len(), 2);
        assert!(destroy.changes.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_schema_rejects_empty_type() {
        let diags = crate::validation::validate(
            &schema(),
            &json!({"type": "", "properties": [{"name": "web01"}]}),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("type"));
    }
}
