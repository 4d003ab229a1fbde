//! Wire models for the UCMDB REST API.
//!
//! Field names follow UCMDB's camelCase JSON. Relations are carried through
//! untouched; this provider never creates or inspects them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProviderError;

/// A topology query: one node per CI type being searched for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopologyQuery {
    /// Node filters.
    pub nodes: Vec<Node>,
    /// Relations between nodes.
    #[serde(default)]
    pub relations: Vec<Value>,
}

/// A single node filter in a [`TopologyQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// CI type the node matches.
    #[serde(rename = "type")]
    pub ci_type: String,
    /// Identifier of the node within the query.
    pub query_identifier: String,
    /// Whether matching CIs are returned.
    pub visible: bool,
    /// Whether subtypes of `ci_type` also match.
    pub include_subtypes: bool,
    /// Properties returned for each matching CI.
    pub layout: Vec<String>,
    /// Conditions every matching CI must satisfy.
    pub attribute_conditions: Vec<AttributeCondition>,
}

/// A condition on one CI attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeCondition {
    /// Attribute name, e.g. `name`.
    pub attribute: String,
    /// Comparison operator, e.g. `in`.
    pub operator: String,
    /// Operand; a list for `in`.
    pub value: Value,
}

/// Response of a topology query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopologyResult {
    /// Matching configuration items.
    #[serde(default)]
    pub cis: Vec<ConfigurationItem>,
    /// Relations between the returned CIs.
    #[serde(default)]
    pub relations: Vec<Value>,
}

/// A configuration item as UCMDB returns and accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationItem {
    /// UCMDB identity, or a temporary reference inside a create payload.
    pub ucmdb_id: String,
    /// CI type.
    #[serde(rename = "type")]
    pub ci_type: String,
    /// Property values keyed by property name.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl ConfigurationItem {
    /// Read an optional string property.
    ///
    /// Absent and `null` properties yield `Ok(None)`; any other non-string value
    /// is a type mismatch.
    pub fn string_property(&self, name: &str) -> Result<Option<&str>, ProviderError> {
        match self.properties.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(ProviderError::type_mismatch(name, "string", Some(other))),
        }
    }

    /// Read a string property that must be present.
    pub fn required_string_property(&self, name: &str) -> Result<&str, ProviderError> {
        self.string_property(name)?
            .ok_or_else(|| ProviderError::type_mismatch(name, "string", self.properties.get(name)))
    }
}

/// Payload of a data model create call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TopologyData {
    /// CIs to create or merge.
    pub cis: Vec<ConfigurationItem>,
    /// Relations to create or merge.
    #[serde(default)]
    pub relations: Vec<Value>,
}

/// Outcome of a data model write: which CI ids were touched and how.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModelChange {
    /// CIs created by the call.
    #[serde(default)]
    pub added_cis: Vec<String>,
    /// CIs removed by the call.
    #[serde(default)]
    pub removed_cis: Vec<String>,
    /// Existing CIs the call merged into.
    #[serde(default)]
    pub updated_cis: Vec<String>,
    /// CIs the server ignored.
    #[serde(default)]
    pub ignored_cis: Vec<String>,
}

impl fmt::Display for DataModelChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={:?} removed={:?} updated={:?} ignored={:?}",
            self.added_cis, self.removed_cis, self.updated_cis, self.ignored_cis
        )
    }
}
