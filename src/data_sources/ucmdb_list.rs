//! The `ucmdb_list` data source: look up CIs by type and name.
//!
//! Each filter becomes one topology query node matching `name in names` on
//! the filter's CI type (subtypes included). The matches are flattened into
//! `items`, and the data source id is a checksum of the returned ids so
//! identical results always yield the same id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{AttributeCondition, Node, TopologyQuery, UcmdbApi};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeType, Block, NestedBlock, Presence, Schema};

/// Data source type name.
pub const NAME: &str = "ucmdb_list";

/// One `filter` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// CI type to search.
    #[serde(rename = "type")]
    pub ci_type: String,
    /// CI names to match.
    pub names: Vec<String>,
}

/// One entry of the computed `items` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    /// UCMDB id of the CI.
    pub ucmdb_id: String,
    /// CI type.
    #[serde(rename = "type")]
    pub ci_type: String,
    /// CI name.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    filter: Vec<Filter>,
}

#[derive(Debug, Serialize)]
struct State {
    id: String,
    filter: Vec<Filter>,
    items: Vec<ListItem>,
}

/// Schema for `ucmdb_list`.
pub fn schema() -> Schema {
    let filter = Block::new()
        .with_attribute(
            "type",
            Attribute::required_string().with_description("CI type to search"),
        )
        .with_attribute(
            "names",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                Presence::Required,
            )
            .with_description("CI names to match"),
        );

    let item = AttributeType::object([
        ("ucmdb_id", AttributeType::String),
        ("type", AttributeType::String),
        ("name", AttributeType::String),
    ]);

    Schema::v0()
        .with_description("Look up UCMDB configuration items by type and name")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "items",
            Attribute::new(AttributeType::set(item), Presence::Computed)
                .with_description("Matching configuration items"),
        )
        .with_block("filter", NestedBlock::set(filter).with_min_items(1))
}

/// Build the topology query for a set of filters: one node per filter.
pub fn build_query(filters: &[Filter]) -> TopologyQuery {
    let nodes = filters
        .iter()
        .map(|filter| Node {
            ci_type: filter.ci_type.clone(),
            query_identifier: filter.ci_type.clone(),
            visible: true,
            include_subtypes: true,
            layout: vec!["name".to_string()],
            attribute_conditions: vec![AttributeCondition {
                attribute: "name".to_string(),
                operator: "in".to_string(),
                value: json!(filter.names),
            }],
        })
        .collect();

    TopologyQuery {
        nodes,
        relations: Vec::new(),
    }
}

/// Checksum id over the concatenation of `ids`.
///
/// CRC-32 (IEEE) rendered in decimal; no ids hash the empty string to `"0"`.
pub fn synthetic_id<S: AsRef<str>>(ids: &[S]) -> String {
    let mut hasher = crc32fast::Hasher::new();
    for id in ids {
        hasher.update(id.as_ref().as_bytes());
    }
    hasher.finalize().to_string()
}

/// Run the lookup for a data source configuration and return its state.
pub async fn read(api: &dyn UcmdbApi, config: &Value) -> Result<Value, ProviderError> {
    let Config { filter } = serde_json::from_value(config.clone())?;
    let query = build_query(&filter);

    let result = api.execute_query(&query).await?;
    debug!(
        nodes = query.nodes.len(),
        cis = result.cis.len(),
        response = %serde_json::to_string(&result).unwrap_or_default(),
        "Topology query completed"
    );

    let items = result
        .cis
        .iter()
        .map(|ci| {
            Ok(ListItem {
                ucmdb_id: ci.ucmdb_id.clone(),
                ci_type: ci.ci_type.clone(),
                name: ci.required_string_property("name")?.to_string(),
            })
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;

    let ids: Vec<&str> = items.iter().map(|item| item.ucmdb_id.as_str()).collect();
    let state = State {
        id: synthetic_id(&ids),
        filter,
        items,
    };
    Ok(serde_json::to_value(state)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    #[test]
    fn test_build_query_one_node_per_filter() {
        let query = build_query(&[Filter {
            ci_type: "host".into(),
            names: vec!["a".into(), "b".into()],
        }]);

        assert_eq!(query.nodes.len(), 1);
        let node = &query.nodes[0];
        assert_eq!(node.ci_type, "host");
        assert_eq!(node.query_identifier, "host");
        assert!(node.visible);
        assert!(node.include_subtypes);
        assert_eq!(node.layout, vec!["name".to_string()]);
        assert_eq!(
            node.attribute_conditions,
            vec![AttributeCondition {
                attribute: "name".into(),
                operator: "in".into(),
                value: json!(["a", "b"]),
            }]
        );
    }

    #[test]
    fn test_build_query_empty() {
        assert!(build_query(&[]).nodes.is_empty());
    }

    #[test]
    fn test_synthetic_id() {
        let none: [&str; 0] = [];
        assert_eq!(synthetic_id(&none), "0");
        // crc32("123456789") is the standard IEEE check value.
        assert_eq!(synthetic_id(&["1234", "56789"]), "3421780262");
        assert_eq!(synthetic_id(&["123456789"]), synthetic_id(&["1234", "56789"]));
    }

    #[test]
    fn test_schema_requires_filter() {
        let diags = validate(&schema(), &json!({}));
        assert!(diags.iter().any(|d| d.is_error()));

        let diags = validate(
            &schema(),
            &json!({"filter": [{"type": "host", "names": ["web01"]}]}),
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }
}
