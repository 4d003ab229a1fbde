//! Schema validation helpers.
//!
//! Validates a `serde_json::Value` against a [`Schema`], producing one
//! [`Diagnostic`] per problem so the host can point at the offending attribute.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_ucmdb::schema::{Attribute, Schema, StringRule};
//! use hemmer_provider_ucmdb::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("type", Attribute::required_string().with_rule(StringRule::NotEmpty));
//!
//! assert!(validate(&schema, &json!({"type": "node"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"type": ""}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("type".to_string()));
//! ```

use serde_json::{Map, Value};

use crate::error::json_type_name;
use crate::schema::{Attribute, AttributeType, Block, Diagnostic, NestedBlock, Presence, Schema};

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is
/// valid. Checked:
///
/// - required attributes are present and non-null
/// - configured values have the schema's type
/// - string values satisfy the attribute's
///   [`StringRule`](crate::schema::StringRule)s, once the type is right
/// - nested blocks respect their item counts and are validated recursively
///
/// Computed-only attributes are never checked; the provider sets them.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut validator = Validator::default();
    validator.block(&schema.block, value, "");
    validator.diagnostics
}

#[derive(Default)]
struct Validator {
    diagnostics: Vec<Diagnostic>,
}

impl Validator {
    fn error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn block(&mut self, block: &Block, value: &Value, path: &str) {
        let fields = match value {
            Value::Object(fields) => fields,
            Value::Null => return,
            other => {
                self.error(
                    Diagnostic::error("Expected object")
                        .with_detail(format!("Got {}", json_type_name(other)))
                        .with_attribute_if_not_empty(path),
                );
                return;
            }
        };

        for (name, attr) in &block.attributes {
            self.attribute(attr, fields.get(name), &join_path(path, name));
        }
        for (name, nested) in &block.blocks {
            self.nested_block(nested, fields.get(name), &join_path(path, name));
        }
    }

    fn attribute(&mut self, attr: &Attribute, value: Option<&Value>, path: &str) {
        if !attr.presence.is_configurable() {
            return;
        }

        let Some(value) = value.filter(|v| !v.is_null()) else {
            if attr.presence == Presence::Required {
                self.error(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
            return;
        };

        let before = self.diagnostics.len();
        self.value(&attr.attr_type, value, path);
        if self.diagnostics.len() > before {
            return;
        }

        if let Some(s) = value.as_str() {
            for rule in &attr.rules {
                if let Err(message) = rule.check(path, s) {
                    self.error(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(message)
                            .with_attribute(path),
                    );
                }
            }
        }
    }

    fn value(&mut self, attr_type: &AttributeType, value: &Value, path: &str) {
        match (attr_type, value) {
            (AttributeType::String, Value::String(_)) => {}
            (AttributeType::List(element) | AttributeType::Set(element), Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    self.value(element, item, &format!("{}.{}", path, i));
                }
            }
            (AttributeType::Object(fields), Value::Object(object)) => {
                self.object(fields, object, path);
            }
            (expected, got) => self.error(type_error(path, type_name(expected), got)),
        }
    }

    // Object members carry no presence; only the types of present members are checked.
    fn object(
        &mut self,
        fields: &std::collections::HashMap<String, AttributeType>,
        object: &Map<String, Value>,
        path: &str,
    ) {
        for (name, attr_type) in fields {
            if let Some(value) = object.get(name) {
                self.value(attr_type, value, &join_path(path, name));
            }
        }
    }

    fn nested_block(&mut self, nested: &NestedBlock, value: Option<&Value>, path: &str) {
        let items = match value {
            None | Some(Value::Null) => {
                if nested.min_items > 0 {
                    self.error(
                        Diagnostic::error(format!(
                            "Block '{}' requires at least {} item(s)",
                            path, nested.min_items
                        ))
                        .with_attribute(path),
                    );
                }
                return;
            }
            // A block limited to one element may arrive unwrapped.
            Some(single @ Value::Object(_)) if nested.max_items == 1 => {
                self.block(&nested.block, single, path);
                return;
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.error(
                    Diagnostic::error(format!("Expected list for block '{}'", path))
                        .with_detail(format!("Got {}", json_type_name(other)))
                        .with_attribute(path),
                );
                return;
            }
        };

        let count = items.len() as u32;
        if count < nested.min_items {
            self.error(
                Diagnostic::error(format!(
                    "Block '{}' requires at least {} item(s), got {}",
                    path, nested.min_items, count
                ))
                .with_attribute(path),
            );
        }
        if nested.max_items > 0 && count > nested.max_items {
            self.error(
                Diagnostic::error(format!(
                    "Block '{}' allows at most {} item(s), got {}",
                    path, nested.max_items, count
                ))
                .with_attribute(path),
            );
        }

        for (i, item) in items.iter().enumerate() {
            self.block(&nested.block, item, &format!("{}.{}", path, i));
        }
    }
}

fn type_name(attr_type: &AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::List(_) => "list",
        AttributeType::Set(_) => "set",
        AttributeType::Object(_) => "object",
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, json_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema, StringRule};
    use serde_json::json;

    fn properties_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "type",
                Attribute::required_string().with_rule(StringRule::NotEmpty),
            )
            .with_attribute("id", Attribute::computed_string())
            .with_block(
                "properties",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute("description", Attribute::optional_string()),
                )
                .with_min_items(1)
                .with_max_items(1),
            )
    }

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_rules_run_after_type_check() {
        let schema = Schema::v0().with_attribute(
            "target_env",
            Attribute::required_string().with_rule(StringRule::OneOf {
                values: vec!["CMS".into(), "OPSB".into(), "APM".into()],
                ignore_case: true,
            }),
        );

        assert!(validate(&schema, &json!({"target_env": "apm"})).is_empty());

        let diagnostics = validate(&schema, &json!({"target_env": "prod"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("expected target_env to be one of [CMS OPSB APM], got prod")
        );

        // A wrong type reports only the type error.
        let diagnostics = validate(&schema, &json!({"target_env": 7}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_list_of_strings() {
        let schema = Schema::v0().with_attribute(
            "names",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                Presence::Required,
            ),
        );

        assert!(validate(&schema, &json!({"names": ["a", "b"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"names": ["a", 2]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("names.1".to_string()));

        let diagnostics = validate(&schema, &json!({"names": "a"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_block_cardinality() {
        let schema = properties_schema();

        let ok = json!({"type": "node", "properties": [{"name": "web01"}]});
        assert!(validate(&schema, &ok).is_empty());

        let missing = json!({"type": "node"});
        let diagnostics = validate(&schema, &missing);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("properties".to_string()));

        let two = json!({
            "type": "node",
            "properties": [{"name": "a"}, {"name": "b"}]
        });
        let diagnostics = validate(&schema, &two);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 1"));
    }

    #[test]
    fn test_validate_single_block_unwrapped() {
        let schema = properties_schema();
        let value = json!({"type": "node", "properties": {"description": "x"}});

        let diagnostics = validate(&schema, &value);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("properties.name".to_string()));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = properties_schema();
        let value = json!({"type": "", "properties": [{"description": 3}]});

        let mut attributes: Vec<_> = validate(&schema, &value)
            .into_iter()
            .filter_map(|d| d.attribute)
            .collect();
        attributes.sort();
        assert_eq!(
            attributes,
            vec![
                "properties.0.description".to_string(),
                "properties.0.name".to_string(),
                "type".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_object_elements() {
        let schema = Schema::v0().with_attribute(
            "items",
            Attribute::new(
                AttributeType::set(AttributeType::object([
                    ("ucmdb_id", AttributeType::String),
                    ("name", AttributeType::String),
                ])),
                Presence::Optional,
            ),
        );

        assert!(validate(&schema, &json!({"items": [{"ucmdb_id": "1", "name": "a"}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"items": [{"ucmdb_id": 1}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("items.0.ucmdb_id".to_string()));
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        let diagnostics = validate(&schema, &json!("string"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
        assert!(diagnostics[0].attribute.is_none());
    }
}
