//! Schema types for the provider block, resources and data sources.
//!
//! A schema is used twice: [`crate::validation::validate`] checks incoming
//! configuration against it, and `GetSchema` sends it to the host.

use serde::Serialize;
use std::collections::HashMap;

/// Value type of an attribute. Serialized as JSON into the wire schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string.
    String,
    /// An ordered list of one element type.
    List(Box<AttributeType>),
    /// An unordered set of one element type.
    Set(Box<AttributeType>),
    /// An object with fixed attribute names.
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    /// `list(element)`.
    pub fn list(element: AttributeType) -> Self {
        Self::List(Box::new(element))
    }

    /// `set(element)`.
    pub fn set(element: AttributeType) -> Self {
        Self::Set(Box::new(element))
    }

    /// `object({name = type, ...})`.
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeType)>,
        K: Into<String>,
    {
        Self::Object(fields.into_iter().map(|(k, ty)| (k.into(), ty)).collect())
    }
}

/// Who sets an attribute: the user, the provider, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be set in configuration.
    Required,
    /// May be set in configuration.
    Optional,
    /// Set by the provider only.
    Computed,
    /// May be set in configuration; the provider fills it in otherwise.
    OptionalComputed,
}

impl Presence {
    /// Whether configuration values for the attribute are checked at all.
    pub fn is_configurable(self) -> bool {
        self != Presence::Computed
    }

    /// `(required, optional, computed)` as the wire protocol flags them.
    pub fn wire_flags(self) -> (bool, bool, bool) {
        match self {
            Presence::Required => (true, false, false),
            Presence::Optional => (false, true, false),
            Presence::Computed => (false, false, true),
            Presence::OptionalComputed => (false, true, true),
        }
    }
}

/// A constraint on a string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringRule {
    /// The value must not be empty.
    NotEmpty,
    /// The value must be one of `values`.
    OneOf {
        /// Accepted values.
        values: Vec<String>,
        /// Compare without regard to ASCII case.
        ignore_case: bool,
    },
}

impl StringRule {
    /// Check `value`, returning the violation message on failure.
    pub fn check(&self, path: &str, value: &str) -> Result<(), String> {
        match self {
            StringRule::NotEmpty if value.is_empty() => {
                Err(format!("expected \"{}\" to not be an empty string", path))
            }
            StringRule::NotEmpty => Ok(()),
            StringRule::OneOf {
                values,
                ignore_case,
            } => {
                let matched = values.iter().any(|candidate| {
                    candidate == value || (*ignore_case && candidate.eq_ignore_ascii_case(value))
                });
                if matched {
                    Ok(())
                } else {
                    Err(format!(
                        "expected {} to be one of [{}], got {}",
                        path,
                        values.join(" "),
                        value
                    ))
                }
            }
        }
    }
}

/// One attribute of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Value type.
    pub attr_type: AttributeType,
    /// Who sets it.
    pub presence: Presence,
    /// Shown in plans and docs.
    pub description: Option<String>,
    /// Checked against string values after the type check passes.
    pub rules: Vec<StringRule>,
}

impl Attribute {
    /// An attribute of any type.
    pub fn new(attr_type: AttributeType, presence: Presence) -> Self {
        Self {
            attr_type,
            presence,
            description: None,
            rules: Vec::new(),
        }
    }

    /// A required string.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, Presence::Required)
    }

    /// An optional string.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, Presence::Optional)
    }

    /// A string only the provider sets.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, Presence::Computed)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a string constraint.
    pub fn with_rule(mut self, rule: StringRule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Attributes and nested blocks at one level of a schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// Attributes by name.
    pub attributes: HashMap<String, Attribute>,
    /// Nested blocks by name.
    pub blocks: HashMap<String, NestedBlock>,
    /// Shown in plans and docs.
    pub description: Option<String>,
}

impl Block {
    /// An empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }
}

/// A repeated nested block. Every nested block here is an unordered set.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedBlock {
    /// Shape of each element.
    pub block: Block,
    /// Fewest elements accepted.
    pub min_items: u32,
    /// Most elements accepted; 0 means no limit.
    pub max_items: u32,
}

impl NestedBlock {
    /// A set of `block` elements with no count limits.
    pub fn set(block: Block) -> Self {
        Self {
            block,
            min_items: 0,
            max_items: 0,
        }
    }

    /// Require at least `min` elements.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Allow at most `max` elements.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// Schema of the provider block, a resource or a data source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// State version; all schemas here are at 0.
    pub version: u64,
    /// Root block.
    pub block: Block,
}

impl Schema {
    /// An empty schema at version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    /// Add a root attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a root nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// Describe the root block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }
}

/// Everything `GetSchema` reports.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderSchema {
    /// Provider block schema.
    pub provider: Schema,
    /// Resource schemas by type name.
    pub resources: HashMap<String, Schema>,
    /// Data source schemas by type name.
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// An empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider block schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Register a resource type.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Register a data source type.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// The operation failed.
    Error,
    /// The operation succeeded but something needs attention.
    Warning,
}

/// A message returned to the host alongside an operation's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// One-line summary.
    pub summary: String,
    /// Longer explanation.
    pub detail: Option<String>,
    /// Dotted path of the offending attribute.
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// An error.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, summary)
    }

    /// A warning.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, summary)
    }

    /// Attach a detail message.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach an attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Attach an attribute path unless it is the root (empty) path.
    pub fn with_attribute_if_not_empty(self, attribute: &str) -> Self {
        if attribute.is_empty() {
            self
        } else {
            self.with_attribute(attribute)
        }
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
