//! Values exchanged with the host that are not part of a schema.

use serde_json::Value;

use crate::schema::ProviderSchema;

/// Protocol version announced in the handshake line.
pub const PROTOCOL_VERSION: u32 = 1;

/// First field of the handshake line the host reads from stdout.
pub const HANDSHAKE_PREFIX: &str = "HEMMER_PROVIDER";

/// One attribute's change in a plan. `None` on a side means absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    /// Attribute path.
    pub path: String,
    /// Value before; `None` when the attribute is being added.
    pub before: Option<Value>,
    /// Value after; `None` when the attribute is being removed.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// `path` appears with `value`.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// `path` goes away; `value` is what it held.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// `path` changes from `before` to `after`.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        // Absent sides travel as empty bytes.
        let bytes = |side: Option<Value>| match side {
            Some(v) => serde_json::to_vec(&v).unwrap_or_default(),
            None => Vec::new(),
        };
        Self {
            path: change.path,
            before: bytes(change.before),
            after: bytes(change.after),
        }
    }
}

/// Outcome of planning one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    /// State the apply step will receive; `Null` for a destroy.
    pub planned_state: Value,
    /// What changes, attribute by attribute.
    pub changes: Vec<AttributeChange>,
    /// Always false here: every change is applied in place.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Nothing to do; `state` is carried over.
    pub fn no_change(state: Value) -> Self {
        Self::with_changes(state, Vec::new())
    }

    /// An in-place change to `planned_state`.
    pub fn with_changes(planned_state: Value, changes: Vec<AttributeChange>) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace: false,
        }
    }
}

/// State produced by an import, to be completed by a read.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedResource {
    /// Resource type name.
    pub resource_type: String,
    /// Initial state.
    pub state: Value,
}

impl ImportedResource {
    /// An imported `resource_type` with initial `state`.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// What `GetMetadata` reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderMetadata {
    /// Resource type names, sorted.
    pub resources: Vec<String>,
    /// Data source type names, sorted.
    pub data_sources: Vec<String>,
    /// Whether `plan` accepts a null proposal to plan a destroy.
    pub plan_destroy: bool,
}

impl ProviderMetadata {
    /// Type names taken from `schema`, without capabilities.
    pub fn from_schema(schema: &ProviderSchema) -> Self {
        let sorted = |names: Vec<&String>| {
            let mut names: Vec<String> = names.into_iter().cloned().collect();
            names.sort();
            names
        };
        Self {
            resources: sorted(schema.resources.keys().collect()),
            data_sources: sorted(schema.data_sources.keys().collect()),
            plan_destroy: false,
        }
    }
}
