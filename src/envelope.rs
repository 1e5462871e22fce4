use crate::refiner::Refinement;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response produced by the upstream generator.
///
/// Only `content` is interpreted. Every other field passes through
/// untouched. `changed` and `applied_rules` are filled in by refinement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Kept as raw JSON so non-text content can be recognised and left alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_rules: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseEnvelope {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(Value::String(content.into())),
            ..Self::default()
        }
    }

    /// Add a passthrough field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Text content, or `None` when absent or not a string.
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(Value::as_str)
    }

    /// Copy of this envelope carrying a refinement's content and provenance.
    pub fn with_refinement(&self, refinement: &Refinement) -> Self {
        Self {
            content: Some(Value::String(refinement.content.clone())),
            changed: Some(refinement.changed),
            applied_rules: Some(refinement.applied_rules.clone()),
            extra: self.extra.clone(),
        }
    }
}
