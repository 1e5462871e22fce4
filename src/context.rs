//! Context items and placeholder resolution.
//!
//! Context items describe surrounding code (functions, classes, files)
//! supplied by the host. Earlier items are more relevant. The resolvers here
//! back the context-aware rules.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder identifiers the context-aware stage rewrites.
pub const PLACEHOLDER_WORDS: [&str; 4] = ["myFunction", "doSomething", "process", "handler"];

/// A piece of surrounding code. Unknown fields pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Semantic classification, e.g. `"function"`, `"class"`, `"file"`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContextItem {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Whether this item names code that can stand in for a placeholder.
    pub fn is_code_symbol(&self) -> bool {
        matches!(self.kind.as_str(), "function" | "class")
    }

    /// Identifier for the item: its name, or the file stem of its path.
    pub fn identifier(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.path.as_deref().and_then(file_stem))
    }

    /// Last segment of the item's path.
    pub fn short_name(&self) -> Option<&str> {
        self.path.as_deref().and_then(last_segment)
    }
}

/// Prefix joined to a context identifier when replacing `word`.
pub fn semantic_prefix(word: &str) -> &'static str {
    match word {
        "myFunction" => "process",
        "doSomething" => "handle",
        "process" => "transform",
        "handler" => "handle",
        _ => "process",
    }
}

/// Replacement used for `word` when no context item applies.
pub fn fallback_identifier(word: &str) -> Option<&'static str> {
    match word {
        "myFunction" => Some("processData"),
        "doSomething" => Some("handleRequest"),
        "process" => Some("processInput"),
        "handler" => Some("handleEvent"),
        _ => None,
    }
}

/// Replace a generic identifier with one derived from context.
///
/// Uses the first function or class item that yields an identifier. Without
/// one, falls back to a fixed improvement map; unmapped words are returned
/// as-is.
pub fn resolve_identifier(generic: &str, items: &[ContextItem]) -> String {
    if generic.is_empty() {
        return String::new();
    }

    let from_context = items
        .iter()
        .filter(|item| item.is_code_symbol())
        .find_map(ContextItem::identifier);

    match from_context {
        Some(identifier) => format!("{}{}", semantic_prefix(generic), identifier),
        None => fallback_identifier(generic).unwrap_or(generic).to_string(),
    }
}

/// Replace "in the codebase" / "in your project" with a named reference.
///
/// Only the first item is consulted. Without a usable path the phrase is
/// returned unchanged.
pub fn resolve_reference(phrase: &str, items: &[ContextItem]) -> String {
    let Some(name) = items.first().and_then(ContextItem::short_name) else {
        return phrase.to_string();
    };

    if phrase.contains("codebase") {
        format!("in the {name} codebase")
    } else {
        format!("in your {name} project")
    }
}

const SEPARATORS: &[char] = &['/', '\\'];

fn last_segment(path: &str) -> Option<&str> {
    path.trim_end_matches(SEPARATORS)
        .rsplit(SEPARATORS)
        .next()
        .filter(|segment| !segment.is_empty())
}

fn file_stem(path: &str) -> Option<&str> {
    let segment = last_segment(path)?;
    match segment.rfind('.') {
        Some(dot) if dot > 0 => Some(&segment[..dot]),
        _ => Some(segment),
    }
}
