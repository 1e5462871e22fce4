//! Rewrite rules and the registry that groups them by category.
//!
//! A [`Rule`] pairs a compiled pattern with a [`Replacement`]. Rules live in a
//! [`Registry`], which is built once and then only read. The pipeline walks
//! the categories in [`Category::ORDER`].

pub mod builtin;
pub mod registry;
pub mod rule;

pub use registry::{Registry, RegistryBuilder};
pub use rule::{group, optional_group, ComputeFn, Replacement, Rule, RuleError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule grouping. Categories run in the order they are declared here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    General,
    LanguageSpecific,
    Formatting,
    PlatformSpecific,
    ContextAware,
}

impl Category {
    /// Pipeline order.
    pub const ORDER: [Category; 5] = [
        Category::General,
        Category::LanguageSpecific,
        Category::Formatting,
        Category::PlatformSpecific,
        Category::ContextAware,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::LanguageSpecific => "language_specific",
            Category::Formatting => "formatting",
            Category::PlatformSpecific => "platform_specific",
            Category::ContextAware => "context_aware",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
