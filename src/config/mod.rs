//! Rule files: schema, validation and loading.

pub mod loader;
pub mod schema;

pub use loader::{load_all, load_from_path, load_from_str, ConfigError};
pub use schema::{
    Metadata, RefinerConfig, RefinerSettings, RuleDefinition, ValidationError, ValidationIssue,
};
