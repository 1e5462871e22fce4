//! Response Refiner: rule-based post-processing for generated responses
//!
//! A fixed pipeline of pattern rules rewrites the text of a response
//! envelope and records which rules changed it. Rules are grouped by
//! category and run in a fixed order:
//!
//! 1. general
//! 2. language-specific, for languages detected after the general stage
//! 3. formatting
//! 4. platform-specific
//! 5. context-aware, using caller-supplied context items
//!
//! # Failure model
//!
//! A failing rule is logged and skipped. A failing pipeline returns the
//! original envelope. [`Refiner::refine`] never returns an error.
//!
//! # Example
//!
//! ```
//! use response_refiner::{Refiner, ResponseEnvelope};
//!
//! let refiner = Refiner::builtin();
//! let refined = refiner.refine(&ResponseEnvelope::new("I think the function works"), &[]);
//!
//! assert_eq!(refined.text(), Some("the function works"));
//! assert_eq!(refined.changed, Some(true));
//! ```

pub mod apply;
pub mod config;
pub mod context;
pub mod detect;
pub mod envelope;
pub mod refiner;
pub mod rules;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, RefinerConfig};
pub use context::ContextItem;
pub use detect::LanguageDetector;
pub use envelope::ResponseEnvelope;
pub use refiner::{RefineError, Refinement, Refiner};
pub use rules::{Category, Registry, RegistryBuilder, Replacement, Rule, RuleError};
