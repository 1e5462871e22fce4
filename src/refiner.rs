//! The refinement pipeline.
//!
//! Categories run strictly in order: general, language detection on the
//! post-general text, language-specific, formatting, platform-specific, then
//! context-aware. Each stage consumes the previous stage's output.

use crate::apply::{apply_category, apply_context_aware, apply_language_specific};
use crate::config::RefinerConfig;
use crate::context::ContextItem;
use crate::detect::LanguageDetector;
use crate::envelope::ResponseEnvelope;
use crate::rules::{Category, Registry};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Result of refining a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refinement {
    pub content: String,
    /// Whether the final content differs from the input.
    pub changed: bool,
    /// Descriptions of rules that changed the text, in application order.
    pub applied_rules: Vec<String>,
    /// Languages detected after the general stage.
    pub languages: Vec<String>,
}

/// Pipeline-level failure. [`Refiner::refine`] never surfaces these; they
/// are logged and the original envelope is returned.
#[derive(Error, Debug)]
pub enum RefineError {
    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    #[error("malformed context items: {0}")]
    MalformedContext(#[source] serde_json::Error),

    #[error("refinement pipeline panicked: {message}")]
    Panicked { message: String },
}

/// Applies the rule registry to responses.
///
/// Cheap to clone and safe to share: the registry is immutable and the
/// detector is only read.
#[derive(Debug, Clone)]
pub struct Refiner {
    registry: Arc<Registry>,
    detector: LanguageDetector,
    enabled: bool,
}

impl Default for Refiner {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Refiner {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            detector: LanguageDetector::new(),
            enabled: true,
        }
    }

    /// Refiner over the built-in rule table.
    pub fn builtin() -> Self {
        Self::new(Arc::new(Registry::builtin()))
    }

    pub fn from_config(config: &RefinerConfig) -> Self {
        Self {
            enabled: config.refiner.enabled,
            ..Self::new(Arc::new(Registry::from_config(config)))
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn detector(&self) -> &LanguageDetector {
        &self.detector
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run every category over `content`.
    pub fn refine_text(&self, content: &str, context: &[ContextItem]) -> Refinement {
        let registry = self.registry.as_ref();
        let mut applied_rules = Vec::new();

        let general = apply_category(
            Category::General,
            content,
            registry.lookup(Category::General),
        );
        applied_rules.extend(general.applied);

        let languages = self.detector.detect(&general.content);
        debug!(languages = ?languages, "detected languages");

        let language = apply_language_specific(registry, &general.content, &languages);
        applied_rules.extend(language.applied);

        let formatting = apply_category(
            Category::Formatting,
            &language.content,
            registry.lookup(Category::Formatting),
        );
        applied_rules.extend(formatting.applied);

        let platform = apply_category(
            Category::PlatformSpecific,
            &formatting.content,
            registry.lookup(Category::PlatformSpecific),
        );
        applied_rules.extend(platform.applied);

        let contextual = apply_context_aware(
            &platform.content,
            registry.lookup(Category::ContextAware),
            context,
        );
        applied_rules.extend(contextual.applied);

        let changed = contextual.content != content;
        if changed {
            info!(rules = applied_rules.len(), "refined response");
        } else {
            info!("response unchanged by refinement");
        }

        Refinement {
            content: contextual.content,
            changed,
            applied_rules,
            languages,
        }
    }

    /// Refine an envelope, reporting pipeline-level failures.
    ///
    /// Envelopes without non-empty text content, and any envelope when the
    /// refiner is disabled, come back unchanged.
    pub fn try_refine(
        &self,
        envelope: &ResponseEnvelope,
        context: &[ContextItem],
    ) -> Result<ResponseEnvelope, RefineError> {
        let Some(content) = envelope.text().filter(|text| !text.is_empty()) else {
            debug!("response has no text content; skipping refinement");
            return Ok(envelope.clone());
        };
        if !self.enabled {
            debug!("refinement disabled");
            return Ok(envelope.clone());
        }

        let refinement = panic::catch_unwind(AssertUnwindSafe(|| {
            self.refine_text(content, context)
        }))
        .map_err(|payload| RefineError::Panicked {
            message: panic_message(payload.as_ref()),
        })?;

        Ok(envelope.with_refinement(&refinement))
    }

    /// Refine an envelope. Never fails: on a pipeline-level failure the
    /// original envelope is returned and the failure is logged.
    pub fn refine(&self, envelope: &ResponseEnvelope, context: &[ContextItem]) -> ResponseEnvelope {
        match self.try_refine(envelope, context) {
            Ok(refined) => refined,
            Err(err) => {
                error!(error = %err, "refinement failed; returning original response");
                envelope.clone()
            }
        }
    }

    /// Refine raw JSON. A malformed envelope or context yields the input
    /// envelope unchanged. A `null` context means no context items.
    pub fn refine_value(&self, envelope: &Value, context: &Value) -> Value {
        match self.try_refine_value(envelope, context) {
            Ok(refined) => refined,
            Err(err) => {
                error!(error = %err, "refinement failed; returning original response");
                envelope.clone()
            }
        }
    }

    fn try_refine_value(&self, envelope: &Value, context: &Value) -> Result<Value, RefineError> {
        let parsed: ResponseEnvelope =
            serde_json::from_value(envelope.clone()).map_err(RefineError::MalformedEnvelope)?;
        let items: Vec<ContextItem> = if context.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(context.clone()).map_err(RefineError::MalformedContext)?
        };

        let refined = self.try_refine(&parsed, &items)?;
        if refined == parsed {
            return Ok(envelope.clone());
        }
        serde_json::to_value(refined).map_err(RefineError::MalformedEnvelope)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
