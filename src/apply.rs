//! Category appliers.
//!
//! Every category runs the same fold: each rule sees the previous rule's
//! output, a rule is recorded only when it changed the text, and a failing
//! rule is logged and skipped without touching the content.

use crate::context::ContextItem;
use crate::rules::{Category, Registry, Rule};
use tracing::{debug, warn};

/// Content after a stage plus the provenance it produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutcome {
    pub content: String,
    pub applied: Vec<String>,
}

impl StageOutcome {
    fn unchanged(content: &str) -> Self {
        Self {
            content: content.to_string(),
            applied: Vec::new(),
        }
    }

    fn absorb(&mut self, next: StageOutcome) {
        self.content = next.content;
        self.applied.extend(next.applied);
    }
}

/// Apply a general, formatting or platform-specific rule set. Computed
/// replacements receive no context.
pub fn apply_category(category: Category, content: &str, rules: &[Rule]) -> StageOutcome {
    fold_rules(category, content, rules, &[], None)
}

/// Apply language-specific rules for each detected language in order.
///
/// Languages without registered rules contribute nothing. Provenance is
/// tagged `"{language}: {description}"`.
pub fn apply_language_specific(
    registry: &Registry,
    content: &str,
    languages: &[String],
) -> StageOutcome {
    let mut outcome = StageOutcome::unchanged(content);
    for language in languages {
        let rules = registry.lookup_language(language);
        if rules.is_empty() {
            continue;
        }
        let next = fold_rules(
            Category::LanguageSpecific,
            &outcome.content,
            rules,
            &[],
            Some(language),
        );
        outcome.absorb(next);
    }
    outcome
}

/// Apply context-aware rules with the caller's context items.
pub fn apply_context_aware(content: &str, rules: &[Rule], context: &[ContextItem]) -> StageOutcome {
    fold_rules(Category::ContextAware, content, rules, context, None)
}

fn fold_rules(
    category: Category,
    content: &str,
    rules: &[Rule],
    context: &[ContextItem],
    language: Option<&str>,
) -> StageOutcome {
    let mut outcome = StageOutcome::unchanged(content);

    for rule in rules {
        match rule.apply(&outcome.content, context) {
            Ok(next) if next != outcome.content => {
                let tag = match language {
                    Some(language) => format!("{language}: {}", rule.description()),
                    None => rule.description().to_string(),
                };
                debug!(category = %category, rule = %tag, "rule applied");
                outcome.content = next;
                outcome.applied.push(tag);
            }
            Ok(_) => {}
            Err(error) => {
                warn!(
                    category = %category,
                    rule = rule.description(),
                    language = language.unwrap_or_default(),
                    error = %error,
                    "rule failed; skipping"
                );
            }
        }
    }

    outcome
}
