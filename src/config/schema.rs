use crate::detect::{canonical_language, known_language_names};
use crate::rules::{Category, Rule};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RefinerConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub refiner: RefinerSettings,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RefinerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (index, rule) in self.rules.iter().enumerate() {
            let label = rule.label(index);

            if rule.description.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule: label.clone(),
                    field: "description",
                });
            }
            if rule.pattern.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule: label.clone(),
                    field: "pattern",
                });
            }

            match (rule.category, rule.language.as_deref()) {
                (Category::LanguageSpecific, None) => {
                    issues.push(ValidationIssue::MissingField {
                        rule: label.clone(),
                        field: "language",
                    });
                }
                (Category::LanguageSpecific, Some(language)) => {
                    if canonical_language(language).is_none() {
                        issues.push(ValidationIssue::UnknownLanguage {
                            rule: label.clone(),
                            language: language.to_string(),
                            suggestion: suggest_language(language),
                        });
                    }
                }
                (category, Some(_)) => {
                    issues.push(ValidationIssue::InvalidCombo {
                        rule: label.clone(),
                        message: format!("`language` is only valid for language_specific rules, not {category}"),
                    });
                }
                (_, None) => {}
            }

            if rule.category == Category::ContextAware {
                issues.push(ValidationIssue::InvalidCombo {
                    rule: label.clone(),
                    message: "context_aware rules need computed replacements and cannot be declared in a rule file"
                        .to_string(),
                });
            }

            let language = rule
                .language
                .as_deref()
                .map(|language| canonical_language(language).unwrap_or(language).to_string());
            let key = (rule.category, language, rule.description.trim().to_string());
            if !rule.description.trim().is_empty() && !seen.insert(key) {
                issues.push(ValidationIssue::Duplicate {
                    rule: label,
                    category: rule.category,
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Fold another rule file into this one. Rules are appended in order,
    /// disabled categories are unioned, and the switches must both be on.
    pub fn merge(&mut self, other: RefinerConfig) {
        self.refiner.enabled &= other.refiner.enabled;
        self.refiner.builtin_rules &= other.refiner.builtin_rules;
        for category in other.refiner.disabled_categories {
            if !self.refiner.disabled_categories.contains(&category) {
                self.refiner.disabled_categories.push(category);
            }
        }
        self.rules.extend(other.rules);
        if self.meta.name.is_empty() {
            self.meta = other.meta;
        }
    }
}

fn suggest_language(language: &str) -> Option<&'static str> {
    let language = language.trim().to_ascii_lowercase();
    known_language_names()
        .map(|known| (known, strsim::jaro_winkler(&language, known)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(known, _)| canonical_language(known).unwrap_or(known))
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefinerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Start from the built-in table. When false only file rules are used.
    #[serde(default = "default_true")]
    pub builtin_rules: bool,
    #[serde(default)]
    pub disabled_categories: Vec<Category>,
}

impl Default for RefinerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            builtin_rules: true,
            disabled_categories: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A literal rule declared in a rule file.
#[derive(Debug, Deserialize, Clone)]
pub struct RuleDefinition {
    pub category: Category,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

impl RuleDefinition {
    pub fn to_rule(&self) -> Rule {
        Rule::literal(
            self.pattern.clone(),
            self.replacement.clone(),
            self.description.trim(),
        )
    }

    fn label(&self, index: usize) -> String {
        let description = self.description.trim();
        if description.is_empty() {
            format!("#{}", index + 1)
        } else {
            description.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    MissingField {
        rule: String,
        field: &'static str,
    },
    InvalidCombo {
        rule: String,
        message: String,
    },
    UnknownLanguage {
        rule: String,
        language: String,
        suggestion: Option<&'static str>,
    },
    Duplicate {
        rule: String,
        category: Category,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { rule, field } => {
                write!(f, "rule '{rule}' missing required field '{field}'")
            }
            ValidationIssue::InvalidCombo { rule, message } => {
                write!(f, "rule '{rule}' has invalid configuration: {message}")
            }
            ValidationIssue::UnknownLanguage {
                rule,
                language,
                suggestion,
            } => match suggestion {
                Some(suggestion) => write!(
                    f,
                    "rule '{rule}' names unknown language '{language}' (did you mean '{suggestion}'?)"
                ),
                None => write!(f, "rule '{rule}' names unknown language '{language}'"),
            },
            ValidationIssue::Duplicate { rule, category } => {
                write!(f, "rule '{rule}' is declared more than once in {category}")
            }
        }
    }
}
