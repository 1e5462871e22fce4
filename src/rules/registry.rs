use crate::config::RefinerConfig;
use crate::detect::{canonical_language, LanguageDetector};
use crate::rules::{builtin, Category, Rule};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Immutable rule table, keyed by category (and by language for
/// language-specific rules).
///
/// Built once through [`RegistryBuilder`] and read-only afterwards, so one
/// instance can be shared across threads behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    categories: HashMap<Category, Vec<Rule>>,
    languages: HashMap<String, Vec<Rule>>,
    disabled: BTreeSet<Category>,
}

impl Registry {
    /// The built-in rule table.
    pub fn builtin() -> Self {
        RegistryBuilder::with_builtin().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry described by a rule configuration file.
    pub fn from_config(config: &RefinerConfig) -> Self {
        let mut builder = if config.refiner.builtin_rules {
            RegistryBuilder::with_builtin()
        } else {
            RegistryBuilder::new()
        };

        for category in &config.refiner.disabled_categories {
            builder = builder.disable(*category);
        }

        for definition in &config.rules {
            let rule = definition.to_rule();
            builder = match (definition.category, definition.language.as_deref()) {
                (Category::LanguageSpecific, Some(language)) => {
                    builder.language_rule(language, rule)
                }
                (category, _) => builder.rule(category, rule),
            };
        }

        builder.build()
    }

    /// Rules for `category`, empty when the category is absent or disabled.
    ///
    /// Language-specific rules are keyed by language; use
    /// [`Registry::lookup_language`] for them.
    pub fn lookup(&self, category: Category) -> &[Rule] {
        if self.is_disabled(category) {
            return &[];
        }
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Language-specific rules for a canonical language identifier.
    pub fn lookup_language(&self, language: &str) -> &[Rule] {
        if self.is_disabled(Category::LanguageSpecific) {
            return &[];
        }
        self.languages
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_disabled(&self, category: Category) -> bool {
        self.disabled.contains(&category)
    }

    /// Languages with registered rules, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Total registered rules, disabled categories included.
    pub fn rule_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum::<usize>()
            + self.languages.values().map(Vec::len).sum::<usize>()
    }
}

/// Assembles a [`Registry`]. Rules keep the order they are added in.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded with the built-in table.
    pub fn with_builtin() -> Self {
        let detector = Arc::new(LanguageDetector::new());
        let mut builder = Self::new()
            .rules(Category::General, builtin::general(detector))
            .rules(Category::Formatting, builtin::formatting())
            .rules(Category::PlatformSpecific, builtin::platform_specific())
            .rules(Category::ContextAware, builtin::context_aware());
        for (language, rules) in builtin::language_specific() {
            for rule in rules {
                builder = builder.language_rule(language, rule);
            }
        }
        builder
    }

    /// Append a rule to a category.
    ///
    /// Language-specific rules need a language key and are ignored here;
    /// add them with [`RegistryBuilder::language_rule`].
    pub fn rule(mut self, category: Category, rule: Rule) -> Self {
        if category == Category::LanguageSpecific {
            tracing::warn!(
                rule = rule.description(),
                "language-specific rule registered without a language; ignoring"
            );
            return self;
        }
        self.registry
            .categories
            .entry(category)
            .or_default()
            .push(rule);
        self
    }

    pub fn rules(self, category: Category, rules: impl IntoIterator<Item = Rule>) -> Self {
        rules
            .into_iter()
            .fold(self, |builder, rule| builder.rule(category, rule))
    }

    /// Append a rule for a language. Aliases such as `py` are normalized.
    pub fn language_rule(mut self, language: &str, rule: Rule) -> Self {
        let key = canonical_language(language)
            .map(str::to_string)
            .unwrap_or_else(|| language.trim().to_ascii_lowercase());
        self.registry.languages.entry(key).or_default().push(rule);
        self
    }

    /// Skip a category entirely.
    pub fn disable(mut self, category: Category) -> Self {
        self.registry.disabled.insert(category);
        self
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}
