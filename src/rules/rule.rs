use crate::context::ContextItem;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a rule could not run. Each failure stays local to its rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("replacement references unknown capture group '{group}'")]
    UnknownGroup { group: String },

    #[error("capture group {index} did not participate in the match")]
    MissingCapture { index: usize },

    #[error("replacement function failed: {message}")]
    Compute { message: String },
}

/// Replacement callback. Receives the match and the caller's context items.
/// Categories without context pass an empty slice.
pub type ComputeFn =
    Arc<dyn Fn(&Captures<'_>, &[ContextItem]) -> Result<String, RuleError> + Send + Sync>;

/// How matched text is rewritten.
#[derive(Clone)]
pub enum Replacement {
    /// Template with `$1`, `${1}` or `${name}` back-references.
    Literal(String),
    /// Called once per match.
    Computed(ComputeFn),
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Literal(template) => f.debug_tuple("Literal").field(template).finish(),
            Replacement::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

/// A pattern, its replacement, and the description recorded as provenance.
///
/// The pattern is compiled on construction. A compile failure is kept and
/// returned from every [`Rule::apply`] call instead of being raised early, so
/// a broken rule degrades to a logged no-op.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    compiled: Result<Regex, RuleError>,
    replacement: Replacement,
    description: String,
}

impl Rule {
    pub fn new(
        pattern: impl Into<String>,
        replacement: Replacement,
        description: impl Into<String>,
    ) -> Self {
        let pattern = pattern.into();
        let compiled = compile(&pattern, &replacement);
        Self {
            pattern,
            compiled,
            replacement,
            description: description.into(),
        }
    }

    /// Rule with a literal template replacement.
    pub fn literal(
        pattern: impl Into<String>,
        template: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(pattern, Replacement::Literal(template.into()), description)
    }

    /// Rule whose replacement is computed per match.
    pub fn computed<F>(pattern: impl Into<String>, compute: F, description: impl Into<String>) -> Self
    where
        F: Fn(&Captures<'_>, &[ContextItem]) -> Result<String, RuleError> + Send + Sync + 'static,
    {
        Self::new(pattern, Replacement::Computed(Arc::new(compute)), description)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.replacement, Replacement::Computed(_))
    }

    /// The stored compile failure, if the rule can never run.
    pub fn compile_error(&self) -> Option<&RuleError> {
        self.compiled.as_ref().err()
    }

    /// Substitute every non-overlapping match in `content`.
    ///
    /// Returns the rewritten text, which may equal the input. Any error leaves
    /// the caller's content untouched because nothing is written back until
    /// every match has been replaced.
    pub fn apply(&self, content: &str, context: &[ContextItem]) -> Result<String, RuleError> {
        let regex = self.compiled.as_ref().map_err(Clone::clone)?;

        let mut out = String::with_capacity(content.len());
        let mut last = 0;
        for caps in regex.captures_iter(content) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&content[last..whole.start()]);
            match &self.replacement {
                Replacement::Literal(template) => caps.expand(template, &mut out),
                Replacement::Computed(compute) => out.push_str(&compute(&caps, context)?),
            }
            last = whole.end();
        }
        out.push_str(&content[last..]);
        Ok(out)
    }
}

/// Fetch a capture group that must have participated in the match.
pub fn group<'t>(caps: &Captures<'t>, index: usize) -> Result<&'t str, RuleError> {
    caps.get(index)
        .map(|m| m.as_str())
        .ok_or(RuleError::MissingCapture { index })
}

/// Fetch an optional capture group, empty when it did not participate.
pub fn optional_group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn compile(pattern: &str, replacement: &Replacement) -> Result<Regex, RuleError> {
    let regex = Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    if let Replacement::Literal(template) = replacement {
        check_template(template, &regex)?;
    }
    Ok(regex)
}

/// Reject templates naming groups the pattern does not define.
///
/// Follows `Captures::expand` syntax: `$$` is a literal dollar, `${name}` is
/// braced, and `$name` takes the longest run of `[_0-9A-Za-z]`.
fn check_template(template: &str, regex: &Regex) -> Result<(), RuleError> {
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let rest = &template[i + 1..];
        if rest.starts_with('$') {
            i += 2;
            continue;
        }
        let (name, consumed) = if let Some(braced) = rest.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => {
                    i += 1;
                    continue;
                }
            }
        } else {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            (&rest[..end], end)
        };
        if name.is_empty() {
            i += 1;
            continue;
        }
        let known = match name.parse::<usize>() {
            Ok(index) => index < regex.captures_len(),
            Err(_) => regex.capture_names().flatten().any(|n| n == name),
        };
        if !known {
            return Err(RuleError::UnknownGroup {
                group: name.to_string(),
            });
        }
        i += 1 + consumed;
    }
    Ok(())
}
