//! Programming-language detection for response text.
//!
//! Detection has two tiers. Fenced code block hints win outright: if any
//! fence carries a hint token, only those hints are consulted, even when none
//! of them maps to a known language. Structural signatures are only sniffed
//! when the text has no hinted fence at all.

use regex::Regex;

/// Canonical identifiers a detected language is reported under.
pub const CANONICAL_LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "java",
    "csharp",
    "go",
    "rust",
    "cpp",
    "c",
    "php",
    "ruby",
    "bash",
];

const ALIASES: &[(&str, &str)] = &[
    ("py", "python"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("cs", "csharp"),
    ("cpp", "cpp"),
    ("c++", "cpp"),
    ("rb", "ruby"),
    ("sh", "bash"),
    ("shell", "bash"),
];

const FENCE_PATTERN: &str = r"```([^\s`]*)";

/// Structural signatures, sniffed in this order.
const SIGNATURES: &[(&str, &str)] = &[
    ("python", r"def\s+\w+\s*\(.*\):"),
    ("javascript", r"function\s+\w+\s*\(.*\)\s*\{"),
    ("java", r"public\s+class\s+\w+"),
    ("go", r"package\s+main|func\s+\w+\s*\(.*\)\s*\{"),
    ("csharp", r"namespace\s+\w+|public\s+class\s+\w+\s*:"),
];

/// Normalize a fence hint to a canonical language identifier.
pub fn canonical_language(hint: &str) -> Option<&'static str> {
    let hint = hint.trim().to_ascii_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == hint)
        .map(|(_, canonical)| *canonical)
        .or_else(|| CANONICAL_LANGUAGES.iter().copied().find(|c| *c == hint))
}

/// Every alias and canonical identifier accepted as a language name.
pub fn known_language_names() -> impl Iterator<Item = &'static str> {
    ALIASES
        .iter()
        .map(|(alias, _)| *alias)
        .chain(CANONICAL_LANGUAGES.iter().copied())
}

/// Compiled detector. Build once and share; detection takes `&self`.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    fence: Regex,
    signatures: Vec<(&'static str, Regex)>,
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector {
    pub fn new() -> Self {
        let fence = Regex::new(FENCE_PATTERN).expect("fence pattern is valid");
        let signatures = SIGNATURES
            .iter()
            .map(|(language, pattern)| {
                (
                    *language,
                    Regex::new(pattern).expect("signature patterns are valid"),
                )
            })
            .collect();
        Self { fence, signatures }
    }

    /// Non-empty hint tokens following fence markers, in text order.
    pub fn fence_hints<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.fence
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|hint| !hint.is_empty())
            .collect()
    }

    /// Detect languages in `text`, deduplicated in first-detection order.
    pub fn detect(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let hints = self.fence_hints(text);

        if !hints.is_empty() {
            for hint in hints {
                if let Some(language) = canonical_language(hint) {
                    push_unique(&mut found, language);
                }
            }
            return found;
        }

        for (language, signature) in &self.signatures {
            if signature.is_match(text) {
                push_unique(&mut found, language);
            }
        }
        found
    }

    /// First structural signature matching `text`, ignoring fences.
    pub fn sniff(&self, text: &str) -> Option<&'static str> {
        self.signatures
            .iter()
            .find(|(_, signature)| signature.is_match(text))
            .map(|(language, _)| *language)
    }
}

fn push_unique(found: &mut Vec<String>, language: &str) {
    if !found.iter().any(|l| l == language) {
        found.push(language.to_string());
    }
}
