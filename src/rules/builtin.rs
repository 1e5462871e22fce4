//! The built-in rule table.
//!
//! Patterns avoid lookaround and back-references, which the `regex` crate
//! does not support. Where a rule needs to look at its surroundings, the
//! neighbourhood is captured and a computed replacement decides whether to
//! rewrite or return the match unchanged. An unchanged match is not recorded
//! as applied.

use crate::context::{resolve_identifier, resolve_reference, PLACEHOLDER_WORDS};
use crate::detect::LanguageDetector;
use crate::rules::rule::{group, optional_group, Rule, RuleError};
use regex::Captures;
use std::sync::Arc;

/// A fenced block: hint (1) and body (2). The body never contains a fence,
/// so consecutive matches stay aligned on block boundaries.
const FENCED_BLOCK: &str = r"```([^\n`]*)\n((?:[^`]|`[^`]|``[^`])*?)```";

/// A fenced block plus what follows the closing fence: trailing blanks (3),
/// newlines (4) and the first character of the next line (5).
const FENCED_BLOCK_WITH_TRAILER: &str =
    r"```([^\n`]*)\n((?:[^`]|`[^`]|``[^`])*?)```([ \t]*)(\n*)([^\n`]?)";

const NO_SEMICOLON_AFTER: &[char] = &[
    ';', '{', '}', '[', '(', ',', ':', '+', '-', '*', '/', '=', '>', '<', '&', '|', '?', '.',
    '\\',
];

const JS_BLOCK_KEYWORDS: &[&str] = &[
    "if ", "if(", "for ", "for(", "while ", "while(", "else", "switch", "try", "catch",
    "finally", "do ", "function ", "class ",
];

pub fn general(detector: Arc<LanguageDetector>) -> Vec<Rule> {
    vec![
        Rule::literal(
            r"(^|\s)(?:I think|I believe|Maybe|Perhaps|Probably)\s+",
            "${1}",
            "Remove uncertainty phrases",
        ),
        Rule::computed(
            FENCED_BLOCK,
            move |caps, _| label_code_block(caps, &detector),
            "Add language to code blocks",
        ),
        Rule::literal(
            r"(?m)^(#{1,6})([A-Z0-9])",
            "${1} ${2}",
            "Add space after heading markers",
        ),
        Rule::literal(r"\bvs\.?\s", "vs. ", "Standardize vs. abbreviation"),
        Rule::literal(
            r#"(\w)"(\w)"#,
            "${1}'${2}",
            "Replace double quotes with single quotes for contractions",
        ),
    ]
}

pub fn language_specific() -> Vec<(&'static str, Vec<Rule>)> {
    vec![
        ("python", python()),
        ("javascript", javascript()),
        ("java", java()),
        ("csharp", csharp()),
        ("go", go()),
    ]
}

fn python() -> Vec<Rule> {
    vec![
        Rule::literal(
            r"\bimport\s+([A-Za-z0-9_]+)\.([A-Za-z0-9_]+)",
            "from ${1} import ${2}",
            "Convert import x.y to from x import y",
        ),
        Rule::literal(
            r#"(def\s+\w+\(.*\):)[ \t]*\n([ \t]+)([^'"\s])"#,
            "${1}\n${2}\"\"\"\n${2}Description\n${2}\"\"\"\n${2}${3}",
            "Add docstrings to functions",
        ),
        Rule::literal(
            r"\[\s*([^\[\]]+?)\s+for\s+",
            "[${1} for ",
            "Fix list comprehension spacing",
        ),
    ]
}

fn javascript() -> Vec<Rule> {
    vec![
        Rule::computed(
            FENCED_BLOCK,
            |caps, _| terminate_javascript_lines(caps),
            "Add semicolons to line ends in JavaScript",
        ),
        Rule::literal(
            r"(\([^()\n]*\))\s*=>\s*\{",
            "${1} => {",
            "Standardize arrow function spacing",
        ),
        Rule::literal(
            r#"\b(const|let|var)\s+(\w+)\s*=\s*"([^"'\n]*)""#,
            "${1} ${2} = '${3}'",
            "Use consistent quotes (single) in JavaScript",
        ),
    ]
}

fn java() -> Vec<Rule> {
    vec![
        Rule::literal(r"\)[ \t]*\n[ \t]*\{", ") {", "Fix Java bracing style"),
        Rule::computed(
            r"((?:(?:public|private|protected|static|final|abstract)\s+)+)?\bclass\s+(\w+)\s*\{",
            |caps, _| add_public_modifier(caps),
            "Add missing public access modifier to classes",
        ),
    ]
}

fn csharp() -> Vec<Rule> {
    vec![Rule::computed(
        r"\b(public|private|protected|internal)\s+((?:(?:static|async|override|virtual|abstract)\s+)*[\w<>\[\],]+)\s+([a-z])(\w*)\s*\(",
        |caps, _| {
            Ok(format!(
                "{} {} {}{}(",
                group(caps, 1)?,
                group(caps, 2)?,
                group(caps, 3)?.to_uppercase(),
                optional_group(caps, 4)
            ))
        },
        "Fix C# method naming (PascalCase)",
    )]
}

fn go() -> Vec<Rule> {
    vec![Rule::computed(
        r"(?m)^([ \t]*)(\w+,\s*err\s*:?=[^\n]*)\n([^\n]*)",
        |caps, _| add_go_error_check(caps),
        "Add Go error checking",
    )]
}

pub fn formatting() -> Vec<Rule> {
    vec![
        Rule::literal(
            r"(?m)^([ \t]*\d+)\.([^\s\d.])",
            "${1}. ${2}",
            "Add space after list numbers",
        ),
        Rule::literal(
            r"(?m)^([ \t]*)-([A-Za-z0-9])",
            "${1}- ${2}",
            "Add space after bullet points",
        ),
        Rule::computed(
            r"(?m)^([ \t]*)\|((?:[^|\n]*\|){2,})[ \t]*$",
            |caps, _| normalize_table_row(caps),
            "Add spaces in table cells",
        ),
        Rule::computed(
            FENCED_BLOCK_WITH_TRAILER,
            |caps, _| separate_code_block(caps),
            "Add blank line after code blocks",
        ),
    ]
}

/// Windows conventions.
pub fn platform_specific() -> Vec<Rule> {
    vec![
        Rule::computed(
            r"\b([A-Za-z]):/([\w.-]+(?:/[\w.-]+)*/?)",
            |caps, _| {
                Ok(format!(
                    "{}:\\{}",
                    group(caps, 1)?,
                    group(caps, 2)?.replace('/', "\\")
                ))
            },
            "Convert forward slashes to backslashes in Windows paths",
        ),
        Rule::computed(
            r#""([A-Za-z]:\\[^"\n]*)""#,
            |caps, _| Ok(format!("\"{}\"", escape_backslashes(group(caps, 1)?))),
            "Fix Windows path escaping in strings",
        ),
        Rule::literal(r"%%(\w+)%%", "%${1}%", "Fix Windows environment variables"),
        Rule::literal(
            r#"(?m)\b(cmd(?:\.exe)?[ \t]+/c[ \t]+)([^"\n]*[^"\s])[ \t]*$"#,
            "${1}\"${2}\"",
            "Quote Windows command arguments",
        ),
    ]
}

pub fn context_aware() -> Vec<Rule> {
    vec![
        Rule::computed(
            format!(r"\b(?:{})\b", PLACEHOLDER_WORDS.join("|")),
            |caps, items| Ok(resolve_identifier(group(caps, 0)?, items)),
            "Replace generic function names with context-specific ones",
        ),
        Rule::computed(
            r"\bin\s+(?:the\s+codebase|your\s+project)\b",
            |caps, items| Ok(resolve_reference(group(caps, 0)?, items)),
            "Add repository-specific references",
        ),
    ]
}

fn label_code_block(caps: &Captures<'_>, detector: &LanguageDetector) -> Result<String, RuleError> {
    let block = group(caps, 0)?;
    if !optional_group(caps, 1).trim().is_empty() {
        return Ok(block.to_string());
    }
    let body = optional_group(caps, 2);
    Ok(match detector.sniff(body) {
        Some(language) => format!("```{language}\n{body}```"),
        None => block.to_string(),
    })
}

fn terminate_javascript_lines(caps: &Captures<'_>) -> Result<String, RuleError> {
    let block = group(caps, 0)?;
    let hint = optional_group(caps, 1);
    if !matches!(hint.trim().to_ascii_lowercase().as_str(), "javascript" | "js") {
        return Ok(block.to_string());
    }

    let mut out = String::with_capacity(block.len() + 16);
    out.push_str("```");
    out.push_str(hint);
    out.push('\n');
    for line in optional_group(caps, 2).split_inclusive('\n') {
        let code = line.trim_end();
        out.push_str(code);
        if needs_semicolon(code) {
            out.push(';');
        }
        out.push_str(&line[code.len()..]);
    }
    out.push_str("```");
    Ok(out)
}

fn needs_semicolon(line: &str) -> bool {
    let code = line.trim();
    if code.is_empty() || code.starts_with("//") || code.starts_with("/*") || code.starts_with('*')
    {
        return false;
    }
    if JS_BLOCK_KEYWORDS.iter().any(|kw| code.starts_with(kw)) {
        return false;
    }
    !code.ends_with(NO_SEMICOLON_AFTER)
}

fn add_public_modifier(caps: &Captures<'_>) -> Result<String, RuleError> {
    let block = group(caps, 0)?;
    let modifiers = optional_group(caps, 1);
    let has_access = modifiers
        .split_whitespace()
        .any(|word| matches!(word, "public" | "private" | "protected"));
    if has_access {
        return Ok(block.to_string());
    }
    Ok(format!("public {modifiers}class {} {{", group(caps, 2)?))
}

fn add_go_error_check(caps: &Captures<'_>) -> Result<String, RuleError> {
    let block = group(caps, 0)?;
    let indent = optional_group(caps, 1);
    let statement = group(caps, 2)?;
    let next = optional_group(caps, 3);
    if next.trim_start().starts_with("if err") || statement.trim_end().ends_with('{') {
        return Ok(block.to_string());
    }
    Ok(format!(
        "{indent}{statement}\n{indent}if err != nil {{\n{indent}\treturn err\n{indent}}}\n{next}"
    ))
}

fn normalize_table_row(caps: &Captures<'_>) -> Result<String, RuleError> {
    let cells = group(caps, 2)?;
    let cells = cells.strip_suffix('|').unwrap_or(cells);
    let cells: Vec<&str> = cells.split('|').map(str::trim).collect();
    Ok(format!(
        "{}| {} |",
        optional_group(caps, 1),
        cells.join(" | ")
    ))
}

fn separate_code_block(caps: &Captures<'_>) -> Result<String, RuleError> {
    let block = group(caps, 0)?;
    let newlines = optional_group(caps, 4);
    let next = optional_group(caps, 5);
    if newlines.len() != 1 || next.is_empty() {
        return Ok(block.to_string());
    }
    let split = block.len() - next.len();
    Ok(format!("{}\n{}", &block[..split], next))
}

/// Double every backslash, treating runs as one so the result is stable.
fn escape_backslashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 8);
    let mut previous_was_backslash = false;
    for c in path.chars() {
        if c == '\\' {
            if !previous_was_backslash {
                out.push_str("\\\\");
            }
            previous_was_backslash = true;
        } else {
            out.push(c);
            previous_was_backslash = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextItem;

    fn run(rules: &[Rule], description: &str, input: &str) -> String {
        rules
            .iter()
            .find(|rule| rule.description() == description)
            .unwrap_or_else(|| panic!("no rule named {description}"))
            .apply(input, &[])
            .unwrap()
    }

    fn general_rules() -> Vec<Rule> {
        general(Arc::new(LanguageDetector::new()))
    }

    #[test]
    fn every_builtin_rule_compiles() {
        let mut all = general_rules();
        all.extend(formatting());
        all.extend(platform_specific());
        all.extend(context_aware());
        for (_, rules) in language_specific() {
            all.extend(rules);
        }
        for rule in &all {
            assert!(
                rule.compile_error().is_none(),
                "{}: {:?}",
                rule.description(),
                rule.compile_error()
            );
        }
    }

    #[test]
    fn uncertainty_phrase_removed() {
        let rules = general_rules();
        assert_eq!(
            run(&rules, "Remove uncertainty phrases", "I think the function works"),
            "the function works"
        );
        assert_eq!(
            run(&rules, "Remove uncertainty phrases", "It fails. Perhaps the cache is stale"),
            "It fails. the cache is stale"
        );
    }

    #[test]
    fn unlabelled_block_gets_sniffed_language() {
        let rules = general_rules();
        let input = "```\ndef run(x):\n    return x\n```\n```js\nx()\n```";
        assert_eq!(
            run(&rules, "Add language to code blocks", input),
            "```python\ndef run(x):\n    return x\n```\n```js\nx()\n```"
        );
        let unknown = "```\nsome output\n```";
        assert_eq!(run(&rules, "Add language to code blocks", unknown), unknown);
    }

    #[test]
    fn heading_vs_and_contractions() {
        let rules = general_rules();
        assert_eq!(
            run(&rules, "Add space after heading markers", "##Setup\n#include <x>"),
            "## Setup\n#include <x>"
        );
        assert_eq!(
            run(&rules, "Standardize vs. abbreviation", "tabs vs spaces"),
            "tabs vs. spaces"
        );
        assert_eq!(
            run(
                &rules,
                "Replace double quotes with single quotes for contractions",
                "don\"t"
            ),
            "don't"
        );
    }

    #[test]
    fn python_rules() {
        let rules = python();
        assert_eq!(
            run(&rules, "Convert import x.y to from x import y", "import os.path"),
            "from os import path"
        );
        assert_eq!(
            run(
                &rules,
                "Add docstrings to functions",
                "def load(path):\n    return open(path)"
            ),
            "def load(path):\n    \"\"\"\n    Description\n    \"\"\"\n    return open(path)"
        );
        let documented = "def load(path):\n    \"\"\"Load.\"\"\"\n    return 1";
        assert_eq!(run(&rules, "Add docstrings to functions", documented), documented);
        assert_eq!(
            run(&rules, "Fix list comprehension spacing", "[ x   for x in xs]"),
            "[x for x in xs]"
        );
    }

    #[test]
    fn javascript_semicolons_only_inside_js_fences() {
        let rules = javascript();
        let input = "```js\nconst a = 1\nif (a) {\n  go()\n}\n```\nplain text";
        assert_eq!(
            run(&rules, "Add semicolons to line ends in JavaScript", input),
            "```js\nconst a = 1;\nif (a) {\n  go();\n}\n```\nplain text"
        );
        let python = "```python\nx = 1\n```";
        assert_eq!(
            run(&rules, "Add semicolons to line ends in JavaScript", python),
            python
        );
    }

    #[test]
    fn javascript_spacing_and_quotes() {
        let rules = javascript();
        assert_eq!(
            run(&rules, "Standardize arrow function spacing", "(a, b)=>{"),
            "(a, b) => {"
        );
        assert_eq!(
            run(
                &rules,
                "Use consistent quotes (single) in JavaScript",
                "const name = \"bob\""
            ),
            "const name = 'bob'"
        );
    }

    #[test]
    fn java_rules() {
        let rules = java();
        assert_eq!(
            run(&rules, "Fix Java bracing style", "void run()\n{"),
            "void run() {"
        );
        assert_eq!(
            run(&rules, "Add missing public access modifier to classes", "class Foo {"),
            "public class Foo {"
        );
        assert_eq!(
            run(
                &rules,
                "Add missing public access modifier to classes",
                "static class Inner{"
            ),
            "public static class Inner {"
        );
        let already = "private class Foo {";
        assert_eq!(
            run(&rules, "Add missing public access modifier to classes", already),
            already
        );
    }

    #[test]
    fn csharp_method_names_are_pascal_cased() {
        let rules = csharp();
        assert_eq!(
            run(
                &rules,
                "Fix C# method naming (PascalCase)",
                "public static void doWork() {"
            ),
            "public static void DoWork() {"
        );
    }

    #[test]
    fn go_error_check_inserted_once() {
        let rules = go();
        let input = "\tv, err := load()\n\tuse(v)";
        let once = run(&rules, "Add Go error checking", input);
        assert_eq!(
            once,
            "\tv, err := load()\n\tif err != nil {\n\t\treturn err\n\t}\n\tuse(v)"
        );
        assert_eq!(run(&rules, "Add Go error checking", &once), once);
    }

    #[test]
    fn formatting_rules() {
        let rules = formatting();
        assert_eq!(
            run(&rules, "Add space after list numbers", "1.First\n2. Second\n3.14 is pi"),
            "1. First\n2. Second\n3.14 is pi"
        );
        assert_eq!(
            run(&rules, "Add space after bullet points", "-one\n- two\n---"),
            "- one\n- two\n---"
        );
        assert_eq!(
            run(&rules, "Add spaces in table cells", "|a|b|\n|---|---|"),
            "| a | b |\n| --- | --- |"
        );
        let normalized = "| a | b |";
        assert_eq!(run(&rules, "Add spaces in table cells", normalized), normalized);
    }

    #[test]
    fn blank_line_after_code_blocks() {
        let rules = formatting();
        let input = "```py\nx = 1\n```\nNext\n\n```\ny\n```\n\nDone";
        assert_eq!(
            run(&rules, "Add blank line after code blocks", input),
            "```py\nx = 1\n```\n\nNext\n\n```\ny\n```\n\nDone"
        );
    }

    #[test]
    fn windows_rules() {
        let rules = platform_specific();
        assert_eq!(
            run(
                &rules,
                "Convert forward slashes to backslashes in Windows paths",
                "open C:/Users/me/file.txt or https://example.com/x"
            ),
            "open C:\\Users\\me\\file.txt or https://example.com/x"
        );
        let once = run(
            &rules,
            "Fix Windows path escaping in strings",
            r#"path = "C:\Users\me""#,
        );
        assert_eq!(once, r#"path = "C:\\Users\\me""#);
        assert_eq!(
            run(&rules, "Fix Windows path escaping in strings", &once),
            once
        );
        assert_eq!(
            run(&rules, "Fix Windows environment variables", "echo %%PATH%%"),
            "echo %PATH%"
        );
        assert_eq!(
            run(&rules, "Quote Windows command arguments", "cmd.exe /c dir build"),
            "cmd.exe /c \"dir build\""
        );
    }

    #[test]
    fn context_rules_use_items() {
        let rules = context_aware();
        let items = vec![ContextItem::new("function").with_name("parseConfig")];
        assert_eq!(
            rules[0].apply("call myFunction now", &items).unwrap(),
            "call processparseConfig now"
        );
        assert_eq!(
            rules[0].apply("the processor", &items).unwrap(),
            "the processor"
        );
        let repo = vec![ContextItem::default().with_path("/repo/my-service")];
        assert_eq!(
            rules[1].apply("look in the codebase first", &repo).unwrap(),
            "look in the my-service codebase first"
        );
    }
}
