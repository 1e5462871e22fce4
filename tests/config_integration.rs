//! Integration tests for rule files
//!
//! Loading from disk, merging several files, and building a refiner from the
//! result.

use response_refiner::config::{load_all, load_from_path, load_from_str, ConfigError};
use response_refiner::{Category, Refiner, Registry, ResponseEnvelope};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const TEAM_RULES: &str = r#"
[meta]
name = "team-rules"
description = "House style"

[refiner]
disabled_categories = ["platform_specific"]

[[rules]]
category = "general"
description = "Prefer data over datas"
pattern = '\bdatas\b'
replacement = "data"

[[rules]]
category = "language_specific"
language = "py"
description = "Use pathlib"
pattern = '\bos\.path\.join\b'
replacement = "pathlib.Path"
"#;

/// Helper to write rule files into a temp dir
fn setup_rules_dir(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().unwrap();
    let paths = files
        .iter()
        .map(|(name, contents)| {
            let path = dir.path().join(name);
            fs::write(&path, contents).unwrap();
            path
        })
        .collect();
    (dir, paths)
}

#[test]
fn test_load_from_path() {
    let (_dir, paths) = setup_rules_dir(&[("team.toml", TEAM_RULES)]);
    let config = load_from_path(&paths[0]).unwrap();

    assert_eq!(config.meta.name, "team-rules");
    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.refiner.disabled_categories, vec![Category::PlatformSpecific]);
}

#[test]
fn test_errors_carry_the_file_path() {
    let (_dir, paths) = setup_rules_dir(&[(
        "broken.toml",
        "[[rules]]\ncategory = \"language_specific\"\ndescription = \"x\"\npattern = \"x\"\n",
    )]);
    let err = load_from_path(&paths[0]).unwrap_err();

    match &err {
        ConfigError::Validation { path, .. } => assert_eq!(path.as_ref(), Some(&paths[0])),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("broken.toml"));
    assert!(err.to_string().contains("missing required field 'language'"));
}

#[test]
fn test_invalid_toml_is_reported() {
    let err = load_from_str("[[rules]\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml { .. }));
}

#[test]
fn test_file_rules_extend_builtin_table() {
    let config = load_from_str(TEAM_RULES).unwrap();
    let refiner = Refiner::from_config(&config);

    let refined = refiner.refine(&ResponseEnvelope::new("I think the datas are ready"), &[]);
    assert_eq!(refined.text(), Some("the data are ready"));
    assert_eq!(
        refined.applied_rules.unwrap(),
        vec!["Remove uncertainty phrases", "Prefer data over datas"]
    );
}

#[test]
fn test_file_language_rule_runs_for_detected_language() {
    let config = load_from_str(TEAM_RULES).unwrap();
    let refiner = Refiner::from_config(&config);

    let refined = refiner.refine(&ResponseEnvelope::new("```python\nos.path.join(a, b)\n```"), &[]);
    assert_eq!(refined.text(), Some("```python\npathlib.Path(a, b)\n```"));
    assert_eq!(refined.applied_rules.unwrap(), vec!["python: Use pathlib"]);
}

#[test]
fn test_disabled_category_is_skipped() {
    let config = load_from_str(TEAM_RULES).unwrap();
    let refiner = Refiner::from_config(&config);

    let content = "Run %%PATH%% first";
    let refined = refiner.refine(&ResponseEnvelope::new(content), &[]);
    assert_eq!(refined.text(), Some(content));
    assert_eq!(refined.changed, Some(false));
}

#[test]
fn test_builtin_rules_can_be_turned_off() {
    let config = load_from_str(
        r#"
[refiner]
builtin_rules = false

[[rules]]
category = "formatting"
description = "Shout"
pattern = "quiet"
replacement = "LOUD"
"#,
    )
    .unwrap();
    let registry = Registry::from_config(&config);

    assert_eq!(registry.rule_count(), 1);
    let refined = Refiner::from_config(&config)
        .refine(&ResponseEnvelope::new("I think quiet"), &[]);
    assert_eq!(refined.text(), Some("I think LOUD"));
}

#[test]
fn test_disabled_refiner_returns_input() {
    let config = load_from_str("[refiner]\nenabled = false\n").unwrap();
    let refiner = Refiner::from_config(&config);
    let envelope = ResponseEnvelope::new("I think so");

    assert!(!refiner.is_enabled());
    assert_eq!(refiner.refine(&envelope, &[]), envelope);
}

#[test]
fn test_load_all_merges_in_order() {
    let (_dir, paths) = setup_rules_dir(&[
        ("a.toml", "[[rules]]\ncategory = \"general\"\ndescription = \"one\"\npattern = \"a\"\nreplacement = \"b\"\n"),
        ("b.toml", "[refiner]\nenabled = false\n\n[[rules]]\ncategory = \"general\"\ndescription = \"two\"\npattern = \"b\"\nreplacement = \"c\"\n"),
    ]);
    let config = load_all(&paths).unwrap();

    let names: Vec<&str> = config.rules.iter().map(|r| r.description.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
    assert!(!config.refiner.enabled);
}
