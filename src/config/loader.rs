use crate::config::schema::{RefinerConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read rule file from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse rule file TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse rule file TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule file ({}): {}", path.display(), source),
                None => write!(f, "invalid rule file: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RefinerConfig, ConfigError> {
    let config: RefinerConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RefinerConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load every rule file and fold them into one configuration, in order.
pub fn load_all<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
) -> Result<RefinerConfig, ConfigError> {
    let mut merged = RefinerConfig::default();
    for path in paths {
        merged.merge(load_from_path(path)?);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rules_and_settings() {
        let config = load_from_str(
            r#"
[meta]
name = "team"

[refiner]
disabled_categories = ["platform_specific"]

[[rules]]
category = "language_specific"
language = "py"
description = "Prefer data"
pattern = '\bdatas\b'
replacement = "data"
"#,
        )
        .unwrap();
        assert_eq!(config.meta.name, "team");
        assert!(config.refiner.enabled);
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].pattern, r"\bdatas\b");
    }

    #[test]
    fn unknown_category_is_a_toml_error() {
        let err = load_from_str("[[rules]]\ncategory = \"misc\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn validation_failure_is_reported() {
        let err = load_from_str(
            "[[rules]]\ncategory = \"general\"\ndescription = \"d\"\npattern = \"\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(err.to_string().contains("missing required field 'pattern'"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_from_path("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
