use std::path::Path;

use serde::Deserialize;

/// Configuration loaded from `code-atlas.toml` at the project root.
#[derive(Debug, Deserialize, Default)]
pub struct AtlasConfig {
    /// Additional path patterns to exclude from indexing (beyond the tracked-set filter).
    pub exclude: Option<Vec<String>>,
}

impl AtlasConfig {
    /// Load configuration from `code-atlas.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("code-atlas.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("warning: failed to parse code-atlas.toml: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("warning: failed to read code-atlas.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        let config = AtlasConfig::load(dir.path());
        assert!(config.exclude.is_none());
    }

    #[test]
    fn test_load_exclude_patterns() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("code-atlas.toml"),
            "exclude = [\"vendor/*\", \"*.generated.ts\"]\n",
        )
        .unwrap();
        let config = AtlasConfig::load(dir.path());
        assert_eq!(
            config.exclude,
            Some(vec!["vendor/*".to_owned(), "*.generated.ts".to_owned()])
        );
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("code-atlas.toml"), "exclude = not-a-list").unwrap();
        let config = AtlasConfig::load(dir.path());
        assert!(config.exclude.is_none());
    }
}
