//! CLI configuration: TOML file, then environment and flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use repeats_core::EngineConfig;
use repeats_graph::GraphConfig;

use crate::commands::ConnectionArgs;

/// Everything the binary needs to run the engine against Neo4j.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeatsConfig {
    pub graph: GraphConfig,
    pub engine: EngineConfig,
}

impl RepeatsConfig {
    /// Load from `path`, or from the default location when it exists.
    ///
    /// An explicit path must exist. Without one, a missing default file
    /// yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply connection flags (and their `NEO4J_*` environment fallbacks).
    pub fn with_overrides(mut self, args: &ConnectionArgs) -> Self {
        if let Some(uri) = &args.uri {
            self.graph.uri = uri.clone();
        }
        if let Some(user) = &args.user {
            self.graph.user = user.clone();
        }
        if let Some(password) = &args.password {
            self.graph.password = password.clone();
        }
        if let Some(database) = &args.database {
            self.graph.database = database.clone();
        }
        if args.strict {
            self.engine.strict_direction = true;
        }
        self
    }
}

/// `~/.config/repeats/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("repeats").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml_partial() {
        let config = RepeatsConfig::from_toml(
            r#"
            [graph]
            uri = "bolt://catalog-db:7687"
            password = "s3cret"

            [engine]
            strict_direction = true
            "#,
        )
        .unwrap();

        assert_eq!(config.graph.uri, "bolt://catalog-db:7687");
        assert_eq!(config.graph.user, "neo4j");
        assert!(config.engine.strict_direction);
        assert_eq!(config.engine.repair_max_passes, 32);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RepeatsConfig::from_toml("").unwrap(), RepeatsConfig::default());
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(RepeatsConfig::from_toml("[engine]\nlock_retries = \"many\"").is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let args = ConnectionArgs {
            uri: Some("bolt://override:7687".to_string()),
            user: None,
            password: Some("pw".to_string()),
            database: Some("jingles".to_string()),
            strict: true,
        };
        let config = RepeatsConfig::default().with_overrides(&args);
        assert_eq!(config.graph.uri, "bolt://override:7687");
        assert_eq!(config.graph.user, "neo4j");
        assert_eq!(config.graph.password, "pw");
        assert_eq!(config.graph.database, "jingles");
        assert!(config.engine.strict_direction);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let path = std::env::temp_dir().join("repeats-config-that-does-not-exist.toml");
        assert!(RepeatsConfig::load(Some(&path)).is_err());
    }
}
