/// Generator settings, loadable from a RON file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::character::AgeRange;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Every field is optional in the file; missing ones take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// How many characters to seed, one primary situation each.
    pub character_count: usize,
    pub seed: u64,
    /// Situation draws per character before giving up on it.
    pub max_situation_attempts: usize,
    /// Search nodes per situation before settling for the best so far.
    pub search_node_budget: usize,
    /// Search nodes for the pass that re-casts every open role at once.
    pub repair_node_budget: usize,
    /// Age interval of a freshly created character.
    pub default_age: AgeRange,
    /// Empty means every character lives in the "Village".
    pub locations: Vec<String>,
    pub traits_per_character: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            character_count: 10,
            seed: 0,
            max_situation_attempts: 8,
            search_node_budget: 50_000,
            repair_node_budget: 2_000,
            default_age: AgeRange::default(),
            locations: Vec::new(),
            traits_per_character: 2,
        }
    }
}

impl GeneratorConfig {
    pub fn load_from_ron(path: &Path) -> Result<GeneratorConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<GeneratorConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = GeneratorConfig::parse_ron(
            r#"(
                character_count: 6,
                locations: ["Millbrook", "Crow's Ferry"],
                default_age: (min: 30, max: 60),
            )"#,
        )
        .unwrap();
        assert_eq!(config.character_count, 6);
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.default_age, AgeRange::new(30, 60));
        assert_eq!(config.seed, 0);
        assert_eq!(config.search_node_budget, 50_000);
        assert_eq!(config.repair_node_budget, 2_000);
        assert_eq!(config.traits_per_character, 2);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(GeneratorConfig::parse_ron("()").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn unknown_field_is_an_error() {
        assert!(matches!(
            GeneratorConfig::parse_ron("(villagers: 3)"),
            Err(ConfigError::Ron(_))
        ));
    }
}
