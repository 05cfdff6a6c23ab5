//! Project entity configuration
//!
//! The configuration is supplied per project by an external provider and
//! consumed here as an immutable snapshot: it describes, per entity concept,
//! the unique-key column, the column-to-property mapping, and the validation
//! rules to run. It is loaded dynamically (JSON), never compiled in.

use std::path::Path;

use bdi_common::{BdiError, Result};
use serde::{Deserialize, Serialize};

/// Severity of a validation rule.
///
/// Error-level failures reject the record set; warnings never block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleLevel {
    #[default]
    Warning,
    Error,
}

/// Declarative rule definition attached to an entity.
///
/// Tagged by `name`, matching the open strategy set in
/// [`crate::validation::rules`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all_fields = "camelCase")]
pub enum RuleDef {
    /// Each listed column must have a value in every record
    RequiredValue {
        columns: Vec<String>,
        #[serde(default)]
        level: RuleLevel,
    },
    /// A column's values must be unique within the record set
    UniqueValue {
        column: String,
        #[serde(default)]
        level: RuleLevel,
    },
    /// A column's values must come from a fixed vocabulary
    ControlledVocabulary {
        column: String,
        vocabulary: Vec<String>,
        #[serde(default)]
        level: RuleLevel,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// A column's values must match a regular expression
    MatchesRegex {
        column: String,
        pattern: String,
        #[serde(default)]
        level: RuleLevel,
    },
    /// Child records must reference identifiers present in the parent set
    ValidParentIdentifiers {
        #[serde(default = "error_level")]
        level: RuleLevel,
    },
}

fn error_level() -> RuleLevel {
    RuleLevel::Error
}

/// Column-to-property mapping for one attribute of an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    /// Column header as it appears in input files
    pub column: String,

    /// Canonical property name; defaults to the column header
    #[serde(default)]
    pub uri: Option<String>,
}

impl Attribute {
    /// The property name records are keyed by for this attribute
    pub fn property(&self) -> &str {
        self.uri.as_deref().unwrap_or(&self.column)
    }
}

/// Configuration of one entity concept within a project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Name of the entity concept (e.g. "sample", "event")
    pub concept_alias: String,

    /// Worksheet/section this entity's records live on
    #[serde(default)]
    pub worksheet: Option<String>,

    /// Column holding the entity's unique key
    #[serde(default)]
    pub unique_key: Option<String>,

    /// Declared type tag of the entity
    #[serde(default = "default_entity_type")]
    pub entity_type: String,

    #[serde(default)]
    pub attributes: Vec<Attribute>,

    #[serde(default)]
    pub rules: Vec<RuleDef>,

    /// When true, an empty record set for this entity is accepted
    #[serde(default)]
    pub optional: bool,

    /// When true, the unique key is a content hash computed at read time
    #[serde(default)]
    pub hashed: bool,

    /// Concept alias of the parent entity, for cross-entity reference checks
    #[serde(default)]
    pub parent_entity: Option<String>,
}

fn default_entity_type() -> String {
    "DefaultEntity".to_string()
}

impl Entity {
    /// Resolve a column header to its property name, if the entity declares it
    pub fn property_for_column(&self, column: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.column == column)
            .map(|a| a.property())
    }

    /// Property name of the unique key column
    pub fn unique_key_property(&self) -> Option<&str> {
        let key = self.unique_key.as_deref()?;
        Some(self.property_for_column(key).unwrap_or(key))
    }
}

/// Immutable project configuration snapshot.
///
/// Read-only for the lifetime of a validation pass; safe to share across
/// concurrent validations of different record sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub entities: Vec<Entity>,
}

impl ProjectConfig {
    /// Parse a configuration from JSON, rejecting structural problems.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ProjectConfig = serde_json::from_str(json)
            .map_err(|e| BdiError::Configuration(format!("invalid project config: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    /// Load a configuration snapshot from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|_| BdiError::FileRead {
            path: path.display().to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Look up an entity by concept alias
    pub fn entity(&self, concept_alias: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.concept_alias == concept_alias)
    }

    /// Entities whose worksheet matches the given sheet name.
    ///
    /// Entities with no declared worksheet match any sheet.
    pub fn entities_for_sheet<'a>(&'a self, sheet: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.entities
            .iter()
            .filter(move |e| e.worksheet.as_deref().is_none_or(|w| w == sheet))
    }

    fn check(&self) -> Result<()> {
        if self.entities.is_empty() {
            return Err(BdiError::Configuration(
                "project config declares no entities".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for entity in &self.entities {
            if entity.concept_alias.is_empty() {
                return Err(BdiError::Configuration(
                    "entity with empty conceptAlias".to_string(),
                ));
            }
            if !seen.insert(entity.concept_alias.as_str()) {
                return Err(BdiError::Configuration(format!(
                    "duplicate conceptAlias: {}",
                    entity.concept_alias
                )));
            }
            if let Some(parent) = &entity.parent_entity {
                if parent == &entity.concept_alias {
                    return Err(BdiError::Configuration(format!(
                        "entity {} references itself as parent",
                        entity.concept_alias
                    )));
                }
                if !self.entities.iter().any(|e| &e.concept_alias == parent) {
                    return Err(BdiError::Configuration(format!(
                        "entity {} references unknown parent {}",
                        entity.concept_alias, parent
                    )));
                }
            }
        }

        Ok(())
    }
}
