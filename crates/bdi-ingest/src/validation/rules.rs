//! Validation rule strategies
//!
//! Each rule implements the same closed contract ([`Rule::run`]) and is
//! instantiated from its declarative [`RuleDef`] in the project
//! configuration. Rules accumulate messages; they never abort the pipeline.
//! Error-level rules additionally flag the offending records so the commit
//! step can skip them.

use std::collections::{HashMap, HashSet};

use bdi_common::{BdiError, Result};
use regex::Regex;

use crate::config::{Entity, ProjectConfig, RuleDef, RuleLevel};
use crate::records::RecordSet;
use crate::validation::messages::EntityMessages;

/// A single validation check run against one record set.
///
/// Returns whether the check passed. Failures are reported through
/// `messages` at the rule's level.
pub trait Rule {
    fn name(&self) -> &'static str;

    fn level(&self) -> RuleLevel;

    fn run(
        &self,
        record_set: &mut RecordSet,
        entity: &Entity,
        config: &ProjectConfig,
        messages: &mut EntityMessages,
    ) -> bool;
}

impl std::fmt::Debug for dyn Rule + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Instantiate the rule strategy for a declarative definition.
///
/// Fails with [`BdiError::Configuration`] when the definition itself is
/// broken (e.g. an invalid regex) — configuration problems surface hard,
/// they are not data-quality messages.
pub fn build_rule(def: &RuleDef) -> Result<Box<dyn Rule>> {
    match def {
        RuleDef::RequiredValue { columns, level } => Ok(Box::new(RequiredValueRule {
            columns: columns.clone(),
            level: *level,
        })),
        RuleDef::UniqueValue { column, level } => Ok(Box::new(UniqueValueRule {
            column: column.clone(),
            level: *level,
        })),
        RuleDef::ControlledVocabulary {
            column,
            vocabulary,
            level,
            case_insensitive,
        } => Ok(Box::new(ControlledVocabularyRule {
            column: column.clone(),
            vocabulary: vocabulary.clone(),
            level: *level,
            case_insensitive: *case_insensitive,
        })),
        RuleDef::MatchesRegex {
            column,
            pattern,
            level,
        } => {
            let regex = Regex::new(pattern).map_err(|e| {
                BdiError::Configuration(format!("invalid pattern for column {}: {}", column, e))
            })?;
            Ok(Box::new(MatchesRegexRule {
                column: column.clone(),
                regex,
                level: *level,
            }))
        },
        RuleDef::ValidParentIdentifiers { level } => {
            Ok(Box::new(ValidParentIdentifiersRule { level: *level }))
        },
    }
}

fn property_for<'a>(entity: &'a Entity, column: &'a str) -> &'a str {
    entity.property_for_column(column).unwrap_or(column)
}

/// Each listed column must have a value in every record
struct RequiredValueRule {
    columns: Vec<String>,
    level: RuleLevel,
}

impl Rule for RequiredValueRule {
    fn name(&self) -> &'static str {
        "RequiredValue"
    }

    fn level(&self) -> RuleLevel {
        self.level
    }

    fn run(
        &self,
        record_set: &mut RecordSet,
        entity: &Entity,
        _config: &ProjectConfig,
        messages: &mut EntityMessages,
    ) -> bool {
        let mut columns_missing_values: Vec<&str> = Vec::new();

        for record in record_set.records_mut() {
            let mut record_failed = false;

            for column in &self.columns {
                if record.get(property_for(entity, column)).is_empty() {
                    record_failed = true;
                    if !columns_missing_values.contains(&column.as_str()) {
                        columns_missing_values.push(column);
                    }
                }
            }

            if record_failed && self.level == RuleLevel::Error {
                record.set_error();
            }
        }

        if columns_missing_values.is_empty() {
            return true;
        }

        for column in columns_missing_values {
            messages.add_message(
                "Missing column(s)",
                format!("\"{}\" has a missing cell value", column),
                self.level,
            );
        }
        false
    }
}

/// A column's values must be unique within the record set
struct UniqueValueRule {
    column: String,
    level: RuleLevel,
}

impl Rule for UniqueValueRule {
    fn name(&self) -> &'static str {
        "UniqueValue"
    }

    fn level(&self) -> RuleLevel {
        self.level
    }

    fn run(
        &self,
        record_set: &mut RecordSet,
        entity: &Entity,
        _config: &ProjectConfig,
        messages: &mut EntityMessages,
    ) -> bool {
        let property = property_for(entity, &self.column);

        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in record_set.records() {
            let value = record.get(property);
            if !value.is_empty() {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
        }

        let mut duplicates: Vec<String> = counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(v, _)| v)
            .collect();

        if duplicates.is_empty() {
            return true;
        }
        duplicates.sort();

        if self.level == RuleLevel::Error {
            for record in record_set.records_mut() {
                if duplicates.iter().any(|d| d == record.get(property)) {
                    record.set_error();
                }
            }
        }

        messages.add_message(
            format!("\"{}\" column is defined as unique", self.column),
            format!(
                "\"{}\" column contains duplicate values: \"{}\"",
                self.column,
                duplicates.join("\", \"")
            ),
            self.level,
        );
        false
    }
}

/// A column's values must come from a fixed vocabulary
struct ControlledVocabularyRule {
    column: String,
    vocabulary: Vec<String>,
    level: RuleLevel,
    case_insensitive: bool,
}

impl ControlledVocabularyRule {
    fn contains(&self, value: &str) -> bool {
        if self.case_insensitive {
            self.vocabulary
                .iter()
                .any(|v| v.eq_ignore_ascii_case(value))
        } else {
            self.vocabulary.iter().any(|v| v == value)
        }
    }
}

impl Rule for ControlledVocabularyRule {
    fn name(&self) -> &'static str {
        "ControlledVocabulary"
    }

    fn level(&self) -> RuleLevel {
        self.level
    }

    fn run(
        &self,
        record_set: &mut RecordSet,
        entity: &Entity,
        _config: &ProjectConfig,
        messages: &mut EntityMessages,
    ) -> bool {
        let property = property_for(entity, &self.column);
        let mut passed = true;

        for (row, record) in record_set.records_mut().iter_mut().enumerate() {
            let value = record.get(property).to_string();
            if value.is_empty() || self.contains(&value) {
                continue;
            }

            passed = false;
            if self.level == RuleLevel::Error {
                record.set_error();
            }
            messages.add_message(
                format!("\"{}\" contains invalid value", self.column),
                format!(
                    "\"{}\" in row {} is not an approved value for \"{}\"",
                    value,
                    row + 1,
                    self.column
                ),
                self.level,
            );
        }

        passed
    }
}

/// A column's values must match a regular expression
struct MatchesRegexRule {
    column: String,
    regex: Regex,
    level: RuleLevel,
}

impl Rule for MatchesRegexRule {
    fn name(&self) -> &'static str {
        "MatchesRegex"
    }

    fn level(&self) -> RuleLevel {
        self.level
    }

    fn run(
        &self,
        record_set: &mut RecordSet,
        entity: &Entity,
        _config: &ProjectConfig,
        messages: &mut EntityMessages,
    ) -> bool {
        let property = property_for(entity, &self.column);
        let mut passed = true;

        for (row, record) in record_set.records_mut().iter_mut().enumerate() {
            let value = record.get(property).to_string();
            if value.is_empty() || self.regex.is_match(&value) {
                continue;
            }

            passed = false;
            if self.level == RuleLevel::Error {
                record.set_error();
            }
            messages.add_message(
                format!("\"{}\" must match pattern", self.column),
                format!(
                    "\"{}\" in row {} does not match the required pattern for \"{}\"",
                    value,
                    row + 1,
                    self.column
                ),
                self.level,
            );
        }

        passed
    }
}

/// Child records must reference identifiers present in the parent set
struct ValidParentIdentifiersRule {
    level: RuleLevel,
}

impl Rule for ValidParentIdentifiersRule {
    fn name(&self) -> &'static str {
        "ValidParentIdentifiers"
    }

    fn level(&self) -> RuleLevel {
        self.level
    }

    fn run(
        &self,
        record_set: &mut RecordSet,
        entity: &Entity,
        config: &ProjectConfig,
        messages: &mut EntityMessages,
    ) -> bool {
        let Some(parent_alias) = entity.parent_entity.as_deref() else {
            messages.add_error(
                "Invalid parent identifier(s)",
                format!(
                    "entity \"{}\" declares no parent entity",
                    entity.concept_alias
                ),
            );
            return false;
        };

        let Some(parent_property) = config
            .entity(parent_alias)
            .and_then(|p| p.unique_key_property())
            .map(str::to_string)
        else {
            messages.add_error(
                "Invalid parent identifier(s)",
                format!("parent entity \"{}\" declares no unique key", parent_alias),
            );
            return false;
        };

        // Owned keys so the parent borrow ends before records are flagged.
        let parent_keys: Option<HashSet<String>> = record_set.parent().map(|parent| {
            parent
                .records()
                .iter()
                .map(|r| r.get(&parent_property).to_string())
                .filter(|v| !v.is_empty())
                .collect()
        });
        let Some(parent_keys) = parent_keys else {
            messages.add_error(
                "Invalid parent identifier(s)",
                format!("no \"{}\" records to reference", parent_alias),
            );
            return false;
        };

        let mut orphans: Vec<String> = Vec::new();
        for record in record_set.records_mut() {
            let value = record.get(&parent_property).to_string();
            if !value.is_empty() && parent_keys.contains(value.as_str()) {
                continue;
            }

            if self.level == RuleLevel::Error {
                record.set_error();
            }
            if !orphans.contains(&value) {
                orphans.push(value);
            }
        }

        if orphans.is_empty() {
            return true;
        }

        for value in orphans {
            let text = if value.is_empty() {
                format!("record is missing its \"{}\" identifier", parent_alias)
            } else {
                format!(
                    "\"{}\" does not exist in parent entity \"{}\"",
                    value, parent_alias
                )
            };
            messages.add_message("Invalid parent identifier(s)", text, self.level);
        }
        false
    }
}
