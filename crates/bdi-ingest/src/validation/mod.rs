//! Record set validation
//!
//! [`RecordValidator`] checks one [`RecordSet`] against the project
//! configuration by running every rule the entity declares. Data-quality
//! problems accumulate in an [`EntityMessages`] collection and are reported
//! through the returned boolean; only infrastructure faults (unknown entity,
//! broken rule definition, double validation) return `Err`.

pub mod messages;
pub mod rules;

use bdi_common::{BdiError, Result};
use tracing::debug;

use crate::config::{ProjectConfig, RuleLevel};
use crate::records::RecordSet;

pub use messages::{EntityMessages, Message};
pub use rules::{build_rule, Rule};

/// Validates one record set against the active project configuration.
///
/// Create one validator per record set; [`validate`](Self::validate) must be
/// called exactly once before the set is considered stage-ready.
pub struct RecordValidator<'a> {
    config: &'a ProjectConfig,
    messages: EntityMessages,
    validated: bool,
    has_error: bool,
}

impl<'a> RecordValidator<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        Self {
            config,
            messages: EntityMessages::default(),
            validated: false,
            has_error: false,
        }
    }

    /// Run all configured rules against the record set.
    ///
    /// Returns whether the set is acceptable: true unless an error-level
    /// check failed. Warnings never block acceptance. An empty record set is
    /// an error unless the entity is marked optional.
    pub fn validate(&mut self, record_set: &mut RecordSet) -> Result<bool> {
        if self.validated {
            return Err(BdiError::InvalidArgument(
                "validate must be called exactly once per record set".to_string(),
            ));
        }
        self.validated = true;

        let alias = record_set.concept_alias().to_string();
        let entity = self.config.entity(&alias).ok_or_else(|| {
            BdiError::Configuration(format!("no entity configured for concept \"{}\"", alias))
        })?;

        self.messages = match &entity.worksheet {
            Some(sheet) => EntityMessages::with_sheet(&alias, sheet),
            None => EntityMessages::new(&alias),
        };

        if record_set.is_empty() {
            if !entity.optional {
                self.messages
                    .add_error("Dataset", format!("no \"{}\" records found", alias));
                self.has_error = true;
            }
            return Ok(!self.has_error);
        }

        for def in &entity.rules {
            let rule = build_rule(def)?;
            let passed = rule.run(record_set, entity, self.config, &mut self.messages);

            if !passed && rule.level() == RuleLevel::Error {
                self.has_error = true;
            }
        }

        debug!(
            concept_alias = %alias,
            records = record_set.len(),
            errors = self.messages.errors().len(),
            warnings = self.messages.warnings().len(),
            "Validated record set"
        );

        Ok(!self.has_error)
    }

    /// Whether an error-level check failed
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// Whether any warning was recorded
    pub fn has_warning(&self) -> bool {
        self.messages.has_warnings()
    }

    /// The accumulated message collection
    pub fn messages(&self) -> &EntityMessages {
        &self.messages
    }

    /// Consume the validator, keeping the message collection
    pub fn into_messages(self) -> EntityMessages {
        self.messages
    }
}
