//! Validation message collections
//!
//! One [`EntityMessages`] per validated record set: two ordered sequences,
//! warnings and errors. Any error rejects the set; warnings never block.
//! The collection serializes to JSON for the response layer.

use serde::Serialize;

use crate::config::RuleLevel;

/// A single validation message, grouped by the failed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Group heading, e.g. "Missing column(s)"
    pub group: String,
    /// Human-readable detail
    pub text: String,
}

impl Message {
    pub fn new(group: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            text: text.into(),
        }
    }
}

/// Warnings and errors accumulated while validating one record set
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMessages {
    concept_alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sheet_name: Option<String>,
    warnings: Vec<Message>,
    errors: Vec<Message>,
}

impl EntityMessages {
    pub fn new(concept_alias: impl Into<String>) -> Self {
        Self {
            concept_alias: concept_alias.into(),
            ..Default::default()
        }
    }

    pub fn with_sheet(concept_alias: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            concept_alias: concept_alias.into(),
            sheet_name: Some(sheet_name.into()),
            ..Default::default()
        }
    }

    pub fn concept_alias(&self) -> &str {
        &self.concept_alias
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    pub fn add_error(&mut self, group: impl Into<String>, text: impl Into<String>) {
        self.errors.push(Message::new(group, text));
    }

    pub fn add_warning(&mut self, group: impl Into<String>, text: impl Into<String>) {
        self.warnings.push(Message::new(group, text));
    }

    /// Route a message to warnings or errors by rule level
    pub fn add_message(
        &mut self,
        group: impl Into<String>,
        text: impl Into<String>,
        level: RuleLevel,
    ) {
        match level {
            RuleLevel::Error => self.add_error(group, text),
            RuleLevel::Warning => self.add_warning(group, text),
        }
    }

    pub fn warnings(&self) -> &[Message] {
        &self.warnings
    }

    pub fn errors(&self) -> &[Message] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
