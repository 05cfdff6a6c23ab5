//! Dataset processing pipeline
//!
//! [`DatasetProcessor`] drives one file through the pipeline: reader
//! selection, record set extraction, and validation of every set. It is the
//! processing object the staging cache holds between the validate and upload
//! phases — it owns its record sets until the commit step consumes them or
//! the staged entry expires.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bdi_common::{BdiError, Result};
use tracing::info;

use crate::config::ProjectConfig;
use crate::reader::{ReaderRegistry, RecordMetadata};
use crate::records::RecordSet;
use crate::validation::{EntityMessages, RecordValidator};

/// Drives reading and validation of one input file against one project
/// configuration snapshot.
pub struct DatasetProcessor {
    config: Arc<ProjectConfig>,
    file: PathBuf,
    metadata: RecordMetadata,
    record_sets: Vec<RecordSet>,
    messages: Vec<EntityMessages>,
    has_error: bool,
    validated: bool,
}

impl DatasetProcessor {
    pub fn new(
        config: Arc<ProjectConfig>,
        file: impl Into<PathBuf>,
        metadata: RecordMetadata,
    ) -> Self {
        Self {
            config,
            file: file.into(),
            metadata,
            record_sets: Vec::new(),
            messages: Vec::new(),
            has_error: false,
            validated: false,
        }
    }

    /// Read the file and validate every extracted record set.
    ///
    /// Returns overall acceptability: true unless any set failed an
    /// error-level check. Reader selection and parse failures are
    /// infrastructure faults and return `Err`; validation problems are data
    /// and land in [`messages`](Self::messages).
    pub fn validate(&mut self, registry: &ReaderRegistry) -> Result<bool> {
        if self.validated {
            return Err(BdiError::InvalidArgument(
                "dataset has already been validated".to_string(),
            ));
        }
        self.validated = true;

        let mut reader = registry.get_reader(&self.file, &self.config, &self.metadata)?;
        let mut record_sets = reader.record_sets()?;

        self.attach_parents(&mut record_sets);

        for record_set in &mut record_sets {
            let mut validator = RecordValidator::new(&self.config);
            let accepted = validator.validate(record_set)?;

            if !accepted {
                self.has_error = true;
            }
            self.messages.push(validator.into_messages());
        }

        info!(
            file = %self.file.display(),
            record_sets = record_sets.len(),
            accepted = !self.has_error,
            "Validated dataset"
        );

        self.record_sets = record_sets;
        Ok(!self.has_error)
    }

    /// Give each child set a read-only snapshot of its parent's records for
    /// cross-entity reference checks.
    fn attach_parents(&self, record_sets: &mut [RecordSet]) {
        let wanted: HashSet<String> = record_sets
            .iter()
            .filter_map(|s| self.config.entity(s.concept_alias()))
            .filter_map(|e| e.parent_entity.clone())
            .collect();

        let snapshots: Vec<(String, Arc<RecordSet>)> = record_sets
            .iter()
            .filter(|s| wanted.contains(s.concept_alias()))
            .map(|s| (s.concept_alias().to_string(), Arc::new(s.clone())))
            .collect();

        for record_set in record_sets.iter_mut() {
            let parent_alias = self
                .config
                .entity(record_set.concept_alias())
                .and_then(|e| e.parent_entity.clone());

            if let Some(alias) = parent_alias {
                if let Some((_, snapshot)) = snapshots.iter().find(|(a, _)| *a == alias) {
                    record_set.set_parent(Arc::clone(snapshot));
                }
            }
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Whether any record set failed an error-level check
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// Whether any record set produced warnings
    pub fn has_warning(&self) -> bool {
        self.messages.iter().any(|m| m.has_warnings())
    }

    /// Message collections, one per record set, in extraction order
    pub fn messages(&self) -> &[EntityMessages] {
        &self.messages
    }

    /// The validated record sets, owned until the commit step
    pub fn record_sets(&self) -> &[RecordSet] {
        &self.record_sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ReaderType, SHEET_NAME_KEY};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config() -> Arc<ProjectConfig> {
        Arc::new(
            ProjectConfig::from_json(
                r#"{"entities": [
                    {
                        "conceptAlias": "event",
                        "worksheet": "Samples",
                        "uniqueKey": "eventID",
                        "attributes": [{"column": "eventID"}, {"column": "locality"}],
                        "rules": [
                            {"name": "RequiredValue", "columns": ["eventID"], "level": "ERROR"}
                        ]
                    },
                    {
                        "conceptAlias": "sample",
                        "worksheet": "Samples",
                        "uniqueKey": "sampleID",
                        "parentEntity": "event",
                        "attributes": [{"column": "sampleID"}, {"column": "eventID"}],
                        "rules": [
                            {"name": "ValidParentIdentifiers", "level": "ERROR"}
                        ]
                    }
                ]}"#,
            )
            .unwrap(),
        )
    }

    fn metadata() -> RecordMetadata {
        let mut m = RecordMetadata::new(ReaderType::tabular());
        m.add(SHEET_NAME_KEY, "Samples");
        m
    }

    #[test]
    fn test_valid_file_accepted() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "eventID,locality,sampleID").unwrap();
        writeln!(file, "e1,Monteverde,s1").unwrap();
        writeln!(file, "e2,Osa,s2").unwrap();

        let mut processor = DatasetProcessor::new(config(), file.path(), metadata());
        let accepted = processor.validate(&ReaderRegistry::new()).unwrap();

        assert!(accepted);
        assert!(!processor.has_error());
        assert_eq!(processor.record_sets().len(), 2);
        assert_eq!(processor.messages().len(), 2);
    }

    #[test]
    fn test_missing_required_value_rejected() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "eventID,locality,sampleID").unwrap();
        writeln!(file, ",Monteverde,s1").unwrap();

        let mut processor = DatasetProcessor::new(config(), file.path(), metadata());
        let accepted = processor.validate(&ReaderRegistry::new()).unwrap();

        assert!(!accepted);
        assert!(processor.has_error());

        let event_messages = processor
            .messages()
            .iter()
            .find(|m| m.concept_alias() == "event")
            .unwrap();
        assert!(event_messages.has_errors());
    }

    #[test]
    fn test_parent_references_checked_across_sets() {
        // sample rows reference eventIDs from the same sheet; both exist
        // here, so the cross-entity rule passes
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "eventID,locality,sampleID").unwrap();
        writeln!(file, "e1,Monteverde,s1").unwrap();

        let mut processor = DatasetProcessor::new(config(), file.path(), metadata());
        assert!(processor.validate(&ReaderRegistry::new()).unwrap());
    }

    #[test]
    fn test_missing_file_fails_hard() {
        let mut processor =
            DatasetProcessor::new(config(), "/no/such/file.csv", metadata());
        assert!(matches!(
            processor.validate(&ReaderRegistry::new()),
            Err(BdiError::FileRead { .. })
        ));
    }

    #[test]
    fn test_double_validation_rejected() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "eventID,locality,sampleID").unwrap();
        writeln!(file, "e1,Monteverde,s1").unwrap();

        let mut processor = DatasetProcessor::new(config(), file.path(), metadata());
        processor.validate(&ReaderRegistry::new()).unwrap();
        assert!(matches!(
            processor.validate(&ReaderRegistry::new()),
            Err(BdiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_processor_stages_and_returns_to_owner() {
        use crate::staging::{StagingCache, StagingId};

        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "eventID,locality,sampleID").unwrap();
        writeln!(file, "e1,Monteverde,s1").unwrap();

        let mut processor = DatasetProcessor::new(config(), file.path(), metadata());
        processor.validate(&ReaderRegistry::new()).unwrap();

        let cache = StagingCache::new();
        let id = cache.put(StagingId::new(), processor, 42);

        let staged = cache.get(&id, 42).unwrap();
        assert_eq!(staged.record_sets().len(), 2);
        assert!(cache.get(&id, 43).is_none());

        // commit phase done: drop the staged work
        cache.invalidate(&id);
        assert!(cache.get(&id, 42).is_none());
    }
}
