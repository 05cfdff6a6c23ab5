//! Reader selection and the tabular reader plugins
//!
//! A [`DataReader`] turns one input file into [`RecordSet`]s using the
//! project configuration's column mappings. Readers are registered per
//! [`ReaderType`] in a priority-ordered [`ReaderRegistry`]; selection is
//! deterministic — the first registered reader claiming the file's extension
//! wins, never a silent fallback.

pub mod delimited;
pub mod excel;

use std::collections::HashMap;
use std::path::Path;

use bdi_common::{BdiError, Result};
use tracing::debug;

use crate::config::{Entity, ProjectConfig};
use crate::records::{Record, RecordSet};

pub use delimited::DelimitedTextReader;
pub use excel::ExcelReader;

/// Structural family of an input format, independent of file extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReaderType(String);

impl ReaderType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Row/column structured data (spreadsheets, delimited files)
    pub fn tabular() -> Self {
        Self::new("tabular")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata key holding the worksheet/section name readers should read
pub const SHEET_NAME_KEY: &str = "sheetName";

/// Reader-specific options carried alongside a file.
///
/// Holds the declared reader type plus free-form string options, e.g.
/// `{"sheetName": "Samples"}`.
#[derive(Debug, Clone)]
pub struct RecordMetadata {
    reader_type: ReaderType,
    metadata: HashMap<String, String>,
}

impl RecordMetadata {
    pub fn new(reader_type: ReaderType) -> Self {
        Self {
            reader_type,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(reader_type: ReaderType, metadata: HashMap<String, String>) -> Self {
        Self {
            reader_type,
            metadata,
        }
    }

    pub fn reader_type(&self) -> &ReaderType {
        &self.reader_type
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    /// Remove an option, returning its value if it was present
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.metadata.remove(key)
    }

    /// Get a required option, failing with [`BdiError::MissingMetadata`]
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| BdiError::MissingMetadata(key.to_string()))
    }
}

/// A reader produces the record sets of one opened input file.
pub trait DataReader {
    /// Parse the file and return one record set per entity concept.
    ///
    /// Record order within each set is file row order.
    fn record_sets(&mut self) -> Result<Vec<RecordSet>>;
}

impl std::fmt::Debug for dyn DataReader + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataReader")
    }
}

/// Opens [`DataReader`] instances for files it can handle.
pub trait ReaderFactory: Send + Sync {
    /// The structural family this reader belongs to
    fn reader_type(&self) -> ReaderType;

    /// Whether this reader claims the given lowercase file extension
    fn handles_extension(&self, ext: &str) -> bool;

    /// Open the file and return a reader owning its handle
    fn open(
        &self,
        file: &Path,
        config: &ProjectConfig,
        metadata: &RecordMetadata,
    ) -> Result<Box<dyn DataReader>>;
}

/// Priority-ordered registry of reader factories, keyed by reader type.
///
/// Read-only after construction; the order factories were registered in is
/// the tie-breaking order when several claim the same extension.
pub struct ReaderRegistry {
    factories: HashMap<ReaderType, Vec<Box<dyn ReaderFactory>>>,
}

impl ReaderRegistry {
    /// An empty registry with no readers
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in tabular readers registered
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(delimited::DelimitedTextReaderFactory));
        registry.register(Box::new(excel::ExcelReaderFactory));
        registry
    }

    /// Append a factory at the lowest priority for its reader type
    pub fn register(&mut self, factory: Box<dyn ReaderFactory>) {
        self.factories
            .entry(factory.reader_type())
            .or_default()
            .push(factory);
    }

    /// Select and open a reader for the given file.
    ///
    /// Fails with [`BdiError::FileRead`] when the file is missing/unreadable
    /// and [`BdiError::ReaderNotFound`] when no registered reader claims the
    /// file's extension for the requested reader type.
    pub fn get_reader(
        &self,
        file: &Path,
        config: &ProjectConfig,
        metadata: &RecordMetadata,
    ) -> Result<Box<dyn DataReader>> {
        if !file.is_file() {
            return Err(BdiError::FileRead {
                path: file.display().to_string(),
            });
        }

        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let candidates = self
            .factories
            .get(metadata.reader_type())
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        for factory in candidates {
            if factory.handles_extension(&ext) {
                debug!(
                    file = %file.display(),
                    reader_type = %metadata.reader_type(),
                    extension = %ext,
                    "Selected reader"
                );
                return factory.open(file, config, metadata);
            }
        }

        Err(BdiError::ReaderNotFound {
            reader_type: metadata.reader_type().to_string(),
            extension: ext,
        })
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble record sets from tabular rows.
///
/// Shared by the concrete tabular readers: maps header columns through each
/// entity's attributes, skips blank rows, computes hashed unique keys, and
/// propagates hashed parent keys onto child records from the same row.
/// Entities with no records still yield an (empty) record set so the
/// validator sees them.
pub(crate) fn build_record_sets(
    config: &ProjectConfig,
    sheet: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> Vec<RecordSet> {
    // Parents before children, so a child row can pick up its parent's
    // hashed key.
    let mut entities: Vec<&Entity> = config.entities_for_sheet(sheet).collect();
    entities.sort_by_key(|e| e.parent_entity.is_some());

    let mut sets: Vec<(String, RecordSet)> = entities
        .iter()
        .map(|e| {
            (
                e.concept_alias.clone(),
                RecordSet::new(e.concept_alias.clone()),
            )
        })
        .collect();

    for row in rows {
        if row.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let mut hashed_keys: HashMap<&str, String> = HashMap::new();

        for (entity, (_, set)) in entities.iter().zip(sets.iter_mut()) {
            let mut record = Record::new();

            for (header, value) in headers.iter().zip(row.iter()) {
                if let Some(property) = entity.property_for_column(header) {
                    record.set(property, value.as_str());
                }
            }

            if entity.hashed {
                let key = record.content_hash();
                if let Some(property) = entity.unique_key_property() {
                    record.set(property, key.clone());
                }
                hashed_keys.insert(entity.concept_alias.as_str(), key);
            }

            if let Some(parent_alias) = entity.parent_entity.as_deref() {
                if let Some(parent_key) = hashed_keys.get(parent_alias) {
                    if let Some(parent_property) = config
                        .entity(parent_alias)
                        .and_then(|p| p.unique_key_property())
                    {
                        record.set(parent_property, parent_key.clone());
                    }
                }
            }

            set.add(record);
        }
    }

    sets.into_iter().map(|(_, set)| set).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tabular_metadata(sheet: &str) -> RecordMetadata {
        let mut metadata = RecordMetadata::new(ReaderType::tabular());
        metadata.add(SHEET_NAME_KEY, sheet);
        metadata
    }

    fn sample_config() -> ProjectConfig {
        ProjectConfig::from_json(
            r#"{"entities": [{
                "conceptAlias": "sample",
                "worksheet": "Samples",
                "uniqueKey": "sampleID",
                "attributes": [{"column": "sampleID"}, {"column": "locality"}]
            }]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_missing_file_is_file_read_error() {
        let registry = ReaderRegistry::new();
        let err = registry
            .get_reader(
                Path::new("/no/such/dataset.csv"),
                &sample_config(),
                &tabular_metadata("Samples"),
            )
            .unwrap_err();
        assert!(matches!(err, BdiError::FileRead { .. }));
    }

    #[test]
    fn test_unregistered_reader_type_not_found() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "sampleID\n1").unwrap();

        let registry = ReaderRegistry::new();
        let metadata = RecordMetadata::new(ReaderType::new("fasta"));
        let err = registry
            .get_reader(file.path(), &sample_config(), &metadata)
            .unwrap_err();
        assert!(
            matches!(err, BdiError::ReaderNotFound { ref reader_type, .. } if reader_type == "fasta")
        );
    }

    #[test]
    fn test_unclaimed_extension_not_found() {
        let mut file = NamedTempFile::with_suffix(".pdf").unwrap();
        writeln!(file, "not tabular").unwrap();

        let registry = ReaderRegistry::new();
        let err = registry
            .get_reader(file.path(), &sample_config(), &tabular_metadata("Samples"))
            .unwrap_err();
        assert!(
            matches!(err, BdiError::ReaderNotFound { ref extension, .. } if extension == "pdf")
        );
    }

    #[test]
    fn test_empty_registry_finds_nothing() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "sampleID\n1").unwrap();

        let registry = ReaderRegistry::empty();
        let err = registry
            .get_reader(file.path(), &sample_config(), &tabular_metadata("Samples"))
            .unwrap_err();
        assert!(matches!(err, BdiError::ReaderNotFound { .. }));
    }

    #[test]
    fn test_first_registered_factory_wins() {
        struct Claiming(&'static str);

        struct FixedReader(&'static str);
        impl DataReader for FixedReader {
            fn record_sets(&mut self) -> Result<Vec<RecordSet>> {
                Ok(vec![RecordSet::new(self.0)])
            }
        }

        impl ReaderFactory for Claiming {
            fn reader_type(&self) -> ReaderType {
                ReaderType::tabular()
            }
            fn handles_extension(&self, _ext: &str) -> bool {
                true
            }
            fn open(
                &self,
                _file: &Path,
                _config: &ProjectConfig,
                _metadata: &RecordMetadata,
            ) -> Result<Box<dyn DataReader>> {
                Ok(Box::new(FixedReader(self.0)))
            }
        }

        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "sampleID\n1").unwrap();

        let mut registry = ReaderRegistry::empty();
        registry.register(Box::new(Claiming("first")));
        registry.register(Box::new(Claiming("second")));

        let mut reader = registry
            .get_reader(file.path(), &sample_config(), &tabular_metadata("Samples"))
            .unwrap();
        let sets = reader.record_sets().unwrap();
        assert_eq!(sets[0].concept_alias(), "first");
    }

    #[test]
    fn test_metadata_require() {
        let metadata = tabular_metadata("Samples");
        assert_eq!(metadata.require(SHEET_NAME_KEY).unwrap(), "Samples");
        assert!(matches!(
            metadata.require("delimiter"),
            Err(BdiError::MissingMetadata(_))
        ));
    }

    #[test]
    fn test_metadata_remove() {
        let mut metadata = tabular_metadata("Samples");
        assert_eq!(metadata.remove(SHEET_NAME_KEY).as_deref(), Some("Samples"));
        assert!(!metadata.has(SHEET_NAME_KEY));
        assert_eq!(metadata.remove(SHEET_NAME_KEY), None);
    }

    #[test]
    fn test_build_record_sets_skips_blank_rows() {
        let config = sample_config();
        let headers = vec!["sampleID".to_string(), "locality".to_string()];
        let rows = vec![
            vec!["s1".to_string(), "Monteverde".to_string()],
            vec!["".to_string(), "  ".to_string()],
            vec!["s2".to_string(), "Osa".to_string()],
        ];

        let sets = build_record_sets(&config, "Samples", &headers, &rows);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 2);
        assert_eq!(sets[0].records()[1].get("sampleID"), "s2");
    }

    #[test]
    fn test_build_record_sets_hashed_parent_propagation() {
        let config = ProjectConfig::from_json(
            r#"{"entities": [
                {
                    "conceptAlias": "event",
                    "uniqueKey": "eventHash",
                    "hashed": true,
                    "attributes": [{"column": "locality"}]
                },
                {
                    "conceptAlias": "sample",
                    "uniqueKey": "sampleID",
                    "parentEntity": "event",
                    "attributes": [{"column": "sampleID"}]
                }
            ]}"#,
        )
        .unwrap();

        let headers = vec!["locality".to_string(), "sampleID".to_string()];
        let rows = vec![vec!["Monteverde".to_string(), "s1".to_string()]];

        let sets = build_record_sets(&config, "Samples", &headers, &rows);
        let event = sets.iter().find(|s| s.concept_alias() == "event").unwrap();
        let sample = sets.iter().find(|s| s.concept_alias() == "sample").unwrap();

        let event_key = event.records()[0].get("eventHash");
        assert!(!event_key.is_empty());
        assert_eq!(sample.records()[0].get("eventHash"), event_key);
    }
}
