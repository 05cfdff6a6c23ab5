//! Generic record model
//!
//! A [`Record`] is one row/object of an input dataset: a property bag mapping
//! property names to string values. A [`RecordSet`] groups the records
//! belonging to one entity concept extracted from one input file; record
//! order is insertion order and is significant for row-number reporting.

use std::collections::BTreeMap;
use std::sync::Arc;

use bdi_common::hashing::hash_properties;

/// A single data record: property name -> property value.
///
/// Lookups are total: getting a missing property returns the empty string.
/// Values are trimmed on insert so comparisons and hashing see canonical
/// content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    properties: BTreeMap<String, String>,
    has_error: bool,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record from an initial property mapping (copied)
    pub fn from_properties(properties: BTreeMap<String, String>) -> Self {
        let properties = properties
            .into_iter()
            .map(|(k, v)| (k, v.trim().to_string()))
            .collect();

        Self {
            properties,
            has_error: false,
        }
    }

    /// Get a property value. Missing properties yield `""`.
    pub fn get(&self, property: &str) -> &str {
        self.properties.get(property).map(String::as_str).unwrap_or("")
    }

    /// Whether the property is present (even if empty)
    pub fn has(&self, property: &str) -> bool {
        self.properties.contains_key(property)
    }

    /// Set a property value
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.properties
            .insert(property.into(), value.into().trim().to_string());
    }

    /// Read-only view of all properties
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Mark this record as failed by an error-level rule.
    ///
    /// Errored records are excluded from [`RecordSet::records_to_persist`].
    pub fn set_error(&mut self) {
        self.has_error = true;
    }

    /// Whether this record should be persisted by the commit step
    pub fn persist(&self) -> bool {
        !self.has_error
    }

    /// Deterministic content hash over this record's properties.
    ///
    /// Property iteration is sorted by name, so the hash is stable for equal
    /// content regardless of insertion order.
    pub fn content_hash(&self) -> String {
        hash_properties(
            self.properties
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }
}

/// All records belonging to one entity concept from one input file.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    concept_alias: String,
    records: Vec<Record>,
    parent: Option<Arc<RecordSet>>,
}

impl RecordSet {
    /// Create an empty record set for the given concept
    pub fn new(concept_alias: impl Into<String>) -> Self {
        Self {
            concept_alias: concept_alias.into(),
            records: Vec::new(),
            parent: None,
        }
    }

    /// Create a record set with initial records
    pub fn with_records(concept_alias: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            concept_alias: concept_alias.into(),
            records,
            parent: None,
        }
    }

    /// Attach a snapshot of the parent entity's record set, for cross-entity
    /// reference checks
    pub fn set_parent(&mut self, parent: Arc<RecordSet>) {
        self.parent = Some(parent);
    }

    pub fn parent(&self) -> Option<&RecordSet> {
        self.parent.as_deref()
    }

    /// The entity concept these records belong to
    pub fn concept_alias(&self) -> &str {
        &self.concept_alias
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Append a record, preserving insertion order
    pub fn add(&mut self, record: Record) {
        self.records.push(record);
    }

    /// All records, in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Mutable access for validation rules that flag individual records
    pub(crate) fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Records not flagged with an error, in insertion order
    pub fn records_to_persist(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.persist())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_property_is_empty() {
        let record = Record::new();
        assert_eq!(record.get("anything"), "");
        assert!(!record.has("anything"));
    }

    #[test]
    fn test_from_properties_round_trip() {
        let mut props = BTreeMap::new();
        props.insert("a".to_string(), "1".to_string());
        props.insert("b".to_string(), "2".to_string());

        let record = Record::from_properties(props);
        assert_eq!(record.get("a"), "1");
        assert_eq!(record.get("b"), "2");
    }

    #[test]
    fn test_values_trimmed_on_set() {
        let mut record = Record::new();
        record.set("locality", "  Monteverde ");
        assert_eq!(record.get("locality"), "Monteverde");
    }

    #[test]
    fn test_errored_record_not_persisted() {
        let mut record = Record::new();
        assert!(record.persist());
        record.set_error();
        assert!(!record.persist());
    }

    #[test]
    fn test_content_hash_ignores_insertion_order() {
        let mut a = Record::new();
        a.set("x", "1");
        a.set("y", "2");

        let mut b = Record::new();
        b.set("y", "2");
        b.set("x", "1");

        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_new_record_set_is_empty() {
        let set = RecordSet::new("resource");
        assert!(set.is_empty());
        assert_eq!(set.concept_alias(), "resource");
    }

    #[test]
    fn test_record_order_is_insertion_order() {
        let mut set = RecordSet::new("sample");
        for i in 0..3 {
            let mut r = Record::new();
            r.set("row", i.to_string());
            set.add(r);
        }

        let rows: Vec<&str> = set.records().iter().map(|r| r.get("row")).collect();
        assert_eq!(rows, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_records_to_persist_filters_errors() {
        let mut set = RecordSet::new("sample");
        let mut bad = Record::new();
        bad.set("id", "1");
        bad.set_error();
        let mut good = Record::new();
        good.set("id", "2");

        set.add(bad);
        set.add(good);

        let kept: Vec<&str> = set.records_to_persist().map(|r| r.get("id")).collect();
        assert_eq!(kept, vec!["2"]);
    }
}
