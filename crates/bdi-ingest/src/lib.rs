//! BDI Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Ingests heterogeneous tabular biodiversity datasets, validates them
//! against a dynamically loaded project configuration, and stages the result
//! for a separate commit request.
//!
//! # Pipeline
//!
//! 1. **Reader selection** ([`reader`]): a [`reader::ReaderRegistry`] picks
//!    the reader for a file by reader type and extension, in deterministic
//!    priority order.
//! 2. **Records & validation** ([`records`], [`validation`]): readers
//!    produce [`records::RecordSet`]s, which a
//!    [`validation::RecordValidator`] checks against the entity's configured
//!    rules, accumulating warnings and errors.
//! 3. **Staging** ([`staging`]): the validated
//!    [`processor::DatasetProcessor`] is parked in a
//!    [`staging::StagingCache`] under an opaque id until the owning user's
//!    upload request commits it or it expires.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bdi_ingest::config::ProjectConfig;
//! use bdi_ingest::processor::DatasetProcessor;
//! use bdi_ingest::reader::{ReaderRegistry, ReaderType, RecordMetadata, SHEET_NAME_KEY};
//! use bdi_ingest::staging::{StagingCache, StagingId};
//!
//! fn main() -> bdi_common::Result<()> {
//!     let config = Arc::new(ProjectConfig::from_file("project.json")?);
//!     let registry = ReaderRegistry::new();
//!
//!     let mut metadata = RecordMetadata::new(ReaderType::tabular());
//!     metadata.add(SHEET_NAME_KEY, "Samples");
//!
//!     let mut processor = DatasetProcessor::new(config, "samples.csv", metadata);
//!     let accepted = processor.validate(&registry)?;
//!
//!     if accepted {
//!         let cache: StagingCache<DatasetProcessor> = StagingCache::new();
//!         let id = cache.put(StagingId::new(), processor, 42);
//!         // hand `id` back to the caller for the upload request
//!         let _ = id;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod processor;
pub mod reader;
pub mod records;
pub mod staging;
pub mod validation;
