//! Delimited text reader (CSV/TSV)
//!
//! Parses RFC 4180 style delimited files with a header row. The delimiter is
//! taken from the `delimiter` metadata option when present, otherwise
//! inferred from the file extension.

use std::path::{Path, PathBuf};

use bdi_common::{BdiError, Result};
use tracing::debug;

use crate::config::ProjectConfig;
use crate::reader::{
    build_record_sets, DataReader, ReaderFactory, ReaderType, RecordMetadata, SHEET_NAME_KEY,
};
use crate::records::RecordSet;

const EXTENSIONS: &[&str] = &["csv", "tsv", "txt", "tab"];

/// Metadata key overriding the inferred field delimiter
pub const DELIMITER_KEY: &str = "delimiter";

/// Registers [`DelimitedTextReader`] for the tabular reader type
pub struct DelimitedTextReaderFactory;

impl ReaderFactory for DelimitedTextReaderFactory {
    fn reader_type(&self) -> ReaderType {
        ReaderType::tabular()
    }

    fn handles_extension(&self, ext: &str) -> bool {
        EXTENSIONS.contains(&ext)
    }

    fn open(
        &self,
        file: &Path,
        config: &ProjectConfig,
        metadata: &RecordMetadata,
    ) -> Result<Box<dyn DataReader>> {
        Ok(Box::new(DelimitedTextReader::open(file, config, metadata)?))
    }
}

/// Reader for one opened delimited text file
#[derive(Debug)]
pub struct DelimitedTextReader {
    path: PathBuf,
    reader: csv::Reader<std::fs::File>,
    config: ProjectConfig,
    sheet: String,
}

impl DelimitedTextReader {
    /// Open the file. Requires the `sheetName` metadata option so records
    /// can be matched to the entities declared for that worksheet.
    pub fn open(
        file: &Path,
        config: &ProjectConfig,
        metadata: &RecordMetadata,
    ) -> Result<Self> {
        let sheet = metadata.require(SHEET_NAME_KEY)?.to_string();
        let delimiter = resolve_delimiter(file, metadata)?;

        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_path(file)
            .map_err(|_| BdiError::FileRead {
                path: file.display().to_string(),
            })?;

        Ok(Self {
            path: file.to_path_buf(),
            reader,
            config: config.clone(),
            sheet,
        })
    }
}

impl DataReader for DelimitedTextReader {
    fn record_sets(&mut self) -> Result<Vec<RecordSet>> {
        let headers: Vec<String> = self
            .reader
            .headers()
            .map_err(|e| BdiError::Parse(format!("{}: {}", self.path.display(), e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        for result in self.reader.records() {
            let record =
                result.map_err(|e| BdiError::Parse(format!("{}: {}", self.path.display(), e)))?;
            // flexible parsing: short rows are padded by build_record_sets
            // zipping against headers
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }

        debug!(
            file = %self.path.display(),
            sheet = %self.sheet,
            rows = rows.len(),
            "Parsed delimited file"
        );

        Ok(build_record_sets(&self.config, &self.sheet, &headers, &rows))
    }
}

fn resolve_delimiter(file: &Path, metadata: &RecordMetadata) -> Result<u8> {
    if let Some(d) = metadata.get(DELIMITER_KEY) {
        let mut bytes = d.bytes();
        return match (bytes.next(), bytes.next()) {
            (Some(b), None) => Ok(b),
            _ => Err(BdiError::InvalidArgument(format!(
                "delimiter must be a single byte, got {:?}",
                d
            ))),
        };
    }

    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    Ok(match ext.as_str() {
        "csv" => b',',
        _ => b'\t',
    })
}
