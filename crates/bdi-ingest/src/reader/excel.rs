//! Excel workbook reader
//!
//! Reads `.xls`/`.xlsx` workbooks via `calamine`. The worksheet is chosen by
//! the `sheetName` metadata option, falling back to the first sheet in the
//! workbook.

use std::path::{Path, PathBuf};

use bdi_common::{BdiError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use tracing::debug;

use crate::config::ProjectConfig;
use crate::reader::{
    build_record_sets, DataReader, ReaderFactory, ReaderType, RecordMetadata, SHEET_NAME_KEY,
};
use crate::records::RecordSet;

const EXTENSIONS: &[&str] = &["xls", "xlsx"];

/// Registers [`ExcelReader`] for the tabular reader type
pub struct ExcelReaderFactory;

impl ReaderFactory for ExcelReaderFactory {
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
        Ok(Box::new(ExcelReader::open(file, config, metadata)?))
    }
}

/// Reader for one opened Excel workbook
pub struct ExcelReader {
    path: PathBuf,
    workbook: Sheets<std::io::BufReader<std::fs::File>>,
    config: ProjectConfig,
    sheet: String,
}

impl std::fmt::Debug for ExcelReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExcelReader")
            .field("path", &self.path)
            .field("sheet", &self.sheet)
            .finish_non_exhaustive()
    }
}

impl ExcelReader {
    pub fn open(
        file: &Path,
        config: &ProjectConfig,
        metadata: &RecordMetadata,
    ) -> Result<Self> {
        let workbook = open_workbook_auto(file).map_err(|_| BdiError::FileRead {
            path: file.display().to_string(),
        })?;

        let sheet = match metadata.get(SHEET_NAME_KEY) {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| BdiError::Parse(format!("{}: workbook has no sheets", file.display())))?,
        };

        Ok(Self {
            path: file.to_path_buf(),
            workbook,
            config: config.clone(),
            sheet,
        })
    }
}

impl DataReader for ExcelReader {
    fn record_sets(&mut self) -> Result<Vec<RecordSet>> {
        let range: Range<Data> = self
            .workbook
            .worksheet_range(&self.sheet)
            .map_err(|e| BdiError::Parse(format!("{}: {}", self.path.display(), e)))?;

        let mut row_iter = range.rows();
        let headers: Vec<String> = match row_iter.next() {
            Some(row) => row.iter().map(cell_to_string).collect(),
            None => Vec::new(),
        };

        let rows: Vec<Vec<String>> = row_iter
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        debug!(
            file = %self.path.display(),
            sheet = %self.sheet,
            rows = rows.len(),
            "Parsed workbook sheet"
        );

        Ok(build_record_sets(&self.config, &self.sheet, &headers, &rows))
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // spreadsheet numerics come back as floats; keep integral values
        // free of a trailing ".0" so unique keys compare cleanly
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_factory_claims_excel_extensions() {
        let factory = ExcelReaderFactory;
        assert!(factory.handles_extension("xlsx"));
        assert!(factory.handles_extension("xls"));
        assert!(!factory.handles_extension("csv"));
    }

    #[test]
    fn test_corrupt_workbook_is_file_read_error() {
        let mut file = NamedTempFile::with_suffix(".xlsx").unwrap();
        writeln!(file, "this is not a workbook").unwrap();

        let config = ProjectConfig::from_json(
            r#"{"entities": [{"conceptAlias": "sample"}]}"#,
        )
        .unwrap();
        let metadata = RecordMetadata::new(ReaderType::tabular());

        let err = ExcelReader::open(file.path(), &config, &metadata).unwrap_err();
        assert!(matches!(err, BdiError::FileRead { .. }));
    }

    #[test]
    fn test_cell_to_string_conversions() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String(" s1 ".to_string())), "s1");
        assert_eq!(cell_to_string(&Data::Float(42.0)), "42");
        assert_eq!(cell_to_string(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }
}
