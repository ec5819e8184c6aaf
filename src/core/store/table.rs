//! CSV export and import of fingerprint datasets.

use super::{
    FingerprintDataset, FingerprintRecord, Metadata, TableSchema, FINGERPRINT_COLUMN,
    IDENTITY_COLUMNS,
};
use crate::core::fingerprint::Fingerprint;
use crate::error::{ConfigurationError, StoreError, ValidationError};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Appends records to a CSV file one row at a time.
///
/// Every row is flushed as soon as it is written, so a run that is
/// interrupted keeps every fingerprint it already computed.
pub struct CsvSink {
    path: PathBuf,
    schema: TableSchema,
    writer: csv::Writer<File>,
    written: usize,
}

impl CsvSink {
    /// Create (or truncate) the file and write the header
    pub fn create(path: &Path, schema: TableSchema) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Create {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let file = File::create(path).map_err(|source| StoreError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        let mut sink = Self {
            path: path.to_path_buf(),
            writer: csv::Writer::from_writer(file),
            schema,
            written: 0,
        };

        let header: Vec<String> = sink.schema.header().iter().map(|c| c.to_string()).collect();
        sink.write_row(&header)?;
        Ok(sink)
    }

    /// Write one record and flush it to disk
    pub fn append(&mut self, record: &FingerprintRecord) -> Result<(), StoreError> {
        let mut row = vec![
            record.identity().to_string(),
            record.fingerprint().to_string(),
        ];
        row.extend(
            self.schema
                .metadata_columns
                .iter()
                .map(|column| record.metadata().get(column).cloned().unwrap_or_default()),
        );
        self.write_row(&row)?;
        self.written += 1;
        Ok(())
    }

    /// Rows written so far, excluding the header
    pub fn written(&self) -> usize {
        self.written
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), StoreError> {
        self.writer
            .write_record(row)
            .and_then(|_| self.writer.flush().map_err(csv::Error::from))
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// Export a whole dataset in one pass. Returns the number of rows written.
pub fn write_dataset(dataset: &FingerprintDataset, path: &Path) -> Result<usize, StoreError> {
    let mut sink = CsvSink::create(path, dataset.schema().clone())?;
    for record in dataset.iter() {
        sink.append(record)?;
    }
    debug!(path = %path.display(), rows = sink.written(), "Dataset written");
    Ok(sink.written())
}

/// A row excluded on import, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// 1-based line number in the file (the header is line 1)
    pub line: u64,
    /// Identity value of the row, if it had one
    pub identity: Option<String>,
    /// What was wrong with it
    pub error: ValidationError,
}

/// Result of importing one persisted dataset
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// Rows that passed validation
    pub dataset: FingerprintDataset,
    /// Rows that did not, in file order
    pub rejected: Vec<RowRejection>,
}

/// Import a persisted dataset.
///
/// Missing files, unreadable headers and a missing `phash` column are fatal.
/// Individual rows that fail validation are excluded and returned in
/// `rejected` so the caller can report them.
pub fn load_dataset(path: &Path, expected_width: usize) -> Result<LoadedDataset, ConfigurationError> {
    if !path.is_file() {
        return Err(ConfigurationError::DatasetMissing {
            path: path.to_path_buf(),
        });
    }

    let unreadable = |reason: String| ConfigurationError::DatasetUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| unreadable(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let fingerprint_index = headers
        .iter()
        .position(|h| h == FINGERPRINT_COLUMN)
        .ok_or_else(|| ConfigurationError::MissingColumn {
            path: path.to_path_buf(),
            column: FINGERPRINT_COLUMN.to_string(),
        })?;

    let identity_index = IDENTITY_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
        .or_else(|| (0..headers.len()).find(|&i| i != fingerprint_index))
        .ok_or_else(|| ConfigurationError::MissingColumn {
            path: path.to_path_buf(),
            column: IDENTITY_COLUMNS[0].to_string(),
        })?;

    let metadata_indices: Vec<usize> = (0..headers.len())
        .filter(|&i| i != fingerprint_index && i != identity_index)
        .collect();

    let schema = TableSchema {
        identity_column: headers[identity_index].clone(),
        metadata_columns: metadata_indices.iter().map(|&i| headers[i].clone()).collect(),
    };

    let label = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut dataset = FingerprintDataset::new(label, schema);
    let mut rejected = Vec::new();

    for (offset, row) in reader.records().enumerate() {
        // Header is line 1, first data row is line 2.
        let fallback_line = offset as u64 + 2;

        let row = match row {
            Ok(row) => row,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(unreadable(e.to_string()));
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line);
                warn!(path = %path.display(), line, error = %e, "Rejected malformed row");
                rejected.push(RowRejection {
                    line,
                    identity: None,
                    error: ValidationError::MalformedRow {
                        reason: e.to_string(),
                    },
                });
                continue;
            }
        };

        let line = row.position().map(|p| p.line()).unwrap_or(fallback_line);
        // Kept verbatim: filenames may legitimately start or end with spaces
        let identity = row.get(identity_index).unwrap_or("").to_string();
        let raw_fingerprint = row.get(fingerprint_index).unwrap_or("");

        let validated = if identity.trim().is_empty() {
            Err(ValidationError::EmptyIdentity)
        } else {
            Fingerprint::parse_with_width(raw_fingerprint, expected_width)
        };

        match validated {
            Ok(fingerprint) => {
                let metadata: Metadata = metadata_indices
                    .iter()
                    .map(|&i| (headers[i].clone(), row.get(i).unwrap_or("").to_string()))
                    .collect();
                dataset.push(FingerprintRecord::new(identity, fingerprint, metadata));
            }
            Err(error) => {
                warn!(path = %path.display(), line, identity = %identity, error = %error, "Rejected row");
                rejected.push(RowRejection {
                    line,
                    identity: Some(identity).filter(|i| !i.trim().is_empty()),
                    error,
                });
            }
        }
    }

    debug!(
        path = %path.display(),
        rows = dataset.len(),
        rejected = rejected.len(),
        "Dataset loaded"
    );

    Ok(LoadedDataset { dataset, rejected })
}
