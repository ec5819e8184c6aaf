//! # Store Module
//!
//! Fingerprint records, per-source datasets, and their flat CSV form.
//!
//! A dataset belongs to exactly one source. Its table schema names the
//! identity column (`filename`, `ad_id`, ...) and the metadata columns that
//! source produces; the fingerprint column is always `phash` so any two
//! files can be loaded and matched without knowing where they came from.

pub mod sample;
mod table;

pub use table::{load_dataset, write_dataset, CsvSink, LoadedDataset, RowRejection};

use crate::core::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Column holding the fingerprint in every persisted dataset
pub const FINGERPRINT_COLUMN: &str = "phash";

/// Identity column names recognised on import, in priority order
pub const IDENTITY_COLUMNS: [&str; 5] = ["filename", "ad_id", "asset_id", "file_id", "identity"];

/// Source-specific metadata columns of one record
pub type Metadata = BTreeMap<String, String>;

/// One persisted fingerprint. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    identity: String,
    fingerprint: Fingerprint,
    metadata: Metadata,
}

impl FingerprintRecord {
    /// Create a record
    pub fn new(identity: impl Into<String>, fingerprint: Fingerprint, metadata: Metadata) -> Self {
        Self {
            identity: identity.into(),
            fingerprint,
            metadata,
        }
    }

    /// Source-specific key (filename, ad id, ...)
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Canonical fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Origin metadata columns
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// One metadata value, if present and non-empty
    pub fn meta(&self, column: &str) -> Option<&str> {
        self.metadata
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Column layout of a persisted dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Name of the identity column
    pub identity_column: String,
    /// Metadata columns, in output order
    pub metadata_columns: Vec<String>,
}

impl TableSchema {
    /// Create a schema
    pub fn new(identity_column: &str, metadata_columns: &[&str]) -> Self {
        Self {
            identity_column: identity_column.to_string(),
            metadata_columns: metadata_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Local folder: `filename, phash, file_path, file_size`
    pub fn local_folder() -> Self {
        Self::new("filename", &["file_path", "file_size"])
    }

    /// Google Drive: `filename, phash, file_id, file_size, web_link`
    pub fn google_drive() -> Self {
        Self::new("filename", &["file_id", "file_size", "web_link"])
    }

    /// Meta creatives: `ad_id, phash, platform, creative_name, thumbnail_url`
    pub fn meta() -> Self {
        Self::new("ad_id", &["platform", "creative_name", "thumbnail_url"])
    }

    /// Google Ads image assets
    pub fn google_ads() -> Self {
        Self::new(
            "ad_id",
            &["platform", "creative_name", "asset_id", "asset_name", "image_source"],
        )
    }

    /// Meta and Google Ads rows side by side; columns a platform lacks stay empty
    pub fn ad_platforms() -> Self {
        Self::new(
            "ad_id",
            &[
                "platform",
                "creative_name",
                "thumbnail_url",
                "asset_id",
                "asset_name",
                "image_source",
            ],
        )
    }

    /// Full header row: identity, fingerprint, then metadata
    pub fn header(&self) -> Vec<&str> {
        let mut header = vec![self.identity_column.as_str(), FINGERPRINT_COLUMN];
        header.extend(self.metadata_columns.iter().map(String::as_str));
        header
    }
}

/// An ordered collection of records from one source.
///
/// Rows keep insertion order. Identity lookup returns the first row with
/// that identity; later rows sharing it are kept and matched on their own.
#[derive(Debug, Clone)]
pub struct FingerprintDataset {
    label: String,
    schema: TableSchema,
    records: Vec<FingerprintRecord>,
    by_identity: HashMap<String, usize>,
}

impl FingerprintDataset {
    /// Create an empty dataset
    pub fn new(label: impl Into<String>, schema: TableSchema) -> Self {
        Self {
            label: label.into(),
            schema,
            records: Vec::new(),
            by_identity: HashMap::new(),
        }
    }

    /// Build a dataset from records in order
    pub fn from_records(
        label: impl Into<String>,
        schema: TableSchema,
        records: impl IntoIterator<Item = FingerprintRecord>,
    ) -> Self {
        let mut dataset = Self::new(label, schema);
        for record in records {
            dataset.push(record);
        }
        dataset
    }

    /// Append a record. Returns false when its identity was already present.
    pub fn push(&mut self, record: FingerprintRecord) -> bool {
        let index = self.records.len();
        let fresh = !self.by_identity.contains_key(record.identity());
        if fresh {
            self.by_identity.insert(record.identity().to_string(), index);
        }
        self.records.push(record);
        fresh
    }

    /// Human-readable label (usually the file stem)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Column layout
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Records in insertion order
    pub fn records(&self) -> &[FingerprintRecord] {
        &self.records
    }

    /// Iterate records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &FingerprintRecord> {
        self.records.iter()
    }

    /// First record with this identity
    pub fn get(&self, identity: &str) -> Option<&FingerprintRecord> {
        self.by_identity.get(identity).map(|&i| &self.records[i])
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fingerprint width shared by the rows, if any rows exist
    pub fn fingerprint_width(&self) -> Option<usize> {
        self.records.first().map(|r| r.fingerprint().width())
    }
}

/// Give datasets that share a label distinct ones, `meta#1`, `meta#2`, ...
/// in the order given. Unique labels are left alone.
pub fn disambiguate_labels<'a>(datasets: impl IntoIterator<Item = &'a mut FingerprintDataset>) {
    let mut datasets: Vec<&mut FingerprintDataset> = datasets.into_iter().collect();

    let mut totals: HashMap<String, usize> = HashMap::new();
    for dataset in &datasets {
        *totals.entry(dataset.label.clone()).or_default() += 1;
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for dataset in datasets.iter_mut() {
        if totals.get(&dataset.label).copied().unwrap_or(0) > 1 {
            let occurrence = seen.entry(dataset.label.clone()).or_default();
            *occurrence += 1;
            dataset.label = format!("{}#{}", dataset.label, occurrence);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(identity: &str, hash: &str) -> FingerprintRecord {
        FingerprintRecord::new(identity, Fingerprint::parse(hash).unwrap(), Metadata::new())
    }

    #[test]
    fn dataset_keeps_insertion_order() {
        let dataset = FingerprintDataset::from_records(
            "local",
            TableSchema::local_folder(),
            vec![
                record("b.png", "cb2434dbcb2434db"),
                record("a.png", "9a65659a9a65659a"),
            ],
        );

        let identities: Vec<_> = dataset.iter().map(|r| r.identity()).collect();
        assert_eq!(identities, vec!["b.png", "a.png"]);
    }

    #[test]
    fn duplicate_fingerprints_are_legal() {
        let dataset = FingerprintDataset::from_records(
            "meta",
            TableSchema::meta(),
            vec![
                record("123456789", "9a65659a9a65659a"),
                record("555666777", "9a65659a9a65659a"),
            ],
        );
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn repeated_identity_is_kept_but_reported() {
        let mut dataset = FingerprintDataset::new("drive", TableSchema::google_drive());

        assert!(dataset.push(record("logo.png", "9a65659a9a65659a")));
        assert!(!dataset.push(record("logo.png", "cb2434dbcb2434db")));

        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.get("logo.png").unwrap().fingerprint().as_str(),
            "9a65659a9a65659a"
        );
    }

    #[test]
    fn schema_header_puts_fingerprint_second() {
        assert_eq!(
            TableSchema::local_folder().header(),
            vec!["filename", "phash", "file_path", "file_size"]
        );
        assert_eq!(TableSchema::meta().header()[0], "ad_id");
    }

    #[test]
    fn meta_ignores_empty_values() {
        let mut metadata = Metadata::new();
        metadata.insert("web_link".to_string(), String::new());
        metadata.insert("file_id".to_string(), "1Bx".to_string());
        let record = FingerprintRecord::new(
            "x.png",
            Fingerprint::parse("9a65659a9a65659a").unwrap(),
            metadata,
        );

        assert_eq!(record.meta("web_link"), None);
        assert_eq!(record.meta("file_id"), Some("1Bx"));
    }

    #[test]
    fn shared_labels_get_suffixes() {
        let schema = TableSchema::meta();
        let mut a = FingerprintDataset::new("meta", schema.clone());
        let mut b = FingerprintDataset::new("google", schema.clone());
        let mut c = FingerprintDataset::new("meta", schema);

        disambiguate_labels([&mut a, &mut b, &mut c]);

        assert_eq!(a.label(), "meta#1");
        assert_eq!(b.label(), "google");
        assert_eq!(c.label(), "meta#2");
    }
}
