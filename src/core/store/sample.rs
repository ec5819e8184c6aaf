//! Demo datasets for trying the matcher without any credentials.
//!
//! Five local creatives and five Meta creatives: four share a fingerprint,
//! one on each side does not.

use super::{write_dataset, FingerprintDataset, FingerprintRecord, Metadata, TableSchema};
use crate::core::fingerprint::Fingerprint;
use crate::core::source::SourceKind;
use crate::error::StoreError;
use std::path::{Path, PathBuf};

const LOCAL_ROWS: [(&str, &str, &str); 5] = [
    ("ad_creative_1.png", "9a65659a9a65659a", "4523"),
    ("ad_creative_2.jpg", "cb2434dbcb2434db", "5635"),
    ("banner_ad.png", "cc3333cccc3333cc", "3785"),
    ("product_image.jpg", "857a7a85c57a3a85", "7981"),
    ("unmatched_local.png", "123456789abcdef0", "3000"),
];

const META_ROWS: [(&str, &str, &str); 5] = [
    ("123456789", "9a65659a9a65659a", "Summer Sale Banner"),
    ("987654321", "cb2434dbcb2434db", "Product Showcase"),
    ("555666777", "cc3333cccc3333cc", "Banner Ad"),
    ("111222333", "857a7a85c57a3a85", "Product Image"),
    ("999888777", "abcdef1234567890", "Unmatched Platform Ad"),
];

/// The local half of the demo
pub fn sample_local() -> FingerprintDataset {
    FingerprintDataset::from_records(
        "local_creative_hashes",
        TableSchema::local_folder(),
        LOCAL_ROWS.iter().filter_map(|(name, hash, size)| {
            let mut metadata = Metadata::new();
            metadata.insert("file_path".to_string(), format!("test_images/{}", name));
            metadata.insert("file_size".to_string(), size.to_string());
            let fingerprint = Fingerprint::parse(hash).ok()?;
            Some(FingerprintRecord::new(*name, fingerprint, metadata))
        }),
    )
}

/// The Meta half of the demo
pub fn sample_meta() -> FingerprintDataset {
    FingerprintDataset::from_records(
        "platform_creative_hashes_META",
        TableSchema::meta(),
        META_ROWS.iter().enumerate().filter_map(|(i, (ad_id, hash, name))| {
            let mut metadata = Metadata::new();
            metadata.insert("platform".to_string(), "Meta".to_string());
            metadata.insert("creative_name".to_string(), name.to_string());
            metadata.insert(
                "thumbnail_url".to_string(),
                format!("https://example.com/thumb{}.jpg", i + 1),
            );
            let fingerprint = Fingerprint::parse(hash).ok()?;
            Some(FingerprintRecord::new(*ad_id, fingerprint, metadata))
        }),
    )
}

/// Write both demo datasets under `dir` with their default file names
pub fn write_samples(dir: &Path) -> Result<(PathBuf, PathBuf), StoreError> {
    let local_path = dir.join(SourceKind::LocalFolder.default_output());
    let meta_path = dir.join(SourceKind::Meta.default_output());

    write_dataset(&sample_local(), &local_path)?;
    write_dataset(&sample_meta(), &meta_path)?;

    Ok((local_path, meta_path))
}
