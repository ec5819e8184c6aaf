//! Integration tests for the fingerprinting pipeline.
//!
//! These tests verify end-to-end behavior over a real folder:
//! - Valid, corrupt and non-image files
//! - Rows on disk match the returned dataset
//! - Missing folders are fatal
//! - Meta and Google Ads combined into one dataset

use assert_fs::prelude::*;
use assert_fs::TempDir;
use creative_ghost_finder::core::fingerprint::FingerprintConfig;
use creative_ghost_finder::core::pipeline::Pipeline;
use creative_ghost_finder::core::source::{
    AdPlatformsSource, AssetListing, AssetLocator, AssetRef, AssetSource, LocalFolderConfig,
    LocalFolderSource, SourceKind,
};
use creative_ghost_finder::core::store::load_dataset;
use creative_ghost_finder::error::{FetchError, GhostFinderError, SourceError};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use predicates::prelude::*;
use std::io::Cursor;

fn encoded(format: ImageFormat, shift: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(ImageBuffer::from_fn(64, 64, |x, y| {
        let v = (((x / 8 + y / 8 + shift) % 2) * 200 + 20) as u8;
        Rgb([v, v, v])
    }));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

fn creative_folder() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("banner.png")
        .write_binary(&encoded(ImageFormat::Png, 0))
        .unwrap();
    temp.child("hero.jpg")
        .write_binary(&encoded(ImageFormat::Jpeg, 1))
        .unwrap();
    temp.child("corrupt.jpg")
        .write_binary(b"this is not a valid image file")
        .unwrap();
    temp.child("brief.txt").write_str("campaign notes").unwrap();
    temp
}

#[test]
fn local_folder_run_counts_every_outcome() {
    let temp = creative_folder();
    let output = temp.child("local_creative_hashes.csv");

    let source = LocalFolderSource::new(temp.path(), LocalFolderConfig::default());
    let generator = FingerprintConfig::new().build().unwrap();
    let run = Pipeline::builder()
        .fetch_workers(2)
        .build()
        .run(&source, &generator, output.path())
        .unwrap();

    assert_eq!(run.summary.listed, 3);
    assert_eq!(run.summary.processed, 2);
    assert_eq!(run.summary.decode_failures.len(), 1);
    assert_eq!(run.summary.decode_failures[0].identity, "corrupt.jpg");
    assert!(run.summary.fetch_failures.is_empty());
    assert!(run.summary.by_platform.is_empty());
    assert_eq!(run.summary.skipped.len(), 1);
    assert_eq!(run.summary.skipped[0].identity, "brief.txt");

    output.assert(predicate::path::exists());
    output.assert(predicate::str::starts_with("filename,phash,file_path,file_size"));
    output.assert(predicate::str::contains("banner.png"));
    output.assert(predicate::str::contains("corrupt.jpg").not());
}

#[test]
fn rows_on_disk_match_the_returned_dataset() {
    let temp = creative_folder();
    let output = temp.child("out/local.csv");

    let source = LocalFolderSource::new(temp.path(), LocalFolderConfig::default());
    let generator = FingerprintConfig::new().build().unwrap();
    let run = Pipeline::builder()
        .build()
        .run(&source, &generator, output.path())
        .unwrap();

    let loaded = load_dataset(output.path(), generator.fingerprint_width()).unwrap();
    assert!(loaded.rejected.is_empty());
    assert_eq!(loaded.dataset.len(), run.dataset.len());

    for record in loaded.dataset.iter() {
        let original = run.dataset.get(record.identity()).unwrap();
        assert_eq!(original.fingerprint(), record.fingerprint());
        assert_eq!(original.fingerprint().width(), 16);
        assert!(record.meta("file_size").is_some());
    }
}

#[test]
fn fingerprints_are_stable_across_runs() {
    let temp = creative_folder();
    let source = LocalFolderSource::new(temp.path(), LocalFolderConfig::default());
    let generator = FingerprintConfig::new().build().unwrap();
    let pipeline = Pipeline::builder().build();

    let first = pipeline
        .run(&source, &generator, temp.child("a.csv").path())
        .unwrap();
    let second = pipeline
        .run(&source, &generator, temp.child("b.csv").path())
        .unwrap();

    for record in first.dataset.iter() {
        assert_eq!(
            second.dataset.get(record.identity()).unwrap().fingerprint(),
            record.fingerprint()
        );
    }
}

#[test]
fn missing_folder_is_fatal() {
    let temp = TempDir::new().unwrap();
    let source = LocalFolderSource::new(
        temp.path().join("does-not-exist"),
        LocalFolderConfig::default(),
    );
    let generator = FingerprintConfig::new().build().unwrap();

    let result = Pipeline::builder()
        .build()
        .run(&source, &generator, temp.child("out.csv").path());

    assert!(matches!(
        result,
        Err(GhostFinderError::Source(SourceError::FolderNotFound { .. }))
    ));
    temp.child("out.csv").assert(predicate::path::missing());
}

#[test]
fn empty_folder_writes_header_only() {
    let temp = TempDir::new().unwrap();
    temp.child("creatives").create_dir_all().unwrap();
    let output = temp.child("empty.csv");

    let source = LocalFolderSource::new(temp.child("creatives").path(), LocalFolderConfig::default());
    let generator = FingerprintConfig::new().build().unwrap();
    let run = Pipeline::builder()
        .build()
        .run(&source, &generator, output.path())
        .unwrap();

    assert_eq!(run.summary.processed, 0);
    output.assert(predicate::str::starts_with("filename,phash"));
}

/// One ad platform serving generated creatives
struct AdAccount {
    kind: SourceKind,
    platform: &'static str,
    ads: Vec<(&'static str, u32)>,
}

impl AssetSource for AdAccount {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn locator(&self) -> String {
        format!("{} account", self.platform)
    }

    fn list_assets(&self) -> Result<AssetListing, SourceError> {
        let mut listing = AssetListing::default();
        for (id, _) in &self.ads {
            listing.assets.push(
                AssetRef::new(*id, AssetLocator::Remote(format!("https://cdn.test/{}.png", id)))
                    .with_meta("platform", self.platform)
                    .with_meta("creative_name", format!("Ad {}", id)),
            );
        }
        Ok(listing)
    }

    fn fetch(&self, asset: &AssetRef) -> Result<Vec<u8>, FetchError> {
        self.ads
            .iter()
            .find(|(id, _)| *id == asset.identity)
            .map(|(_, shift)| encoded(ImageFormat::Png, *shift))
            .ok_or_else(|| FetchError::Status {
                url: format!("https://cdn.test/{}.png", asset.identity),
                status: 404,
            })
    }
}

#[test]
fn combined_platforms_run_breaks_down_by_platform() {
    let temp = TempDir::new().unwrap();
    let output = temp.child("platform_creative_hashes_ALL.csv");

    let source = AdPlatformsSource::new(vec![
        Box::new(AdAccount {
            kind: SourceKind::Meta,
            platform: "Meta",
            ads: vec![("m-1", 0), ("m-2", 1)],
        }),
        Box::new(AdAccount {
            kind: SourceKind::GoogleAds,
            platform: "Google",
            ads: vec![("g-1", 0)],
        }),
    ])
    .unwrap();
    let generator = FingerprintConfig::new().build().unwrap();
    let run = Pipeline::builder()
        .fetch_workers(2)
        .build()
        .run(&source, &generator, output.path())
        .unwrap();

    assert_eq!(run.summary.processed, 3);
    assert_eq!(run.summary.by_platform.get("Meta"), Some(&2));
    assert_eq!(run.summary.by_platform.get("Google"), Some(&1));

    output.assert(predicate::str::starts_with(
        "ad_id,phash,platform,creative_name,thumbnail_url,asset_id,asset_name,image_source",
    ));
    let loaded = load_dataset(output.path(), generator.fingerprint_width()).unwrap();
    assert_eq!(loaded.dataset.get("g-1").unwrap().meta("platform"), Some("Google"));
    assert_eq!(loaded.dataset.get("m-2").unwrap().meta("creative_name"), Some("Ad m-2"));
}
