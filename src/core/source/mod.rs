//! # Source Module
//!
//! Adapters that list creative assets in one inventory and fetch their
//! bytes on demand.
//!
//! ## Sources
//! - Local folder (walkdir)
//! - Google Drive folder (Drive v3 REST)
//! - Meta ad account creatives (Graph API)
//! - Google Ads image assets (Google Ads REST search)
//! - Meta and Google Ads together, one combined dataset
//!
//! Every adapter implements [`AssetSource`]. The fingerprint generator and
//! the matcher never see which source an asset came from; only the table
//! schema and the metadata columns differ.
//!
//! ## Example
//! ```rust,ignore
//! let source = LocalFolderSource::new("/creatives", LocalFolderConfig::default());
//! let listing = source.list_assets()?;
//! let bytes = source.fetch(&listing.assets[0])?;
//! ```

mod combined;
mod credentials;
mod drive;
mod filter;
mod google_ads;
mod http;
mod local;
mod meta;

pub use combined::AdPlatformsSource;
pub use credentials::{AccessToken, DriveCredentials, GoogleAdsCredentials, MetaCredentials};
pub use drive::DriveSource;
pub use filter::ImageFilter;
pub use google_ads::GoogleAdsSource;
pub use http::HttpFetcher;
pub use local::{LocalFolderConfig, LocalFolderSource};
pub use meta::MetaSource;

use crate::core::store::{Metadata, TableSchema};
use crate::error::{FetchError, SourceError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which inventory a dataset was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    LocalFolder,
    GoogleDrive,
    Meta,
    GoogleAds,
    /// Meta and Google Ads in one dataset
    AdPlatforms,
}

impl SourceKind {
    /// Column layout of datasets from this source
    pub fn schema(&self) -> TableSchema {
        match self {
            SourceKind::LocalFolder => TableSchema::local_folder(),
            SourceKind::GoogleDrive => TableSchema::google_drive(),
            SourceKind::Meta => TableSchema::meta(),
            SourceKind::GoogleAds => TableSchema::google_ads(),
            SourceKind::AdPlatforms => TableSchema::ad_platforms(),
        }
    }

    /// Default output file name
    pub fn default_output(&self) -> &'static str {
        match self {
            SourceKind::LocalFolder => "local_creative_hashes.csv",
            SourceKind::GoogleDrive => "google_drive_creative_hashes.csv",
            SourceKind::Meta => "platform_creative_hashes_META.csv",
            SourceKind::GoogleAds => "platform_creative_hashes_GOOGLE.csv",
            SourceKind::AdPlatforms => "platform_creative_hashes_ALL.csv",
        }
    }

    /// Value written to the `platform` column by an ad platform source
    pub fn platform_label(&self) -> Option<&'static str> {
        match self {
            SourceKind::Meta => Some("Meta"),
            SourceKind::GoogleAds => Some("Google"),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::LocalFolder => write!(f, "Local folder"),
            SourceKind::GoogleDrive => write!(f, "Google Drive"),
            SourceKind::Meta => write!(f, "Meta"),
            SourceKind::GoogleAds => write!(f, "Google Ads"),
            SourceKind::AdPlatforms => write!(f, "Ad platforms"),
        }
    }
}

/// Where an asset's bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocator {
    /// A file on the local filesystem
    File(PathBuf),
    /// A plain HTTP(S) URL (thumbnails, full-size images)
    Remote(String),
    /// A Drive file id, downloaded with `alt=media`
    DriveFile(String),
    /// Base64 image data delivered inline by the listing API
    Embedded {
        data: String,
        fallback_url: Option<String>,
    },
}

/// A listed asset, before its bytes are fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Source-specific key written to the identity column
    pub identity: String,
    /// Name shown in progress output
    pub display_name: String,
    /// Where to fetch the bytes from
    pub locator: AssetLocator,
    /// Metadata columns for the persisted record
    pub metadata: Metadata,
}

impl AssetRef {
    /// Create a reference whose display name is its identity
    pub fn new(identity: impl Into<String>, locator: AssetLocator) -> Self {
        let identity = identity.into();
        Self {
            display_name: identity.clone(),
            identity,
            locator,
            metadata: Metadata::new(),
        }
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Replace all metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add one metadata column
    pub fn with_meta(mut self, column: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(column.to_string(), value.into());
        self
    }
}

/// Fetched bytes plus the reference they belong to.
///
/// Consumed once by the fingerprint generator.
#[derive(Debug)]
pub struct ImageAsset {
    pub asset: AssetRef,
    pub bytes: Vec<u8>,
}

/// Why a listed entry was not fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Extension or MIME type is not a supported raster image
    NotAnImage { detail: String },
    /// Platform returned no image URL or data
    NoImage,
    /// URL is present but not an absolute http(s) URL
    InvalidUrl { url: String },
    /// Filesystem entry could not be inspected
    Unreadable { reason: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotAnImage { detail } => write!(f, "not an image ({})", detail),
            SkipReason::NoImage => write!(f, "no image data"),
            SkipReason::InvalidUrl { url } => write!(f, "invalid URL: {}", url),
            SkipReason::Unreadable { reason } => write!(f, "unreadable: {}", reason),
        }
    }
}

/// A listed entry that will not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAsset {
    pub identity: String,
    pub reason: SkipReason,
}

/// Result of listing a source
#[derive(Debug, Default)]
pub struct AssetListing {
    /// Assets to fetch and fingerprint
    pub assets: Vec<AssetRef>,
    /// Entries excluded up front, with reasons
    pub skipped: Vec<SkippedAsset>,
}

impl AssetListing {
    fn skip(&mut self, identity: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedAsset {
            identity: identity.into(),
            reason,
        });
    }
}

/// Capability interface implemented once per inventory.
///
/// Listing failures are fatal for the run; fetch failures only fail one
/// asset.
pub trait AssetSource: Send + Sync {
    /// Which inventory this is
    fn kind(&self) -> SourceKind;

    /// Human-readable locator (folder path, account id, ...)
    fn locator(&self) -> String;

    /// Column layout of the dataset this source produces
    fn schema(&self) -> TableSchema {
        self.kind().schema()
    }

    /// List every asset, following pagination to the end
    fn list_assets(&self) -> Result<AssetListing, SourceError>;

    /// Retrieve the raw bytes of one asset
    fn fetch(&self, asset: &AssetRef) -> Result<Vec<u8>, FetchError>;

    /// Minimum pause between fetches on one worker
    fn request_interval(&self) -> Duration {
        Duration::ZERO
    }
}
