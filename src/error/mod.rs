//! # Error Module
//!
//! Error types for the creative ghost finder.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, identities, URLs, what went wrong
//! - **Separate per-asset from fatal** - decode and fetch failures are
//!   counted and skipped, auth and configuration failures abort the run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum GhostFinderError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    #[error("Fingerprint error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Dataset store error: {0}")]
    Store(#[from] StoreError),

    #[error("Matching error: {0}")]
    Match(#[from] MatchError),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Operation cancelled by user ({processed} records saved to {output})")]
    Interrupted { processed: usize, output: PathBuf },
}

/// An image could not be turned into pixels
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Failed to decode image {identity}: {reason}")]
    Corrupt { identity: String, reason: String },

    #[error("Unsupported image format for {identity}: {format}")]
    UnsupportedFormat { identity: String, format: String },

    #[error("Image is empty: {identity}")]
    Empty { identity: String },
}

/// Raw bytes for one asset could not be retrieved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL for {identity}: {url}")]
    InvalidUrl { identity: String, url: String },

    #[error("No source for {identity} on platform '{platform}'")]
    UnknownPlatform { identity: String, platform: String },

    #[error("Embedded image data for {identity} is not valid base64: {reason}")]
    Embedded { identity: String, reason: String },
}

/// Credentials are missing or were rejected. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing required environment variable: {name}")]
    MissingVariable { name: String },

    #[error("Failed to read token file {path}: {reason}")]
    TokenFile { path: PathBuf, reason: String },

    #[error("{service} rejected the credentials (HTTP {status})")]
    Rejected { service: String, status: u16 },
}

/// A persisted row failed validation on load
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Fingerprint is empty")]
    EmptyFingerprint,

    #[error("Identity is empty")]
    EmptyIdentity,

    #[error("Fingerprint '{value}' has width {actual}, expected {expected}")]
    WrongWidth {
        value: String,
        expected: usize,
        actual: usize,
    },

    #[error("Fingerprint '{value}' contains non-hex characters")]
    NotHex { value: String },

    #[error("Malformed row: {reason}")]
    MalformedRow { reason: String },
}

/// Inputs or options that make a run meaningless. Always fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Dataset file not found: {path}. Run the matching fingerprint command first.")]
    DatasetMissing { path: PathBuf },

    #[error("Failed to read dataset {path}: {reason}")]
    DatasetUnreadable { path: PathBuf, reason: String },

    #[error("Dataset {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Fingerprint width mismatch: {dataset} uses {actual} hex chars, expected {expected}")]
    WidthMismatch {
        dataset: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid hash size: {value} (must be a multiple of 2 between 2 and 32)")]
    InvalidHashSize { value: u32 },

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Listing a source failed. Always fatal.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Folder not found: {path}")]
    FolderNotFound { path: PathBuf },

    #[error("Path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to list {source_name}: {reason}")]
    ListingFailed { source_name: String, reason: String },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Writing a dataset failed
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write dataset {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to create dataset {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Matching could not start
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("Invalid max distance: {value} (must be 0-{max_bits})")]
    InvalidThreshold { value: u32, max_bits: u32 },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, GhostFinderError>;
