//! # Core Module
//!
//! The UI-agnostic ghost detection engine.
//!
//! ## Modules
//! - `source` - Lists and fetches creatives from folders, Drive and ad platforms
//! - `fingerprint` - Computes perceptual fingerprints
//! - `store` - Datasets of fingerprint records and their CSV form
//! - `pipeline` - Runs source → fingerprint → store with bounded worker pools
//! - `matcher` - Classifies subject records as Matched or Ghost
//! - `reporter` - Renders match reports

pub mod fingerprint;
pub mod matcher;
pub mod pipeline;
pub mod reporter;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use fingerprint::{AlgorithmKind, Fingerprint, FingerprintConfig, FingerprintGenerator};
pub use matcher::{MatchConfig, MatchOutcome, MatchResult, Matcher};
pub use pipeline::{FingerprintSummary, Pipeline};
pub use reporter::MatchReport;
pub use source::{AssetSource, SourceKind};
pub use store::{FingerprintDataset, FingerprintRecord};
