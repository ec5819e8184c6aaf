//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Fingerprinting run events
    Fingerprint(FingerprintEvent),
    /// Matching run events
    Match(MatchEvent),
}

/// Events during a fingerprinting run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FingerprintEvent {
    /// Listing finished and fetching has started
    Started { source: String, total_assets: usize },
    /// Progress update after each completed asset
    Progress(FingerprintProgress),
    /// An asset was hashed and persisted
    AssetHashed { identity: String, fingerprint: String },
    /// An asset was skipped before fetching (not an image, no URL, ...)
    AssetSkipped { identity: String, reason: String },
    /// An asset failed but the run continues
    AssetFailed {
        identity: String,
        stage: FailureStage,
        message: String,
    },
    /// The run finished (or was cancelled) with these totals
    Completed {
        processed: usize,
        skipped: usize,
        fetch_failures: usize,
        decode_failures: usize,
    },
}

/// Where a per-asset failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureStage {
    Fetch,
    Decode,
}

/// Progress information during fingerprinting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProgress {
    /// Assets with an outcome so far
    pub completed: usize,
    /// Assets listed for this run
    pub total: usize,
    /// Identity of the asset that just completed
    pub current_identity: String,
}

/// Events during matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchEvent {
    /// A dataset finished loading
    DatasetLoaded {
        label: String,
        records: usize,
        rejected: usize,
    },
    /// Matching has started
    Started {
        subject_records: usize,
        reference_records: usize,
    },
    /// Matching completed
    Completed { matched: usize, ghosts: usize },
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Fetch => write!(f, "fetch"),
            FailureStage::Decode => write!(f, "decode"),
        }
    }
}
