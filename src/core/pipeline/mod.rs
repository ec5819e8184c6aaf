//! # Pipeline Module
//!
//! Orchestrates one fingerprinting run over an asset source.
//!
//! ## Pipeline Stages
//! 1. **List** - Ask the source for every asset (fatal on failure)
//! 2. **Fetch** - Bounded pool of I/O workers pulls bytes
//! 3. **Hash** - rayon pool decodes, normalizes and fingerprints
//! 4. **Collect** - One collector appends each record to the dataset and
//!    flushes it to the CSV sink
//!
//! Every listed asset yields exactly one outcome: hashed, fetch failure,
//! decode failure, or not started after cancellation.

mod executor;

pub use executor::{
    AssetFailure, CancellationToken, FingerprintRun, FingerprintSummary, Pipeline, PipelineBuilder,
    PipelineConfig, DEFAULT_FETCH_WORKERS,
};
