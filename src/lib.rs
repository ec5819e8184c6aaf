//! # Creative Ghost Finder
//!
//! Finds "ghost" ad creatives: images in a local folder or Google Drive
//! that have no perceptual match on the ad platforms (or the reverse).
//!
//! ## How It Works
//! - Fingerprint every creative of one inventory into a CSV dataset
//! - Load two or more datasets and classify each subject record as
//!   Matched or Ghost against the references
//!
//! ## Architecture
//! - `core` - Sources, fingerprinting, datasets, matching and reports
//! - `events` - Event-driven progress reporting
//! - `error` - Error types per failure class

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{GhostFinderError, Result};

/// Initialize tracing for the application.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when verbose.
/// Logs go to stderr so stdout stays clean for JSON and CSV output.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
