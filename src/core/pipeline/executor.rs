//! Pipeline execution implementation.

use crate::core::fingerprint::FingerprintGenerator;
use crate::core::source::{AssetRef, AssetSource, ImageAsset, SkippedAsset};
use crate::core::store::{CsvSink, FingerprintDataset, FingerprintRecord};
use crate::error::{ConfigurationError, DecodeError, FetchError, GhostFinderError};
use crate::events::{
    null_sender, Event, EventSender, FailureStage, FingerprintEvent, FingerprintProgress,
};
use crossbeam_channel::{bounded, unbounded, Sender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default number of concurrent fetches
pub const DEFAULT_FETCH_WORKERS: usize = 4;

/// Cooperative cancellation flag shared with a running pipeline.
///
/// Cancelling stops new assets from being fed and queued assets from being
/// fetched; assets already fetched finish and their rows stay on disk.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Threads fetching bytes from the source
    pub fetch_workers: usize,
    /// Threads decoding and hashing (None = rayon default)
    pub hash_threads: Option<usize>,
    /// Pause between fetches per worker (None = the source's own interval)
    pub request_interval: Option<Duration>,
    /// Capacity of the bounded queues between stages
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_workers: DEFAULT_FETCH_WORKERS,
            hash_threads: None,
            request_interval: None,
            queue_capacity: 64,
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    cancel: Option<CancellationToken>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            cancel: None,
        }
    }

    /// Set the number of fetch workers (at least 1)
    pub fn fetch_workers(mut self, workers: usize) -> Self {
        self.config.fetch_workers = workers.max(1);
        self
    }

    /// Set the number of hashing threads
    pub fn hash_threads(mut self, threads: Option<usize>) -> Self {
        self.config.hash_threads = threads;
        self
    }

    /// Override the source's request interval
    pub fn request_interval(mut self, interval: Duration) -> Self {
        self.config.request_interval = Some(interval);
        self
    }

    /// Set the capacity of the inter-stage queues
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity.max(1);
        self
    }

    /// Share a cancellation token with the caller
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            cancel: self.cancel.unwrap_or_default(),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A per-asset failure that did not stop the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFailure {
    pub identity: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Counts of one fingerprinting run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintSummary {
    /// Assets the source listed as fetchable
    pub listed: usize,
    /// Records hashed and persisted
    pub processed: usize,
    /// Entries excluded at listing time
    pub skipped: Vec<SkippedAsset>,
    pub fetch_failures: Vec<AssetFailure>,
    pub decode_failures: Vec<AssetFailure>,
    /// Listed assets never started because the run was cancelled
    pub not_started: usize,
    /// Processed rows whose identity repeated an earlier row
    pub repeated_identities: usize,
    /// Processed rows per `platform` column value; empty for folder sources
    pub by_platform: BTreeMap<String, usize>,
    pub cancelled: bool,
    pub output: PathBuf,
    pub duration_ms: u64,
}

impl FingerprintSummary {
    /// Failed assets across both stages
    pub fn failed(&self) -> usize {
        self.fetch_failures.len() + self.decode_failures.len()
    }
}

/// Result of pipeline execution
#[derive(Debug)]
pub struct FingerprintRun {
    /// Records in completion order, as written to disk
    pub dataset: FingerprintDataset,
    pub summary: FingerprintSummary,
}

/// Outcome of one asset, sent to the collector
enum AssetOutcome {
    Hashed(FingerprintRecord),
    FetchFailed { identity: String, error: FetchError },
    DecodeFailed { identity: String, error: DecodeError },
}

/// The fingerprinting pipeline: list, fetch, hash, persist
pub struct Pipeline {
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Token that cancels this pipeline
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the pipeline without events
    pub fn run(
        &self,
        source: &dyn AssetSource,
        generator: &FingerprintGenerator,
        output: &Path,
    ) -> Result<FingerprintRun, GhostFinderError> {
        self.run_with_events(source, generator, output, &null_sender())
    }

    /// Run the pipeline with event reporting.
    ///
    /// Listing or sink failures abort the run. Fetch and decode failures
    /// are counted per asset. Every row is flushed as soon as it is hashed.
    pub fn run_with_events(
        &self,
        source: &dyn AssetSource,
        generator: &FingerprintGenerator,
        output: &Path,
        events: &EventSender,
    ) -> Result<FingerprintRun, GhostFinderError> {
        let start_time = Instant::now();

        tracing::info!(source = %source.kind(), locator = %source.locator(), "Listing assets");
        let listing = source.list_assets()?;

        for skipped in &listing.skipped {
            tracing::info!(identity = %skipped.identity, reason = %skipped.reason, "Skipped");
            events.send(Event::Fingerprint(FingerprintEvent::AssetSkipped {
                identity: skipped.identity.clone(),
                reason: skipped.reason.to_string(),
            }));
        }

        let total = listing.assets.len();
        events.send(Event::Fingerprint(FingerprintEvent::Started {
            source: source.kind().to_string(),
            total_assets: total,
        }));

        let schema = source.schema();
        let mut sink = CsvSink::create(output, schema.clone())?;
        let mut dataset = FingerprintDataset::new(dataset_label(output), schema);

        let mut summary = FingerprintSummary {
            listed: total,
            skipped: listing.skipped,
            output: output.to_path_buf(),
            ..Default::default()
        };

        let pool = {
            let mut builder = rayon::ThreadPoolBuilder::new();
            if let Some(threads) = self.config.hash_threads {
                builder = builder.num_threads(threads);
            }
            builder
                .build()
                .map_err(|e| ConfigurationError::InvalidOption(format!("hash threads: {}", e)))?
        };

        let interval = self
            .config
            .request_interval
            .unwrap_or_else(|| source.request_interval());
        let capacity = self.config.queue_capacity;
        let cancel = &self.cancel;

        let (work_tx, work_rx) = bounded::<AssetRef>(capacity);
        let (fetched_tx, fetched_rx) = bounded::<ImageAsset>(capacity);
        let (outcome_tx, outcome_rx) = unbounded::<AssetOutcome>();

        let mut sink_error = None;
        let mut fed = 0usize;
        let abandoned = AtomicUsize::new(0);
        let abandoned_ref = &abandoned;

        thread::scope(|scope| {
            let feeder = scope.spawn(move || {
                let mut sent = 0usize;
                for asset in listing.assets {
                    if cancel.is_cancelled() || work_tx.send(asset).is_err() {
                        break;
                    }
                    sent += 1;
                }
                sent
            });

            for _ in 0..self.config.fetch_workers.max(1) {
                let work_rx = work_rx.clone();
                let fetched_tx = fetched_tx.clone();
                let outcome_tx = outcome_tx.clone();
                scope.spawn(move || {
                    let worker = FetchWorker {
                        source,
                        interval,
                        cancel,
                        abandoned: abandoned_ref,
                    };
                    worker.run(work_rx, fetched_tx, outcome_tx)
                });
            }
            drop(work_rx);
            drop(fetched_tx);

            let hash_tx = outcome_tx.clone();
            scope.spawn(move || {
                pool.install(|| {
                    fetched_rx
                        .into_iter()
                        .par_bridge()
                        .for_each_with(hash_tx, |tx, image| {
                            let identity = image.asset.identity.clone();
                            let outcome = match generator.fingerprint_asset(image) {
                                Ok(record) => AssetOutcome::Hashed(record),
                                Err(error) => AssetOutcome::DecodeFailed { identity, error },
                            };
                            let _ = tx.send(outcome);
                        });
                });
            });
            drop(outcome_tx);

            let mut completed = 0usize;
            for outcome in outcome_rx.iter() {
                completed += 1;

                let identity = match outcome {
                    AssetOutcome::Hashed(record) => {
                        if let Err(e) = sink.append(&record) {
                            tracing::error!(error = %e, "Failed to persist record");
                            sink_error = Some(e);
                            cancel.cancel();
                            break;
                        }

                        tracing::debug!(identity = %record.identity(), fingerprint = %record.fingerprint(), "Hashed");
                        events.send(Event::Fingerprint(FingerprintEvent::AssetHashed {
                            identity: record.identity().to_string(),
                            fingerprint: record.fingerprint().to_string(),
                        }));

                        if let Some(platform) = record.meta("platform") {
                            *summary.by_platform.entry(platform.to_string()).or_default() += 1;
                        }
                        let identity = record.identity().to_string();
                        if !dataset.push(record) {
                            tracing::warn!(identity = %identity, "Identity repeats an earlier row");
                            summary.repeated_identities += 1;
                        }
                        summary.processed += 1;
                        identity
                    }
                    AssetOutcome::FetchFailed { identity, error } => {
                        summary
                            .fetch_failures
                            .push(record_failure(events, &identity, FailureStage::Fetch, &error));
                        identity
                    }
                    AssetOutcome::DecodeFailed { identity, error } => {
                        summary
                            .decode_failures
                            .push(record_failure(events, &identity, FailureStage::Decode, &error));
                        identity
                    }
                };

                events.send(Event::Fingerprint(FingerprintEvent::Progress(FingerprintProgress {
                    completed,
                    total,
                    current_identity: identity,
                })));
            }

            // Unblock stages still sending once the collector has stopped
            drop(outcome_rx);
            fed = feeder.join().unwrap_or(0);
        });

        if let Some(error) = sink_error {
            return Err(error.into());
        }

        summary.cancelled = self.cancel.is_cancelled();
        summary.not_started = total.saturating_sub(fed) + abandoned.load(Ordering::SeqCst);
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        events.send(Event::Fingerprint(FingerprintEvent::Completed {
            processed: summary.processed,
            skipped: summary.skipped.len(),
            fetch_failures: summary.fetch_failures.len(),
            decode_failures: summary.decode_failures.len(),
        }));

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped.len(),
            fetch_failures = summary.fetch_failures.len(),
            decode_failures = summary.decode_failures.len(),
            not_started = summary.not_started,
            output = %output.display(),
            "Fingerprinting finished"
        );

        Ok(FingerprintRun { dataset, summary })
    }
}

/// One I/O worker: pulls asset references, fetches their bytes, hands them
/// to the hash stage
struct FetchWorker<'a> {
    source: &'a dyn AssetSource,
    interval: Duration,
    cancel: &'a CancellationToken,
    /// Queued assets dropped after cancellation
    abandoned: &'a AtomicUsize,
}

impl FetchWorker<'_> {
    fn run(
        &self,
        work: crossbeam_channel::Receiver<AssetRef>,
        fetched: Sender<ImageAsset>,
        outcomes: Sender<AssetOutcome>,
    ) {
        let mut last_fetch: Option<Instant> = None;

        // Keep draining after cancellation so the feeder never blocks
        for asset in work.iter() {
            if let Some(last) = last_fetch {
                let elapsed = last.elapsed();
                if elapsed < self.interval && !self.cancel.is_cancelled() {
                    thread::sleep(self.interval - elapsed);
                }
            }

            if self.cancel.is_cancelled() {
                self.abandoned.fetch_add(1, Ordering::SeqCst);
                continue;
            }
            last_fetch = Some(Instant::now());

            let sent = match self.source.fetch(&asset) {
                Ok(bytes) => fetched.send(ImageAsset { asset, bytes }).is_ok(),
                Err(error) => {
                    let identity = asset.identity;
                    outcomes.send(AssetOutcome::FetchFailed { identity, error }).is_ok()
                }
            };
            if !sent {
                break;
            }
        }
    }
}

fn record_failure(
    events: &EventSender,
    identity: &str,
    stage: FailureStage,
    error: &dyn std::error::Error,
) -> AssetFailure {
    let message = error.to_string();
    tracing::warn!(identity = %identity, stage = %stage, error = %message, "Asset failed");
    events.send(Event::Fingerprint(FingerprintEvent::AssetFailed {
        identity: identity.to_string(),
        stage,
        message: message.clone(),
    }));
    AssetFailure {
        identity: identity.to_string(),
        stage,
        message,
    }
}

/// Dataset label from the output file stem
fn dataset_label(output: &Path) -> String {
    output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}
