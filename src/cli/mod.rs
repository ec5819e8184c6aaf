//! # CLI Module
//!
//! Command-line interface for the creative ghost finder.
//!
//! ## Usage
//! ```bash
//! # Fingerprint a local folder of creatives
//! ghost-finder local ./creatives
//!
//! # Fingerprint Meta ad creatives (META_ACCESS_TOKEN must be set)
//! ghost-finder meta 1234567890
//!
//! # Meta and Google Ads into one dataset, with a per-platform breakdown
//! ghost-finder platforms --meta-account 1234567890 --google-customer 123-456-7890
//!
//! # Find local creatives that are not on Meta
//! ghost-finder match local_creative_hashes.csv platform_creative_hashes_META.csv
//!
//! # Tolerate small re-encoding differences, JSON output
//! ghost-finder match local.csv meta.csv google.csv --max-distance 4 --format json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use creative_ghost_finder::core::fingerprint::{fingerprint_width, AlgorithmKind, FingerprintConfig, DEFAULT_HASH_SIZE};
use creative_ghost_finder::core::matcher::{MatchConfig, Matcher};
use creative_ghost_finder::core::pipeline::{FingerprintSummary, Pipeline, DEFAULT_FETCH_WORKERS};
use creative_ghost_finder::core::reporter::{
    render_pretty, write_csv, write_json, DatasetInfo, MatchReport, ReportFormat,
};
use creative_ghost_finder::core::source::{
    AdPlatformsSource, AssetSource, DriveCredentials, DriveSource, GoogleAdsCredentials,
    GoogleAdsSource, LocalFolderConfig, LocalFolderSource, MetaCredentials, MetaSource,
};
use creative_ghost_finder::core::store::{disambiguate_labels, load_dataset, sample, LoadedDataset};
use creative_ghost_finder::error::{GhostFinderError, Result};
use creative_ghost_finder::events::{Event, EventChannel, FingerprintEvent, MatchEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

/// Creative Ghost Finder - find creatives that never made it to the ad platforms
#[derive(Parser, Debug)]
#[command(name = "ghost-finder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fingerprint images in a local folder
    Local {
        /// Folder containing creatives
        folder: PathBuf,

        /// Descend into subfolders
        #[arg(long)]
        recursive: bool,

        /// Include hidden files
        #[arg(long)]
        include_hidden: bool,

        #[command(flatten)]
        options: FingerprintOptions,
    },

    /// Fingerprint images in a Google Drive folder
    Drive {
        /// Drive folder id
        folder_id: String,

        /// Saved OAuth token JSON (otherwise GOOGLE_DRIVE_ACCESS_TOKEN)
        #[arg(long)]
        token_file: Option<PathBuf>,

        #[command(flatten)]
        options: FingerprintOptions,
    },

    /// Fingerprint Meta ad creatives (META_ACCESS_TOKEN)
    Meta {
        /// Ad account id, with or without the act_ prefix
        ad_account_id: String,

        #[command(flatten)]
        options: FingerprintOptions,
    },

    /// Fingerprint Google Ads image assets (GOOGLE_ADS_ACCESS_TOKEN, GOOGLE_ADS_DEVELOPER_TOKEN)
    GoogleAds {
        /// Customer id, dashes allowed
        customer_id: String,

        #[command(flatten)]
        options: FingerprintOptions,
    },

    /// Fingerprint Meta and Google Ads creatives into one dataset
    Platforms {
        /// Meta ad account id
        #[arg(long, required_unless_present = "google_customer")]
        meta_account: Option<String>,

        /// Google Ads customer id
        #[arg(long)]
        google_customer: Option<String>,

        #[command(flatten)]
        options: FingerprintOptions,
    },

    /// Classify every subject record as matched or ghost
    Match {
        /// Dataset to evaluate
        subject: PathBuf,

        /// Datasets to check against
        #[arg(required = true)]
        references: Vec<PathBuf>,

        /// Largest Hamming distance still counted as a match (0 = exact)
        #[arg(long, default_value = "0")]
        max_distance: u32,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,

        /// Also write the report to this file (.json or .csv)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Hash size the datasets were built with
        #[arg(long, default_value_t = DEFAULT_HASH_SIZE)]
        hash_size: u32,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write demo datasets (4 matches, 1 ghost on each side)
    Sample {
        /// Directory to write into
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

/// Options shared by every fingerprinting command
#[derive(Args, Debug)]
struct FingerprintOptions {
    /// Output CSV file (defaults per source)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Hash algorithm to use
    #[arg(short, long, default_value = "perceptual")]
    algorithm: Algorithm,

    /// Bits per side of the hash (8 gives 16 hex chars)
    #[arg(long, default_value_t = DEFAULT_HASH_SIZE)]
    hash_size: u32,

    /// Concurrent downloads
    #[arg(long, default_value_t = DEFAULT_FETCH_WORKERS)]
    fetch_workers: usize,

    /// Hashing threads (default: one per core)
    #[arg(long)]
    hash_threads: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Perceptual Hash - DCT based (default)
    Perceptual,
    /// Difference Hash - gradient based
    Difference,
    /// Average Hash - fastest
    Average,
}

impl From<Algorithm> for AlgorithmKind {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Perceptual => AlgorithmKind::Perceptual,
            Algorithm::Difference => AlgorithmKind::Difference,
            Algorithm::Average => AlgorithmKind::Average,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// One CSV row per subject record
    Csv,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Pretty => ReportFormat::Pretty,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Csv => ReportFormat::Csv,
        }
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Local {
            folder,
            recursive,
            include_hidden,
            options,
        } => {
            init(&options);
            let config = LocalFolderConfig {
                recursive,
                include_hidden,
                ..Default::default()
            };
            run_fingerprint(&LocalFolderSource::new(folder, config), &options)
        }
        Commands::Drive {
            folder_id,
            token_file,
            options,
        } => {
            init(&options);
            let credentials = match token_file {
                Some(path) => DriveCredentials::from_token_file(&path)?,
                None => DriveCredentials::from_env()?,
            };
            run_fingerprint(&DriveSource::new(folder_id, credentials)?, &options)
        }
        Commands::Meta {
            ad_account_id,
            options,
        } => {
            init(&options);
            let credentials = MetaCredentials::from_env()?;
            run_fingerprint(&MetaSource::new(&ad_account_id, credentials)?, &options)
        }
        Commands::GoogleAds {
            customer_id,
            options,
        } => {
            init(&options);
            let credentials = GoogleAdsCredentials::from_env()?;
            run_fingerprint(&GoogleAdsSource::new(&customer_id, credentials)?, &options)
        }
        Commands::Platforms {
            meta_account,
            google_customer,
            options,
        } => {
            init(&options);
            let mut platforms: Vec<Box<dyn AssetSource>> = Vec::new();
            if let Some(account) = meta_account {
                let credentials = MetaCredentials::from_env()?;
                platforms.push(Box::new(MetaSource::new(&account, credentials)?));
            }
            if let Some(customer) = google_customer {
                let credentials = GoogleAdsCredentials::from_env()?;
                platforms.push(Box::new(GoogleAdsSource::new(&customer, credentials)?));
            }
            run_fingerprint(&AdPlatformsSource::new(platforms)?, &options)
        }
        Commands::Match {
            subject,
            references,
            max_distance,
            format,
            report,
            hash_size,
            verbose,
        } => {
            creative_ghost_finder::init_tracing(verbose);
            run_match(
                &subject,
                &references,
                MatchConfig::new().max_distance(max_distance),
                format.into(),
                report.as_deref(),
                hash_size,
                verbose,
            )
        }
        Commands::Sample { dir } => {
            creative_ghost_finder::init_tracing(false);
            run_sample(&dir)
        }
    }
}

fn init(options: &FingerprintOptions) {
    creative_ghost_finder::init_tracing(options.verbose);
}

fn run_fingerprint(source: &dyn AssetSource, options: &FingerprintOptions) -> Result<()> {
    let term = Term::stderr();

    term.write_line(&format!(
        "{} {}",
        style("Creative Ghost Finder").bold().cyan(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line(&format!(
        "Fingerprinting {} {}",
        style(source.kind()).bold(),
        style(source.locator()).dim()
    ))
    .ok();

    let generator = FingerprintConfig::new()
        .algorithm(options.algorithm.into())
        .hash_size(options.hash_size)
        .build()?;

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(source.kind().default_output()));

    let pipeline = Pipeline::builder()
        .fetch_workers(options.fetch_workers)
        .hash_threads(options.hash_threads)
        .build();

    // Ctrl-C stops feeding new assets; the run still ends with its summary
    let token = pipeline.cancellation_token();
    if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let (sender, receiver) = EventChannel::new();

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    let progress_clone = progress.clone();
    let verbose = options.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Fingerprint(FingerprintEvent::Started { total_assets, .. }) => {
                    progress_clone.set_length(total_assets as u64);
                }
                Event::Fingerprint(FingerprintEvent::Progress(p)) => {
                    progress_clone.set_position(p.completed as u64);
                    progress_clone.set_message(p.current_identity);
                }
                Event::Fingerprint(FingerprintEvent::AssetFailed {
                    identity,
                    stage,
                    message,
                }) if verbose => {
                    progress_clone.println(format!(
                        "  {} {} ({} failed: {})",
                        style("✗").red(),
                        identity,
                        stage,
                        message
                    ));
                }
                Event::Fingerprint(FingerprintEvent::Completed { .. }) => {
                    progress_clone.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(source, &generator, &output, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    progress.finish_and_clear();

    let run = result?;
    print_fingerprint_summary(&term, &run.summary, verbose);

    conclude(&run.summary)
}

/// A cancelled run still fails the process once its summary is out
fn conclude(summary: &FingerprintSummary) -> Result<()> {
    if summary.cancelled {
        return Err(GhostFinderError::Interrupted {
            processed: summary.processed,
            output: summary.output.clone(),
        });
    }
    Ok(())
}

fn print_fingerprint_summary(term: &Term, summary: &FingerprintSummary, verbose: bool) {
    term.write_line("").ok();
    if summary.cancelled {
        term.write_line(&format!("{} Fingerprinting cancelled", style("✗").yellow().bold()))
            .ok();
    } else {
        term.write_line(&format!("{} Fingerprinting complete", style("✓").green().bold()))
            .ok();
    }
    term.write_line(&format!(
        "  {} processed in {:.1}s",
        style(summary.processed).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} skipped", style(summary.skipped.len()).dim())).ok();
    term.write_line(&format!(
        "  {} failed ({} fetch, {} decode)",
        style(summary.failed()).red(),
        summary.fetch_failures.len(),
        summary.decode_failures.len()
    ))
    .ok();
    if summary.not_started > 0 {
        term.write_line(&format!("  {} not started", summary.not_started)).ok();
    }
    if !summary.by_platform.is_empty() {
        term.write_line("  Platform breakdown:").ok();
        for (platform, count) in &summary.by_platform {
            term.write_line(&format!("    {}: {} creatives", platform, style(count).cyan()))
                .ok();
        }
    }

    if verbose {
        for skipped in &summary.skipped {
            term.write_line(&format!(
                "    {} {} ({})",
                style("-").dim(),
                skipped.identity,
                skipped.reason
            ))
            .ok();
        }
    }

    term.write_line(&format!(
        "  Saved {} records to {}",
        summary.processed,
        style(summary.output.display()).bold()
    ))
    .ok();
}

fn load(path: &Path, hash_size: u32) -> Result<LoadedDataset> {
    let loaded = load_dataset(path, fingerprint_width(hash_size))?;

    for rejection in &loaded.rejected {
        tracing::warn!(
            file = %path.display(),
            line = rejection.line,
            identity = rejection.identity.as_deref().unwrap_or(""),
            error = %rejection.error,
            "Rejected row"
        );
    }

    Ok(loaded)
}

fn run_match(
    subject_path: &Path,
    reference_paths: &[PathBuf],
    config: MatchConfig,
    format: ReportFormat,
    report_path: Option<&Path>,
    hash_size: u32,
    verbose: bool,
) -> Result<()> {
    creative_ghost_finder::core::fingerprint::validate_hash_size(hash_size)?;

    let (sender, receiver) = EventChannel::new();
    let term = Term::stderr();

    // Every dataset loads before any matching starts
    let mut subject = load(subject_path, hash_size)?;
    let mut references = Vec::with_capacity(reference_paths.len());
    for path in reference_paths {
        references.push(load(path, hash_size)?);
    }

    // `a/meta.csv` and `b/meta.csv` would otherwise both report as `meta`
    disambiguate_labels(
        std::iter::once(&mut subject.dataset).chain(references.iter_mut().map(|l| &mut l.dataset)),
    );

    for (path, loaded) in std::iter::once((subject_path, &subject))
        .chain(reference_paths.iter().map(PathBuf::as_path).zip(references.iter()))
    {
        sender.send(Event::Match(MatchEvent::DatasetLoaded {
            label: loaded.dataset.label().to_string(),
            records: loaded.dataset.len(),
            rejected: loaded.rejected.len(),
        }));
        if matches!(format, ReportFormat::Pretty) {
            term.write_line(&format!(
                "Loaded {} records from {}",
                style(loaded.dataset.len()).cyan(),
                path.display()
            ))
            .ok();
        }
    }

    let reference_sets: Vec<_> = references.iter().map(|l| l.dataset.clone()).collect();
    let output = Matcher::new(config).match_with_events(&subject.dataset, &reference_sets, &sender)?;
    drop(sender);
    for event in receiver.iter() {
        tracing::debug!(?event, "Match event");
    }

    let report = MatchReport::new(
        DatasetInfo::from_loaded(subject_path, &subject),
        reference_paths
            .iter()
            .zip(references.iter())
            .map(|(path, loaded)| DatasetInfo::from_loaded(path, loaded))
            .collect(),
        output,
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        ReportFormat::Pretty => render_pretty(&report, &mut out, verbose)
            .map_err(|e| GhostFinderError::Report(e.to_string()))?,
        ReportFormat::Json => {
            write_json(&report, &mut out)?;
            writeln!(out).ok();
        }
        ReportFormat::Csv => write_csv(&report, &mut out)?,
    }

    if let Some(path) = report_path {
        write_report_file(&report, path)?;
        if matches!(format, ReportFormat::Pretty) {
            term.write_line(&format!("Report written to {}", style(path.display()).bold()))
                .ok();
        }
    }

    Ok(())
}

fn write_report_file(report: &MatchReport, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| GhostFinderError::Report(format!("{}: {}", path.display(), e)))?;
    let writer = BufWriter::new(file);

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        write_csv(report, writer)
    } else {
        write_json(report, writer)
    }
}

fn run_sample(dir: &Path) -> Result<()> {
    let (local, meta) = sample::write_samples(dir)?;
    let term = Term::stderr();

    term.write_line(&format!("{} Created {}", style("✓").green(), local.display())).ok();
    term.write_line(&format!("{} Created {}", style("✓").green(), meta.display())).ok();
    term.write_line("  5 local creatives, 5 Meta creatives, 4 shared fingerprints").ok();
    term.write_line(&format!(
        "  Try: ghost-finder match {} {}",
        local.display(),
        meta.display()
    ))
    .ok();

    Ok(())
}
