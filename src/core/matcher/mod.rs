//! # Matcher Module
//!
//! Classifies every record of a subject dataset as Matched or Ghost
//! against the union of one or more reference datasets.
//!
//! ## How It Works
//! 1. Check that every dataset shares one fingerprint width
//! 2. Index reference fingerprints by band
//! 3. For each subject record, compare against band candidates
//! 4. Keep every accepted reference, ordered by distance then reference order
//!
//! Matching is directional: a subject record matched by some reference
//! says nothing about that reference being matched back.
//!
//! ## Example
//! ```rust,ignore
//! let outcome = Matcher::new(MatchConfig::new().max_distance(0))
//!     .match_datasets(&local, &[meta, google])?;
//! println!("{} ghosts", outcome.summary.ghosts);
//! ```

mod index;
mod strategy;

pub use strategy::{strategy_for, ExactMatch, HammingThreshold, MatchStrategy};

use crate::core::store::{FingerprintDataset, FingerprintRecord};
use crate::error::{ConfigurationError, MatchError, Result};
use crate::events::{null_sender, Event, EventSender, MatchEvent};
use index::BandIndex;
use serde::{Deserialize, Serialize};

/// Configuration for the matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchConfig {
    /// Largest Hamming distance counted as a match; 0 means exact
    pub max_distance: u32,
}

impl MatchConfig {
    /// Exact matching
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distance tolerance
    pub fn max_distance(mut self, max_distance: u32) -> Self {
        self.max_distance = max_distance;
        self
    }
}

/// One reference row a subject record matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMatch {
    /// Label of the reference dataset
    pub dataset: String,
    /// Identity of the reference row
    pub identity: String,
    /// Hamming distance in bits
    pub distance: u32,
}

/// Classification of one subject record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "references", rename_all = "lowercase")]
pub enum MatchOutcome {
    /// Present in the reference set; never empty
    Matched(Vec<ReferenceMatch>),
    /// No reference fingerprint accepted
    Ghost,
}

impl MatchOutcome {
    pub fn is_ghost(&self) -> bool {
        matches!(self, MatchOutcome::Ghost)
    }

    /// Matched references, empty for ghosts
    pub fn references(&self) -> &[ReferenceMatch] {
        match self {
            MatchOutcome::Matched(refs) => refs,
            MatchOutcome::Ghost => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchOutcome::Matched(_) => "matched",
            MatchOutcome::Ghost => "ghost",
        }
    }
}

/// A subject record with its classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub record: FingerprintRecord,
    pub outcome: MatchOutcome,
}

/// Counts for one matching run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub subject_records: usize,
    pub reference_records: usize,
    pub matched: usize,
    pub ghosts: usize,
    pub max_distance: u32,
}

/// Results in subject order plus counts
#[derive(Debug, Clone)]
pub struct MatchOutput {
    pub results: Vec<MatchResult>,
    pub summary: MatchSummary,
}

impl MatchOutput {
    /// Ghost records in subject order
    pub fn ghosts(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter().filter(|r| r.outcome.is_ghost())
    }

    /// Matched records in subject order
    pub fn matched(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter().filter(|r| !r.outcome.is_ghost())
    }
}

/// Classifies subject records against reference datasets
pub struct Matcher {
    strategy: Box<dyn MatchStrategy>,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self::with_strategy(strategy_for(config.max_distance))
    }

    /// Use a custom strategy
    pub fn with_strategy(strategy: Box<dyn MatchStrategy>) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &dyn MatchStrategy {
        self.strategy.as_ref()
    }

    pub fn match_datasets(
        &self,
        subject: &FingerprintDataset,
        references: &[FingerprintDataset],
    ) -> Result<MatchOutput> {
        self.match_with_events(subject, references, &null_sender())
    }

    /// Classify every subject record. Datasets are only borrowed.
    pub fn match_with_events(
        &self,
        subject: &FingerprintDataset,
        references: &[FingerprintDataset],
        events: &EventSender,
    ) -> Result<MatchOutput> {
        let max_distance = self.strategy.max_distance();
        let width = common_width(subject, references)?;

        if let Some(width) = width {
            let max_bits = (width * 4) as u32;
            if max_distance > max_bits {
                return Err(MatchError::InvalidThreshold {
                    value: max_distance,
                    max_bits,
                }
                .into());
            }
        }

        let index = BandIndex::build(references, width.unwrap_or(0), max_distance);

        events.send(Event::Match(MatchEvent::Started {
            subject_records: subject.len(),
            reference_records: index.len(),
        }));
        tracing::info!(
            subject = subject.label(),
            subject_records = subject.len(),
            reference_records = index.len(),
            strategy = %self.strategy.description(),
            linear_scan = index.is_linear(),
            "Matching"
        );

        let results: Vec<MatchResult> = subject
            .iter()
            .map(|record| MatchResult {
                record: record.clone(),
                outcome: self.classify(record, &index),
            })
            .collect();

        let ghosts = results.iter().filter(|r| r.outcome.is_ghost()).count();
        let summary = MatchSummary {
            subject_records: results.len(),
            reference_records: index.len(),
            matched: results.len() - ghosts,
            ghosts,
            max_distance,
        };

        events.send(Event::Match(MatchEvent::Completed {
            matched: summary.matched,
            ghosts: summary.ghosts,
        }));

        Ok(MatchOutput { results, summary })
    }

    fn classify(&self, record: &FingerprintRecord, index: &BandIndex<'_>) -> MatchOutcome {
        let fingerprint = record.fingerprint();

        let mut hits: Vec<(u32, usize)> = index
            .candidates(fingerprint)
            .into_iter()
            .filter_map(|idx| {
                let distance = fingerprint.distance(index.row(idx).record.fingerprint());
                self.strategy.accepts(distance).then_some((distance, idx))
            })
            .collect();

        if hits.is_empty() {
            return MatchOutcome::Ghost;
        }

        // Row index order is dataset order, then row order
        hits.sort_unstable();

        MatchOutcome::Matched(
            hits.into_iter()
                .map(|(distance, idx)| {
                    let row = index.row(idx);
                    ReferenceMatch {
                        dataset: row.dataset.to_string(),
                        identity: row.record.identity().to_string(),
                        distance,
                    }
                })
                .collect(),
        )
    }
}

/// The single fingerprint width shared by every non-empty dataset
fn common_width(
    subject: &FingerprintDataset,
    references: &[FingerprintDataset],
) -> std::result::Result<Option<usize>, ConfigurationError> {
    let mut expected: Option<usize> = None;

    for dataset in std::iter::once(subject).chain(references.iter()) {
        for record in dataset.iter() {
            let actual = record.fingerprint().width();
            match expected {
                None => expected = Some(actual),
                Some(width) if width != actual => {
                    return Err(ConfigurationError::WidthMismatch {
                        dataset: dataset.label().to_string(),
                        expected: width,
                        actual,
                    });
                }
                Some(_) => {}
            }
        }
    }

    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::Fingerprint;
    use crate::core::store::{Metadata, TableSchema};
    use crate::error::GhostFinderError;

    fn dataset(label: &str, rows: &[(&str, &str)]) -> FingerprintDataset {
        FingerprintDataset::from_records(
            label,
            TableSchema::local_folder(),
            rows.iter().map(|(id, hash)| {
                FingerprintRecord::new(*id, Fingerprint::parse(hash).unwrap(), Metadata::new())
            }),
        )
    }

    fn exact() -> Matcher {
        Matcher::new(MatchConfig::new())
    }

    #[test]
    fn identical_fingerprint_is_matched() {
        let a = dataset("local", &[("f1", "9a65659a9a65659a")]);
        let b = dataset("meta", &[("p1", "9a65659a9a65659a")]);

        let output = exact().match_datasets(&a, &[b]).unwrap();

        assert_eq!(
            output.results[0].outcome,
            MatchOutcome::Matched(vec![ReferenceMatch {
                dataset: "meta".to_string(),
                identity: "p1".to_string(),
                distance: 0,
            }])
        );
        assert_eq!(output.summary.matched, 1);
    }

    #[test]
    fn unrelated_fingerprint_is_ghost() {
        let a = dataset("local", &[("f2", "123456789abcdef0")]);
        let b = dataset("meta", &[("p2", "abcdef1234567890")]);

        let output = exact().match_datasets(&a, &[b]).unwrap();

        assert!(output.results[0].outcome.is_ghost());
        assert_eq!(output.summary.ghosts, 1);
    }

    #[test]
    fn empty_reference_makes_everything_ghost() {
        let a = dataset(
            "local",
            &[
                ("a", "0000000000000001"),
                ("b", "0000000000000002"),
                ("c", "0000000000000003"),
                ("d", "0000000000000004"),
                ("e", "0000000000000005"),
            ],
        );
        let b = dataset("meta", &[]);

        let output = exact().match_datasets(&a, &[b]).unwrap();

        assert_eq!(output.summary.ghosts, 5);
        assert_eq!(output.summary.matched, 0);
    }

    #[test]
    fn every_subject_record_gets_exactly_one_class() {
        let a = dataset(
            "local",
            &[
                ("a", "9a65659a9a65659a"),
                ("b", "cb2434dbcb2434db"),
                ("c", "ffff0000ffff0000"),
            ],
        );
        let b = dataset("meta", &[("x", "cb2434dbcb2434db"), ("y", "9a65659a9a65659a")]);

        let output = exact().match_datasets(&a, &[b]).unwrap();

        assert_eq!(output.results.len(), a.len());
        assert_eq!(output.summary.matched + output.summary.ghosts, a.len());
        assert_eq!(output.matched().count(), 2);
        assert_eq!(output.ghosts().count(), 1);
    }

    #[test]
    fn results_follow_subject_order() {
        let a = dataset("local", &[("z", "ffff0000ffff0000"), ("a", "9a65659a9a65659a")]);
        let b = dataset("meta", &[("p", "9a65659a9a65659a")]);

        let output = exact().match_datasets(&a, &[b]).unwrap();
        let ids: Vec<_> = output.results.iter().map(|r| r.record.identity()).collect();

        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn matching_is_not_symmetric() {
        let a = dataset("local", &[("f1", "9a65659a9a65659a")]);
        let b = dataset(
            "meta",
            &[("p1", "9a65659a9a65659a"), ("p2", "abcdef1234567890")],
        );

        let forward = exact().match_datasets(&a, &[b.clone()]).unwrap();
        let backward = exact().match_datasets(&b, &[a]).unwrap();

        assert_eq!(forward.summary.ghosts, 0);
        assert_eq!(backward.summary.ghosts, 1);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let a = dataset("local", &[("a", "9a65659a9a65659a"), ("b", "0000000000000000")]);
        let refs = vec![
            dataset("meta", &[("m", "9a65659a9a65659a")]),
            dataset("google", &[("g", "9a65659a9a65659a")]),
        ];

        let first = exact().match_datasets(&a, &refs).unwrap();
        let second = exact().match_datasets(&a, &refs).unwrap();

        let outcomes = |o: &MatchOutput| o.results.iter().map(|r| r.outcome.clone()).collect::<Vec<_>>();
        assert_eq!(outcomes(&first), outcomes(&second));
    }

    #[test]
    fn all_sharing_references_are_listed_in_reference_order() {
        let a = dataset("local", &[("f1", "9a65659a9a65659a")]);
        let refs = vec![
            dataset("meta", &[("m1", "9a65659a9a65659a"), ("m2", "9a65659a9a65659a")]),
            dataset("google", &[("g1", "9a65659a9a65659a")]),
        ];

        let output = exact().match_datasets(&a, &refs).unwrap();
        let listed: Vec<_> = output.results[0]
            .outcome
            .references()
            .iter()
            .map(|r| (r.dataset.as_str(), r.identity.as_str()))
            .collect();

        assert_eq!(listed, vec![("meta", "m1"), ("meta", "m2"), ("google", "g1")]);
    }

    #[test]
    fn near_duplicate_diverges_between_exact_and_threshold() {
        let a = dataset("local", &[("f1", "9a65659a9a65659a")]);
        let b = dataset("meta", &[("p1", "9a65659a9a65659b")]);

        let exact_output = exact().match_datasets(&a, &[b.clone()]).unwrap();
        assert!(exact_output.results[0].outcome.is_ghost());

        let tolerant = Matcher::new(MatchConfig::new().max_distance(1))
            .match_datasets(&a, &[b])
            .unwrap();
        assert_eq!(tolerant.results[0].outcome.references()[0].distance, 1);
    }

    #[test]
    fn threshold_orders_by_distance_first() {
        let a = dataset("local", &[("f1", "0000000000000000")]);
        let b = dataset(
            "meta",
            &[("far", "0000000000000003"), ("near", "0000000000000001")],
        );

        let output = Matcher::new(MatchConfig::new().max_distance(2))
            .match_datasets(&a, &[b])
            .unwrap();
        let ids: Vec<_> = output.results[0]
            .outcome
            .references()
            .iter()
            .map(|r| r.identity.as_str())
            .collect();

        assert_eq!(ids, vec!["near", "far"]);
    }

    #[test]
    fn width_mismatch_is_fatal() {
        let a = dataset("local", &[("f1", "9a65659a9a65659a")]);
        let b = dataset("meta", &[("p1", "9a65659a")]);

        let err = exact().match_datasets(&a, &[b]).unwrap_err();
        assert!(matches!(
            err,
            GhostFinderError::Config(ConfigurationError::WidthMismatch { expected: 16, actual: 8, .. })
        ));
    }

    #[test]
    fn threshold_above_bit_count_is_rejected() {
        let a = dataset("local", &[("f1", "9a65659a9a65659a")]);
        let b = dataset("meta", &[("p1", "9a65659a9a65659a")]);

        let err = Matcher::new(MatchConfig::new().max_distance(65))
            .match_datasets(&a, &[b])
            .unwrap_err();
        assert!(matches!(
            err,
            GhostFinderError::Match(MatchError::InvalidThreshold { value: 65, max_bits: 64 })
        ));
    }

    #[test]
    fn threshold_wider_than_band_count_still_finds_matches() {
        let a = dataset("local", &[("f1", "0000000000000000")]);
        let b = dataset("meta", &[("p1", "ffffffffffffffff")]);

        let output = Matcher::new(MatchConfig::new().max_distance(64))
            .match_datasets(&a, &[b])
            .unwrap();
        assert_eq!(output.results[0].outcome.references()[0].distance, 64);
    }
}
