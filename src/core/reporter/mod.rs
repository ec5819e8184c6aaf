//! # Reporter Module
//!
//! Turns a matching run into something people can act on.
//!
//! The ghost list is the point of the tool: every subject creative that
//! never made it to (or is no longer on) the ad platforms, with enough
//! metadata to find it again.
//!
//! ## Formats
//! 1. **Pretty**: terminal summary plus ghost details
//! 2. **JSON**: full report for scripting
//! 3. **CSV**: one row per subject record

mod export;
mod pretty;

pub use export::{write_csv, write_json, ReportFormat};
pub use pretty::render_pretty;

use crate::core::matcher::{MatchOutput, MatchResult, MatchSummary};
use crate::core::store::LoadedDataset;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One dataset that took part in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub label: String,
    pub path: PathBuf,
    /// Rows loaded
    pub records: usize,
    /// Rows excluded by validation
    pub rejected: usize,
}

impl DatasetInfo {
    pub fn from_loaded(path: &Path, loaded: &LoadedDataset) -> Self {
        Self {
            label: loaded.dataset.label().to_string(),
            path: path.to_path_buf(),
            records: loaded.dataset.len(),
            rejected: loaded.rejected.len(),
        }
    }
}

/// Complete report for one matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub generated_at: DateTime<Utc>,
    pub subject: DatasetInfo,
    pub references: Vec<DatasetInfo>,
    pub summary: MatchSummary,
    pub results: Vec<MatchResult>,
}

impl MatchReport {
    pub fn new(subject: DatasetInfo, references: Vec<DatasetInfo>, output: MatchOutput) -> Self {
        Self {
            generated_at: Utc::now(),
            subject,
            references,
            summary: output.summary,
            results: output.results,
        }
    }

    /// Ghost records in subject order
    pub fn ghosts(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter().filter(|r| r.outcome.is_ghost())
    }

    /// Rows rejected on load across every dataset
    pub fn rejected_rows(&self) -> usize {
        self.subject.rejected + self.references.iter().map(|r| r.rejected).sum::<usize>()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::sample_report;

    #[test]
    fn report_exposes_ghosts_and_rejections() {
        let report = sample_report();

        let ghosts: Vec<_> = report.ghosts().map(|r| r.record.identity()).collect();
        assert_eq!(ghosts, vec!["unused.jpg"]);
        assert_eq!(report.rejected_rows(), 1);
        assert_eq!(report.summary.matched + report.summary.ghosts, report.results.len());
    }
}
