//! Machine-readable exports of a match report.

use super::MatchReport;
use crate::core::matcher::ReferenceMatch;
use crate::error::GhostFinderError;
use std::io::Write;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Pretty,
    Json,
    Csv,
}

/// Export the full report as pretty-printed JSON
pub fn write_json<W: Write>(report: &MatchReport, writer: W) -> Result<(), GhostFinderError> {
    serde_json::to_writer_pretty(writer, report)
        .map_err(|e| GhostFinderError::Report(format!("JSON export failed: {}", e)))
}

/// Export one row per subject record
///
/// CSV columns: identity, phash, status, match_count, references
pub fn write_csv<W: Write>(report: &MatchReport, writer: W) -> Result<(), GhostFinderError> {
    let csv_error = |e: csv::Error| GhostFinderError::Report(format!("CSV export failed: {}", e));
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(["identity", "phash", "status", "match_count", "references"])
        .map_err(csv_error)?;

    for result in &report.results {
        let references = result.outcome.references();
        let count = references.len().to_string();
        let listed = format_references(references);
        csv.write_record([
            result.record.identity(),
            result.record.fingerprint().as_str(),
            result.outcome.label(),
            count.as_str(),
            listed.as_str(),
        ])
        .map_err(csv_error)?;
    }

    csv.flush()
        .map_err(|e| GhostFinderError::Report(format!("CSV export failed: {}", e)))
}

/// `dataset:identity@distance` joined by `;`
fn format_references(references: &[ReferenceMatch]) -> String {
    references
        .iter()
        .map(|r| format!("{}:{}@{}", r.dataset, r.identity, r.distance))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reporter::test_support::sample_report;

    #[test]
    fn csv_has_one_row_per_subject_record() {
        let mut buffer = Vec::new();
        write_csv(&sample_report(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "identity,phash,status,match_count,references");
        assert_eq!(
            lines[1],
            "summer_sale.png,9a65659a9a65659a,matched,1,platform_creative_hashes_META:123456789@0"
        );
        assert_eq!(lines[2], "unused.jpg,123456789abcdef0,ghost,0,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn json_contains_summary_and_statuses() {
        let mut buffer = Vec::new();
        write_json(&sample_report(), &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(value["summary"]["matched"], 1);
        assert_eq!(value["summary"]["ghosts"], 1);
        assert_eq!(value["results"][1]["outcome"]["status"], "ghost");
        assert_eq!(
            value["results"][0]["outcome"]["references"][0]["identity"],
            "123456789"
        );
        assert!(value["generated_at"].is_string());
    }
}
