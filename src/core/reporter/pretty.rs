//! Human-readable terminal rendering.

use super::MatchReport;
use console::style;
use std::io::{self, Write};

/// Write the summary and ghost details
pub fn render_pretty<W: Write>(report: &MatchReport, out: &mut W, verbose: bool) -> io::Result<()> {
    let summary = &report.summary;

    writeln!(out)?;
    writeln!(out, "{}", style("Summary").bold().underlined())?;
    writeln!(
        out,
        "  {} subject creatives ({})",
        style(summary.subject_records).cyan(),
        report.subject.label
    )?;
    for reference in &report.references {
        writeln!(
            out,
            "  {} reference creatives ({})",
            style(reference.records).cyan(),
            reference.label
        )?;
    }
    writeln!(out, "  {} matched", style(summary.matched).green())?;
    writeln!(out, "  {} ghosts", style(summary.ghosts).yellow())?;
    if summary.max_distance > 0 {
        writeln!(out, "  max distance {} bits", summary.max_distance)?;
    }

    let rejected = report.rejected_rows();
    if rejected > 0 {
        writeln!(
            out,
            "  {} rows rejected on load",
            style(rejected).red()
        )?;
    }
    writeln!(out)?;

    if summary.ghosts == 0 {
        writeln!(
            out,
            "{} No ghosts: every subject creative has a reference match.",
            style("✓").green().bold()
        )?;
    } else {
        writeln!(
            out,
            "{}",
            style(format!("Ghosts ({}):", summary.ghosts)).bold()
        )?;
        for ghost in report.ghosts() {
            let record = &ghost.record;
            writeln!(out, "  {}", style(record.identity()).yellow())?;
            writeln!(out, "     Hash: {}", record.fingerprint())?;
            for (column, value) in record.metadata() {
                if !value.is_empty() {
                    writeln!(out, "     {}: {}", column, value)?;
                }
            }
        }
    }

    if verbose && summary.matched > 0 {
        writeln!(out)?;
        writeln!(out, "{}", style("Matches:").bold())?;
        for result in report.results.iter().filter(|r| !r.outcome.is_ghost()) {
            let refs: Vec<String> = result
                .outcome
                .references()
                .iter()
                .map(|r| format!("{}:{} ({})", r.dataset, r.identity, r.distance))
                .collect();
            writeln!(
                out,
                "  {} {} {}",
                result.record.identity(),
                style("→").dim(),
                refs.join(", ")
            )?;
        }
    }

    Ok(())
}
