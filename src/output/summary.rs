//! Summary rendering
//!
//! A clean prettytable of one row per plugin and host with a coloured
//! verdict, followed by the problems of each failing pair; or the full
//! reports as JSON.

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use prettytable::{format, Cell, Row, Table};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::verification::{VerdictKind, VerificationReport};

pub fn verdict_label(kind: VerdictKind) -> ColoredString {
    let text = kind.to_string();
    match kind {
        VerdictKind::Ok => text.green(),
        VerdictKind::Warnings => text.yellow(),
        VerdictKind::Problems | VerdictKind::MissingDependencies => text.red().bold(),
        VerdictKind::NotFound | VerdictKind::FailedToDownload | VerdictKind::Bad => text.magenta(),
    }
}

pub fn format_summary_table(reports: &[VerificationReport]) -> String {
    if reports.is_empty() {
        return "No verifications were run.\n".to_string();
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.add_row(Row::new(
        ["Plugin", "Host", "Verdict", "Details"]
            .iter()
            .map(|h| Cell::new(&h.bold().to_string()))
            .collect(),
    ));
    for report in reports {
        table.add_row(Row::new(vec![
            Cell::new(&report.plugin.to_string()),
            Cell::new(&report.host_version.to_string()),
            Cell::new(&verdict_label(report.verdict.kind()).to_string()),
            Cell::new(&report.verdict.summary()),
        ]));
    }

    let mut out = String::new();
    for line in table.to_string().lines() {
        let _ = writeln!(out, "  {}", line);
    }

    for report in reports {
        let problems = report.verdict.problems();
        let warnings = report.verdict.warnings();
        if problems.is_empty() && warnings.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} against {}:", report.plugin.to_string().bold(), report.host_version);
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for problem in problems {
            grouped
                .entry(problem.problem_type().to_string())
                .or_default()
                .push(problem.full_description());
        }
        for (category, descriptions) in grouped {
            let _ = writeln!(out, "  {} ({})", category.red(), descriptions.len());
            for description in descriptions {
                let _ = writeln!(out, "    {}", description);
            }
        }
        for warning in warnings {
            let _ = writeln!(out, "  {} {}", "warning:".yellow(), warning);
        }
    }

    let mut counts: BTreeMap<VerdictKind, usize> = BTreeMap::new();
    for report in reports {
        *counts.entry(report.verdict.kind()).or_insert(0) += 1;
    }
    let totals: Vec<String> = counts
        .iter()
        .map(|(kind, count)| format!("{}: {}", verdict_label(*kind), count))
        .collect();
    let _ = writeln!(out, "\n  {}", totals.join(" | "));
    out
}

pub fn format_json(reports: &[VerificationReport]) -> Result<String> {
    serde_json::to_string_pretty(reports).context("Failed to serialize verification reports")
}
