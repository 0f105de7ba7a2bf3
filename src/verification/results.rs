//! Results Aggregation
//!
//! Collects reports from concurrently finishing tasks. Reports are keyed by
//! plugin and host version, so the collected view does not depend on the
//! order tasks finish in and adding a report twice changes nothing.

use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::task::PluginVerificationResults;
use super::verdict::{VerdictKind, VerificationReport};
use crate::host::HostVersion;
use crate::plugin::PluginCoordinate;

#[derive(Debug, Default)]
pub struct ResultsAggregator {
    reports: Mutex<BTreeMap<(PluginCoordinate, HostVersion), VerificationReport>>,
}

impl ResultsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a report; returns false if one for the same pair was already there
    pub fn add(&self, report: VerificationReport) -> bool {
        let key = (report.plugin.clone(), report.host_version.clone());
        self.reports.lock().insert(key, report).is_none()
    }

    pub fn add_results(&self, results: PluginVerificationResults) {
        for report in results.reports {
            self.add(report);
        }
    }

    /// All reports, ordered by plugin then host version
    pub fn reports(&self) -> Vec<VerificationReport> {
        self.reports.lock().values().cloned().collect()
    }

    pub fn counts(&self) -> BTreeMap<VerdictKind, usize> {
        let mut counts: BTreeMap<VerdictKind, usize> = VerdictKind::ALL.iter().map(|k| (*k, 0)).collect();
        for report in self.reports.lock().values() {
            *counts.entry(report.verdict.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Whether any report carries problems or missing dependencies
    pub fn has_failures(&self) -> bool {
        self.reports.lock().values().any(|r| {
            matches!(
                r.verdict.kind(),
                VerdictKind::Problems
                    | VerdictKind::MissingDependencies
                    | VerdictKind::NotFound
                    | VerdictKind::FailedToDownload
                    | VerdictKind::Bad
            )
        })
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}
