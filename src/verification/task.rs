//! Verification Tasks
//!
//! A schedulable task verifying one plugin against a set of host versions.
//! Plugin and host builds come from the shared caches; every handle taken
//! is returned when the task finishes, fails or is cancelled.

use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;

use super::plugin_verifier::PluginVerifier;
use super::reporter::Reporter;
use super::verdict::{PluginWarning, Verdict, VerificationReport};
use crate::cache::{CacheResult, ResourceCache};
use crate::dependencies::DependenciesGraph;
use crate::host::{HostVersion, LocalHost};
use crate::plugin::{PluginCoordinate, PluginDetails};
use crate::tasks::{Task, TaskContext, TaskError, TaskProgress, TaskResult};
use crate::verifier::{CompatibilityProblem, IgnoredProblem, VerificationError};

impl From<VerificationError> for TaskError {
    fn from(error: VerificationError) -> Self {
        match error {
            VerificationError::Cancelled => TaskError::Cancelled,
            VerificationError::InvalidFilter { .. } => TaskError::failed(error.to_string()),
        }
    }
}

/// Which host versions a plugin is verified against
#[derive(Debug, Clone, PartialEq)]
pub enum HostSelection {
    /// Exactly these versions
    Versions(Vec<HostVersion>),
    /// Those of the available versions inside the plugin's since/until range
    CompatibleWith(Vec<HostVersion>),
}

impl HostSelection {
    /// Versions to verify `plugin` against; `None` selects every candidate
    pub fn select(&self, plugin: Option<&PluginDetails>) -> Vec<HostVersion> {
        match (self, plugin) {
            (HostSelection::Versions(versions), _) => versions.clone(),
            (HostSelection::CompatibleWith(available), Some(plugin)) => available
                .iter()
                .filter(|v| plugin.descriptor.is_compatible_with(v))
                .cloned()
                .collect(),
            (HostSelection::CompatibleWith(available), None) => available.clone(),
        }
    }
}

/// Reports of one plugin across its host versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginVerificationResults {
    pub plugin: PluginCoordinate,
    pub reports: Vec<VerificationReport>,
}

pub struct VerifyPluginTask {
    plugin: PluginCoordinate,
    hosts: HostSelection,
    plugin_cache: ResourceCache<PluginCoordinate, PluginDetails>,
    host_cache: ResourceCache<HostVersion, LocalHost>,
    verifier: Arc<PluginVerifier>,
    reporter: Arc<dyn Reporter>,
}

impl VerifyPluginTask {
    pub fn new(
        plugin: PluginCoordinate,
        hosts: HostSelection,
        plugin_cache: ResourceCache<PluginCoordinate, PluginDetails>,
        host_cache: ResourceCache<HostVersion, LocalHost>,
        verifier: Arc<PluginVerifier>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            plugin,
            hosts,
            plugin_cache,
            host_cache,
            verifier,
            reporter,
        }
    }

    /// One report per candidate host carrying the same terminal verdict
    fn unverifiable(&self, verdict: Verdict) -> PluginVerificationResults {
        let reports = self
            .hosts
            .select(None)
            .into_iter()
            .map(|host_version| VerificationReport {
                plugin: self.plugin.clone(),
                host_version,
                verdict: verdict.clone(),
                ignored: Vec::new(),
            })
            .collect::<Vec<_>>();
        for report in &reports {
            self.reporter.report_verdict(report);
        }
        PluginVerificationResults {
            plugin: self.plugin.clone(),
            reports,
        }
    }
}

impl Task for VerifyPluginTask {
    type Output = PluginVerificationResults;

    fn name(&self) -> String {
        format!("Verify {}", self.plugin)
    }

    fn execute(self, context: &TaskContext) -> TaskResult<PluginVerificationResults> {
        context.progress().set_text(format!("Loading {}", self.plugin));
        let plugin_handle = match self.plugin_cache.acquire(&self.plugin) {
            CacheResult::Found(handle) => handle,
            CacheResult::NotFound(reason) => return Ok(self.unverifiable(Verdict::NotFound { reason })),
            CacheResult::Failed(reason) => return Ok(self.unverifiable(Verdict::FailedToDownload { reason })),
            CacheResult::Invalid(reason) => return Ok(self.unverifiable(Verdict::Bad { reason })),
        };
        let plugin = plugin_handle.resource();

        let versions = self.hosts.select(Some(plugin.as_ref()));
        if versions.is_empty() {
            warn!("No host versions selected for {}", self.plugin);
        }

        let mut reports = Vec::with_capacity(versions.len());
        let step = 1.0 / versions.len().max(1) as f64;
        for (index, version) in versions.iter().enumerate() {
            context.check_cancelled()?;
            context
                .progress()
                .update(index as f64 * step, format!("{} against {}", self.plugin, version));

            let host = match self.host_cache.acquire(version) {
                CacheResult::Found(handle) => handle,
                CacheResult::NotFound(reason) | CacheResult::Invalid(reason) | CacheResult::Failed(reason) => {
                    warn!("Skipping host {} for {}: {}", version, self.plugin, reason);
                    continue;
                }
            };

            let reporter = ProgressReporter {
                inner: self.reporter.as_ref(),
                progress: context.progress(),
                offset: index as f64 * step,
                scale: step,
            };
            let report = self
                .verifier
                .verify(&plugin, &host.descriptor, &reporter, context.cancellation())?;
            host.release();
            reports.push(report);
        }

        plugin_handle.release();
        context.progress().update(1.0, "Done");
        debug!("{}: {} reports", self.plugin, reports.len());
        Ok(PluginVerificationResults {
            plugin: self.plugin,
            reports,
        })
    }
}

/// Maps one host's progress onto its slice of the task's progress
struct ProgressReporter<'a> {
    inner: &'a dyn Reporter,
    progress: &'a TaskProgress,
    offset: f64,
    scale: f64,
}

impl Reporter for ProgressReporter<'_> {
    fn report_message(&self, message: &str) {
        self.progress.set_text(message);
        self.inner.report_message(message);
    }

    fn report_progress(&self, fraction: f64) {
        let overall = self.offset + fraction * self.scale;
        self.progress.set_fraction(overall);
        self.inner.report_progress(overall);
    }

    fn report_problem(&self, problem: &CompatibilityProblem) {
        self.inner.report_problem(problem);
    }

    fn report_warning(&self, warning: &PluginWarning) {
        self.inner.report_warning(warning);
    }

    fn report_graph(&self, graph: &DependenciesGraph) {
        self.inner.report_graph(graph);
    }

    fn report_ignored(&self, ignored: &IgnoredProblem) {
        self.inner.report_ignored(ignored);
    }

    fn report_verdict(&self, report: &VerificationReport) {
        self.inner.report_verdict(report);
    }
}
