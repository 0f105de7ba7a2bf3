//! Plugin Verifier
//!
//! Verifies one loaded plugin against one host build: resolves the
//! dependency graph, assembles the classpath (plugin, dependencies, host,
//! extra) and runs the compatibility checker over the plugin's classes.

use log::{debug, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::reporter::Reporter;
use super::verdict::{PluginWarning, Verdict, VerificationReport};
use crate::dependencies::{
    BundledPluginFinder, CompositeDependencyFinder, DepGraphBuilder, DependencyError, DependencyFinder,
};
use crate::host::HostDescriptor;
use crate::plugin::PluginDetails;
use crate::resolver::{Resolver, UnionResolver};
use crate::verifier::{CompatibilityChecker, ProblemsFilter, VerificationContext, VerificationError, VerificationResult};

/// Settings shared by every verification a verifier runs
#[derive(Clone, Default)]
pub struct VerifierParameters {
    /// Packages resolved outside the classpath; never reported missing
    pub external_prefixes: Vec<String>,
    pub filters: Vec<Arc<dyn ProblemsFilter>>,
    /// Classes appended to the classpath after the host
    pub extra_classpath: Vec<Arc<dyn Resolver>>,
}

pub struct PluginVerifier {
    params: VerifierParameters,
    repository_finder: Option<Arc<dyn DependencyFinder>>,
}

impl PluginVerifier {
    pub fn new(params: VerifierParameters) -> Self {
        Self {
            params,
            repository_finder: None,
        }
    }

    /// Finder consulted for dependencies the host does not bundle
    pub fn with_repository_finder(mut self, finder: Arc<dyn DependencyFinder>) -> Self {
        self.repository_finder = Some(finder);
        self
    }

    pub fn params(&self) -> &VerifierParameters {
        &self.params
    }

    pub fn verify(
        &self,
        plugin: &Arc<PluginDetails>,
        host: &HostDescriptor,
        reporter: &dyn Reporter,
        cancellation: &CancellationToken,
    ) -> VerificationResult<VerificationReport> {
        let coordinate = plugin.descriptor.coordinate();
        reporter.report_message(&format!("Verifying {} against {}", coordinate, host.version));

        let mut warnings = Vec::new();
        if !plugin.descriptor.is_compatible_with(&host.version) {
            warnings.push(PluginWarning::HostOutOfRange {
                host: host.version.clone(),
                since: plugin.descriptor.since.clone(),
                until: plugin.descriptor.until.clone(),
            });
        }

        let mut finder = CompositeDependencyFinder::default().with_finder(Arc::new(BundledPluginFinder::new(host)));
        if let Some(repository) = &self.repository_finder {
            finder = finder.with_finder(Arc::clone(repository));
        }
        let resolution = DepGraphBuilder::new(&finder)
            .with_host_modules(host.modules.iter().cloned())
            .with_cancellation(cancellation.clone())
            .build(plugin)
            .map_err(dependency_error)?;
        reporter.report_graph(&resolution.graph);

        let start_id = resolution.graph.start().id.clone();
        for (node, missing) in resolution.graph.transitive_missing() {
            if node.id == start_id {
                continue;
            }
            warnings.push(PluginWarning::MissingTransitiveDependency {
                plugin: node.coordinate(),
                dependency: missing.dependency.clone(),
                reason: missing.reason.clone(),
            });
        }

        let mut members: Vec<Arc<dyn Resolver>> = vec![Arc::clone(&plugin.classes)];
        members.extend(resolution.resolvers.iter().cloned());
        members.push(Arc::clone(&host.classes));
        members.extend(self.params.extra_classpath.iter().cloned());
        let classpath: Arc<dyn Resolver> = Arc::new(UnionResolver::new(members));
        debug!("Classpath of {}: {}", coordinate, classpath.description());

        let context = VerificationContext::new(coordinate.clone(), host.version.clone(), classpath)
            .with_external_prefixes(self.params.external_prefixes.iter().cloned())
            .with_cancellation(cancellation.clone());
        let progress = |done: usize, total: usize, _class: &str| {
            if total > 0 {
                reporter.report_progress(done as f64 / total as f64);
            }
        };
        let result = CompatibilityChecker::new(&context)
            .with_filters(self.params.filters.iter().cloned())
            .with_progress(&progress)
            .check(plugin.classes.as_ref())?;

        for problem in &result.problems {
            reporter.report_problem(problem);
        }
        for ignored in &result.ignored {
            reporter.report_ignored(ignored);
        }
        for (class_name, message) in &result.invalid_classes {
            warnings.push(PluginWarning::InvalidClass {
                class_name: class_name.clone(),
                message: message.clone(),
            });
        }
        for warning in &warnings {
            reporter.report_warning(warning);
        }

        let checked_classes = result.checked_classes;
        let graph = resolution.release();

        let report = VerificationReport {
            plugin: coordinate,
            host_version: host.version.clone(),
            verdict: Verdict::from_check(graph, result.problems, warnings),
            ignored: result.ignored,
        };
        info!(
            "{} against {}: {} ({} classes checked)",
            report.plugin, report.host_version, report.verdict, checked_classes
        );
        reporter.report_verdict(&report);
        Ok(report)
    }
}

fn dependency_error(error: DependencyError) -> VerificationError {
    match error {
        DependencyError::Cancelled => VerificationError::Cancelled,
    }
}
