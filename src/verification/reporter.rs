//! Reporters
//!
//! Push-only sinks for everything a verification produces. A reporter only
//! overrides the events it cares about.

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

use super::verdict::{PluginWarning, VerificationReport};
use crate::dependencies::DependenciesGraph;
use crate::verifier::{CompatibilityProblem, IgnoredProblem};

pub trait Reporter: Send + Sync {
    fn report_message(&self, _message: &str) {}

    fn report_progress(&self, _fraction: f64) {}

    fn report_problem(&self, _problem: &CompatibilityProblem) {}

    fn report_warning(&self, _warning: &PluginWarning) {}

    fn report_graph(&self, _graph: &DependenciesGraph) {}

    fn report_ignored(&self, _ignored: &IgnoredProblem) {}

    fn report_verdict(&self, _report: &VerificationReport) {}
}

/// Writes events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report_message(&self, message: &str) {
        info!("{}", message);
    }

    fn report_problem(&self, problem: &CompatibilityProblem) {
        debug!("Problem: {}", problem.short_description());
    }

    fn report_warning(&self, warning: &PluginWarning) {
        warn!("{}", warning);
    }

    fn report_graph(&self, graph: &DependenciesGraph) {
        debug!("Dependencies of {}", graph);
    }

    fn report_ignored(&self, ignored: &IgnoredProblem) {
        debug!("Ignored: {} ({})", ignored.problem.short_description(), ignored.reason);
    }

    fn report_verdict(&self, report: &VerificationReport) {
        info!("{} against {}: {}", report.plugin, report.host_version, report.verdict);
    }
}

/// Keeps everything reported, for inspection after the run
#[derive(Debug, Default)]
pub struct CollectingReporter {
    messages: Mutex<Vec<String>>,
    problems: Mutex<Vec<CompatibilityProblem>>,
    warnings: Mutex<Vec<PluginWarning>>,
    ignored: Mutex<Vec<IgnoredProblem>>,
    reports: Mutex<Vec<VerificationReport>>,
    last_progress: Mutex<f64>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn problems(&self) -> Vec<CompatibilityProblem> {
        self.problems.lock().clone()
    }

    pub fn warnings(&self) -> Vec<PluginWarning> {
        self.warnings.lock().clone()
    }

    pub fn ignored(&self) -> Vec<IgnoredProblem> {
        self.ignored.lock().clone()
    }

    pub fn reports(&self) -> Vec<VerificationReport> {
        self.reports.lock().clone()
    }

    pub fn last_progress(&self) -> f64 {
        *self.last_progress.lock()
    }
}

impl Reporter for CollectingReporter {
    fn report_message(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }

    fn report_progress(&self, fraction: f64) {
        *self.last_progress.lock() = fraction;
    }

    fn report_problem(&self, problem: &CompatibilityProblem) {
        self.problems.lock().push(problem.clone());
    }

    fn report_warning(&self, warning: &PluginWarning) {
        self.warnings.lock().push(warning.clone());
    }

    fn report_ignored(&self, ignored: &IgnoredProblem) {
        self.ignored.lock().push(ignored.clone());
    }

    fn report_verdict(&self, report: &VerificationReport) {
        self.reports.lock().push(report.clone());
    }
}

/// Event forwarded by a [`ChannelReporter`]
#[derive(Debug, Clone)]
pub enum ReportEvent {
    Message(String),
    Progress(f64),
    Problem(CompatibilityProblem),
    Warning(PluginWarning),
    Graph(DependenciesGraph),
    Ignored(IgnoredProblem),
    Verdict(VerificationReport),
}

/// Forwards events to a channel; sends to a dropped receiver are discarded
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: Sender<ReportEvent>,
}

impl ChannelReporter {
    pub fn new(sender: Sender<ReportEvent>) -> Self {
        Self { sender }
    }

    /// Reporter plus the receiving end of an unbounded channel
    pub fn unbounded() -> (Self, Receiver<ReportEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }

    fn send(&self, event: ReportEvent) {
        let _ = self.sender.send(event);
    }
}

impl Reporter for ChannelReporter {
    fn report_message(&self, message: &str) {
        self.send(ReportEvent::Message(message.to_string()));
    }

    fn report_progress(&self, fraction: f64) {
        self.send(ReportEvent::Progress(fraction));
    }

    fn report_problem(&self, problem: &CompatibilityProblem) {
        self.send(ReportEvent::Problem(problem.clone()));
    }

    fn report_warning(&self, warning: &PluginWarning) {
        self.send(ReportEvent::Warning(warning.clone()));
    }

    fn report_graph(&self, graph: &DependenciesGraph) {
        self.send(ReportEvent::Graph(graph.clone()));
    }

    fn report_ignored(&self, ignored: &IgnoredProblem) {
        self.send(ReportEvent::Ignored(ignored.clone()));
    }

    fn report_verdict(&self, report: &VerificationReport) {
        self.send(ReportEvent::Verdict(report.clone()));
    }
}

/// Fans every event out to a list of reporters
#[derive(Default, Clone)]
pub struct ReporterSet {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl ReporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for ReporterSet {
    fn report_message(&self, message: &str) {
        self.reporters.iter().for_each(|r| r.report_message(message));
    }

    fn report_progress(&self, fraction: f64) {
        self.reporters.iter().for_each(|r| r.report_progress(fraction));
    }

    fn report_problem(&self, problem: &CompatibilityProblem) {
        self.reporters.iter().for_each(|r| r.report_problem(problem));
    }

    fn report_warning(&self, warning: &PluginWarning) {
        self.reporters.iter().for_each(|r| r.report_warning(warning));
    }

    fn report_graph(&self, graph: &DependenciesGraph) {
        self.reporters.iter().for_each(|r| r.report_graph(graph));
    }

    fn report_ignored(&self, ignored: &IgnoredProblem) {
        self.reporters.iter().for_each(|r| r.report_ignored(ignored));
    }

    fn report_verdict(&self, report: &VerificationReport) {
        self.reporters.iter().for_each(|r| r.report_verdict(report));
    }
}
