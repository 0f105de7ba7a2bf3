//! Plugin Verification
//!
//! Ties the pieces together: a [`PluginVerifier`] checks one plugin against
//! one host build, a [`VerifyPluginTask`] runs it for a set of host versions
//! under the task scheduler, and reporters receive everything produced on
//! the way.

pub mod plugin_verifier;
pub mod reporter;
pub mod results;
pub mod task;
pub mod verdict;

pub use plugin_verifier::{PluginVerifier, VerifierParameters};
pub use reporter::{ChannelReporter, CollectingReporter, LogReporter, ReportEvent, Reporter, ReporterSet};
pub use results::ResultsAggregator;
pub use task::{HostSelection, PluginVerificationResults, VerifyPluginTask};
pub use verdict::{PluginWarning, Verdict, VerdictKind, VerificationReport};

#[cfg(test)]
mod tests;
