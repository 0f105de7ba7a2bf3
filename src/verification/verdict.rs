//! Verdicts
//!
//! The outcome of verifying one plugin against one host version.

use serde::Serialize;
use std::fmt;

use crate::dependencies::{DependenciesGraph, MissingDependency};
use crate::host::HostVersion;
use crate::plugin::{PluginCoordinate, PluginDependency};
use crate::verifier::{CompatibilityProblem, IgnoredProblem};

/// A non-fatal observation made during verification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PluginWarning {
    /// The host lies outside the plugin's declared since/until range
    HostOutOfRange {
        host: HostVersion,
        since: Option<HostVersion>,
        until: Option<HostVersion>,
    },
    /// A dependency of a dependency could not be resolved
    MissingTransitiveDependency {
        plugin: PluginCoordinate,
        dependency: PluginDependency,
        reason: String,
    },
    /// A plugin class could not be decoded and was skipped
    InvalidClass { class_name: String, message: String },
}

impl fmt::Display for PluginWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginWarning::HostOutOfRange { host, since, until } => {
                let bound = |v: &Option<HostVersion>| v.as_ref().map_or_else(|| "*".to_string(), |v| v.to_string());
                write!(
                    f,
                    "Host {} is outside the supported range [{}, {}]",
                    host,
                    bound(since),
                    bound(until)
                )
            }
            PluginWarning::MissingTransitiveDependency {
                plugin,
                dependency,
                reason,
            } => write!(f, "Dependency {} of {} is missing: {}", dependency, plugin, reason),
            PluginWarning::InvalidClass { class_name, message } => {
                write!(f, "Class {} is invalid: {}", class_name, message)
            }
        }
    }
}

/// Closed set of verdict kinds, for counting and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    Ok,
    Warnings,
    Problems,
    MissingDependencies,
    NotFound,
    FailedToDownload,
    Bad,
}

impl VerdictKind {
    pub const ALL: [VerdictKind; 7] = [
        VerdictKind::Ok,
        VerdictKind::Warnings,
        VerdictKind::Problems,
        VerdictKind::MissingDependencies,
        VerdictKind::NotFound,
        VerdictKind::FailedToDownload,
        VerdictKind::Bad,
    ];
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            VerdictKind::Ok => "OK",
            VerdictKind::Warnings => "Warnings",
            VerdictKind::Problems => "Problems",
            VerdictKind::MissingDependencies => "Missing dependencies",
            VerdictKind::NotFound => "Not found",
            VerdictKind::FailedToDownload => "Failed to download",
            VerdictKind::Bad => "Bad plugin",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Ok {
        graph: DependenciesGraph,
    },
    Warnings {
        graph: DependenciesGraph,
        warnings: Vec<PluginWarning>,
    },
    Problems {
        graph: DependenciesGraph,
        problems: Vec<CompatibilityProblem>,
        warnings: Vec<PluginWarning>,
    },
    /// Direct dependencies of the plugin (optional ones included) are missing
    MissingDependencies {
        graph: DependenciesGraph,
        missing: Vec<MissingDependency>,
        problems: Vec<CompatibilityProblem>,
        warnings: Vec<PluginWarning>,
    },
    NotFound {
        reason: String,
    },
    FailedToDownload {
        reason: String,
    },
    /// The plugin itself is structurally invalid
    Bad {
        reason: String,
    },
}

impl Verdict {
    /// Pick the verdict for a completed check
    pub fn from_check(graph: DependenciesGraph, problems: Vec<CompatibilityProblem>, warnings: Vec<PluginWarning>) -> Self {
        let missing = graph.start().missing_dependencies.clone();
        if !missing.is_empty() {
            Verdict::MissingDependencies {
                graph,
                missing,
                problems,
                warnings,
            }
        } else if !problems.is_empty() {
            Verdict::Problems {
                graph,
                problems,
                warnings,
            }
        } else if !warnings.is_empty() {
            Verdict::Warnings { graph, warnings }
        } else {
            Verdict::Ok { graph }
        }
    }

    pub fn kind(&self) -> VerdictKind {
        match self {
            Verdict::Ok { .. } => VerdictKind::Ok,
            Verdict::Warnings { .. } => VerdictKind::Warnings,
            Verdict::Problems { .. } => VerdictKind::Problems,
            Verdict::MissingDependencies { .. } => VerdictKind::MissingDependencies,
            Verdict::NotFound { .. } => VerdictKind::NotFound,
            Verdict::FailedToDownload { .. } => VerdictKind::FailedToDownload,
            Verdict::Bad { .. } => VerdictKind::Bad,
        }
    }

    pub fn problems(&self) -> &[CompatibilityProblem] {
        match self {
            Verdict::Problems { problems, .. } | Verdict::MissingDependencies { problems, .. } => problems,
            Verdict::Ok { .. }
            | Verdict::Warnings { .. }
            | Verdict::NotFound { .. }
            | Verdict::FailedToDownload { .. }
            | Verdict::Bad { .. } => &[],
        }
    }

    pub fn warnings(&self) -> &[PluginWarning] {
        match self {
            Verdict::Warnings { warnings, .. }
            | Verdict::Problems { warnings, .. }
            | Verdict::MissingDependencies { warnings, .. } => warnings,
            Verdict::Ok { .. } | Verdict::NotFound { .. } | Verdict::FailedToDownload { .. } | Verdict::Bad { .. } => &[],
        }
    }

    pub fn graph(&self) -> Option<&DependenciesGraph> {
        match self {
            Verdict::Ok { graph }
            | Verdict::Warnings { graph, .. }
            | Verdict::Problems { graph, .. }
            | Verdict::MissingDependencies { graph, .. } => Some(graph),
            Verdict::NotFound { .. } | Verdict::FailedToDownload { .. } | Verdict::Bad { .. } => None,
        }
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        match self {
            Verdict::Ok { .. } => "Compatible".to_string(),
            Verdict::Warnings { warnings, .. } => format!("Compatible, {} warnings", warnings.len()),
            Verdict::Problems { problems, .. } => format!("{} compatibility problems", problems.len()),
            Verdict::MissingDependencies { missing, problems, .. } => format!(
                "{} missing dependencies, {} compatibility problems",
                missing.len(),
                problems.len()
            ),
            Verdict::NotFound { reason } | Verdict::FailedToDownload { reason } | Verdict::Bad { reason } => {
                reason.clone()
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.summary())
    }
}

/// Verdict of one plugin against one host, with what the filters dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub plugin: PluginCoordinate,
    pub host_version: HostVersion,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<IgnoredProblem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::DependencyNode;
    use crate::verifier::ProblemLocation;
    use crate::bytecode::ClassReference;

    fn graph(missing: Vec<MissingDependency>) -> DependenciesGraph {
        let mut start = DependencyNode::new(&PluginCoordinate::new("com.example", "1.0"));
        for m in missing {
            start.add_missing(m);
        }
        DependenciesGraph {
            vertices: vec![start],
            edges: Vec::new(),
        }
    }

    fn problem() -> CompatibilityProblem {
        CompatibilityProblem::ClassNotFound {
            reference: ClassReference::new("host/Gone"),
            location: ProblemLocation::class("plugin/Main"),
            instruction: None,
        }
    }

    #[test]
    fn test_verdict_selection_order() {
        assert_eq!(Verdict::from_check(graph(Vec::new()), Vec::new(), Vec::new()).kind(), VerdictKind::Ok);

        let warning = PluginWarning::InvalidClass {
            class_name: "plugin/Broken".into(),
            message: "bad magic".into(),
        };
        let warned = Verdict::from_check(graph(Vec::new()), Vec::new(), vec![warning.clone()]);
        assert_eq!(warned.kind(), VerdictKind::Warnings);
        assert_eq!(warned.warnings().len(), 1);

        let problems = Verdict::from_check(graph(Vec::new()), vec![problem()], vec![warning]);
        assert_eq!(problems.kind(), VerdictKind::Problems);
        assert_eq!(problems.problems().len(), 1);

        let missing = MissingDependency {
            dependency: PluginDependency::module("com.foo").optional(),
            reason: "not found".into(),
        };
        let verdict = Verdict::from_check(graph(vec![missing]), vec![problem()], Vec::new());
        assert_eq!(verdict.kind(), VerdictKind::MissingDependencies);
        assert_eq!(verdict.problems().len(), 1);
        assert_eq!(verdict.summary(), "1 missing dependencies, 1 compatibility problems");
    }

    #[test]
    fn test_verdict_serializes_with_tag() {
        let json = serde_json::to_value(Verdict::NotFound {
            reason: "no such plugin".into(),
        })
        .unwrap();
        assert_eq!(json["verdict"], "not_found");
        assert_eq!(json["reason"], "no such plugin");
    }
}
