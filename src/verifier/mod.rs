//! Compatibility Verification Engine
//!
//! Resolves the symbolic references of plugin bytecode against a classpath
//! and classifies every failure as a [`CompatibilityProblem`].

pub mod access;
pub mod checker;
pub mod context;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod problems;
pub mod resolution;

pub use checker::{CheckResult, CompatibilityChecker};
pub use context::VerificationContext;
pub use error::{VerificationError, VerificationResult};
pub use filter::{
    DocumentedProblem, DocumentedProblemsFilter, FilterDecision, IgnoredProblem, IgnoredProblemsFilter, ProblemsFilter,
};
pub use hierarchy::{ClassHierarchy, ClassHierarchyBuilder, HierarchyStatus};
pub use problems::{AccessType, CompatibilityProblem, ProblemLocation, ProblemType};
pub use resolution::MemberResolver;

#[cfg(test)]
mod tests;
