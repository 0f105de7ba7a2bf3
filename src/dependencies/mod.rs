//! Plugin Dependencies
//!
//! Resolution of a plugin's declared dependencies into a graph of loaded
//! plugins whose classes join the verification classpath.

pub mod builder;
pub mod error;
pub mod finder;
pub mod graph;
pub mod repository;

pub use builder::{DepGraphBuilder, DependencyResolution};
pub use error::{DependencyError, DependencyResult};
pub use finder::{
    BundledPluginFinder, CompositeDependencyFinder, DependencyFinder, DependencyLookup, RepositoryDependencyFinder,
    NOT_FOUND,
};
pub use graph::{DependenciesGraph, DependencyEdge, DependencyNode, MissingDependency};
pub use repository::{compare_versions, InMemoryPluginRepository, PluginRepository};

#[cfg(test)]
mod tests;
