//! Dependency Graph Model
//!
//! The resolved dependencies of one plugin: one vertex per plugin id, edges
//! labelled with the declaration that produced them, and per-vertex lists of
//! dependencies that could not be resolved.

use serde::Serialize;
use std::fmt;

use crate::plugin::{PluginCoordinate, PluginDependency};

/// A declared dependency that no finder could supply
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MissingDependency {
    pub dependency: PluginDependency,
    pub reason: String,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.dependency, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    pub id: String,
    pub version: String,
    pub missing_dependencies: Vec<MissingDependency>,
}

impl DependencyNode {
    pub fn new(coordinate: &PluginCoordinate) -> Self {
        Self {
            id: coordinate.id.clone(),
            version: coordinate.version.clone(),
            missing_dependencies: Vec::new(),
        }
    }

    pub fn coordinate(&self) -> PluginCoordinate {
        PluginCoordinate::new(&self.id, &self.version)
    }

    /// Record a missing dependency once
    pub fn add_missing(&mut self, missing: MissingDependency) {
        if !self.missing_dependencies.contains(&missing) {
            self.missing_dependencies.push(missing);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyEdge {
    pub from: PluginCoordinate,
    pub to: PluginCoordinate,
    pub dependency: PluginDependency,
}

/// Vertices in discovery order; the start vertex comes first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependenciesGraph {
    pub vertices: Vec<DependencyNode>,
    pub edges: Vec<DependencyEdge>,
}

impl DependenciesGraph {
    /// The plugin the graph was built for
    pub fn start(&self) -> &DependencyNode {
        &self.vertices[0]
    }

    pub fn vertex(&self, id: &str) -> Option<&DependencyNode> {
        self.vertices.iter().find(|v| v.id == id)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a DependencyEdge> + 'a {
        self.edges.iter().filter(move |e| e.from.id == id)
    }

    /// Missing dependencies of every vertex other than the start
    pub fn transitive_missing(&self) -> impl Iterator<Item = (&DependencyNode, &MissingDependency)> {
        self.vertices
            .iter()
            .skip(1)
            .flat_map(|v| v.missing_dependencies.iter().map(move |m| (v, m)))
    }
}

impl fmt::Display for DependenciesGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.start().coordinate())?;
        for edge in &self.edges {
            writeln!(f, "  {} -> {} ({})", edge.from, edge.to, edge.dependency)?;
        }
        for vertex in &self.vertices {
            for missing in &vertex.missing_dependencies {
                writeln!(f, "  {} -> missing {}", vertex.coordinate(), missing)?;
            }
        }
        Ok(())
    }
}
