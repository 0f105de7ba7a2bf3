//! Dependency Graph Builder
//!
//! Breadth-first expansion of declared dependencies starting at the plugin
//! under test. Each dependency id is looked up at most once per build and
//! each plugin id becomes at most one vertex, so cyclic declarations
//! terminate.

use log::{debug, info};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::error::{DependencyError, DependencyResult};
use super::finder::{DependencyFinder, DependencyLookup};
use super::graph::{DependenciesGraph, DependencyEdge, DependencyNode, MissingDependency};
use crate::cache::ScopedHandle;
use crate::plugin::{PluginCoordinate, PluginDependency, PluginDetails};
use crate::resolver::Resolver;

/// A built graph plus what it keeps loaded
pub struct DependencyResolution {
    pub graph: DependenciesGraph,
    /// Cache handles of loaded dependencies; released on drop
    pub handles: Vec<ScopedHandle<PluginCoordinate, PluginDetails>>,
    /// Class sources of every dependency vertex, in vertex order
    pub resolvers: Vec<Arc<dyn Resolver>>,
}

impl DependencyResolution {
    /// Return every cache handle, keeping only the graph
    pub fn release(self) -> DependenciesGraph {
        for handle in self.handles {
            handle.release();
        }
        self.graph
    }
}

/// Result of looking up one dependency id
#[derive(Debug, Clone)]
enum Resolved {
    Vertex(usize),
    Missing(String),
}

pub struct DepGraphBuilder<'f> {
    finder: &'f dyn DependencyFinder,
    host_modules: BTreeSet<String>,
    cancellation: CancellationToken,
}

impl<'f> DepGraphBuilder<'f> {
    pub fn new(finder: &'f dyn DependencyFinder) -> Self {
        Self {
            finder,
            host_modules: BTreeSet::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Modules built into the host; dependencies on them need no plugin
    pub fn with_host_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.host_modules.extend(modules.into_iter().map(Into::into));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn build(&self, plugin: &Arc<PluginDetails>) -> DependencyResult<DependencyResolution> {
        let start = plugin.descriptor.coordinate();
        debug!("Building dependency graph of {}", start);

        let mut state = BuildState::new(plugin);
        while let Some(current) = state.queue.pop_front() {
            if self.cancellation.is_cancelled() {
                return Err(DependencyError::Cancelled);
            }
            let descriptor = Arc::clone(&state.details[current].descriptor);

            for dependency in &descriptor.dependencies {
                if dependency.is_module && self.host_modules.contains(&dependency.id) {
                    continue;
                }
                match state.resolve(self.finder, dependency) {
                    Resolved::Vertex(target) if target == current => {}
                    Resolved::Vertex(target) => state.add_edge(current, target, dependency),
                    Resolved::Missing(reason) => {
                        debug!("{}: dependency {} is missing: {}", state.vertices[current].id, dependency, reason);
                        state.vertices[current].add_missing(MissingDependency {
                            dependency: dependency.clone(),
                            reason,
                        });
                    }
                }
            }
        }

        info!(
            "Dependency graph of {}: {} vertices, {} edges",
            start,
            state.vertices.len(),
            state.edges.len()
        );
        Ok(state.finish())
    }
}

/// Mutable state of one build
struct BuildState {
    vertices: Vec<DependencyNode>,
    details: Vec<Arc<PluginDetails>>,
    by_id: HashMap<String, usize>,
    memo: HashMap<(String, bool), Resolved>,
    edges: Vec<DependencyEdge>,
    edge_set: HashSet<DependencyEdge>,
    handles: Vec<ScopedHandle<PluginCoordinate, PluginDetails>>,
    queue: VecDeque<usize>,
}

impl BuildState {
    fn new(plugin: &Arc<PluginDetails>) -> Self {
        Self {
            vertices: vec![DependencyNode::new(&plugin.descriptor.coordinate())],
            details: vec![Arc::clone(plugin)],
            by_id: HashMap::from([(plugin.id().to_string(), 0)]),
            memo: HashMap::new(),
            edges: Vec::new(),
            edge_set: HashSet::new(),
            handles: Vec::new(),
            queue: VecDeque::from([0]),
        }
    }

    /// Look a dependency up once per build, adding a vertex for a plugin id
    /// seen for the first time
    fn resolve(&mut self, finder: &dyn DependencyFinder, dependency: &PluginDependency) -> Resolved {
        let key = (dependency.id.clone(), dependency.is_module);
        if let Some(known) = self.memo.get(&key) {
            return known.clone();
        }

        let (found, handle) = match finder.find(dependency) {
            DependencyLookup::DetailsProvided(handle) => (handle.resource(), Some(handle)),
            DependencyLookup::FoundPlugin(details) => (details, None),
            DependencyLookup::NotFound(reason) => {
                let missing = Resolved::Missing(reason);
                self.memo.insert(key, missing.clone());
                return missing;
            }
        };

        let resolved = match self.by_id.get(found.id()) {
            Some(&index) => Resolved::Vertex(index),
            None => {
                let index = self.vertices.len();
                self.vertices.push(DependencyNode::new(&found.descriptor.coordinate()));
                self.by_id.insert(found.id().to_string(), index);
                self.details.push(found);
                self.handles.extend(handle);
                self.queue.push_back(index);
                Resolved::Vertex(index)
            }
        };
        self.memo.insert(key, resolved.clone());
        resolved
    }

    fn add_edge(&mut self, from: usize, to: usize, dependency: &PluginDependency) {
        let edge = DependencyEdge {
            from: self.vertices[from].coordinate(),
            to: self.vertices[to].coordinate(),
            dependency: dependency.clone(),
        };
        if self.edge_set.insert(edge.clone()) {
            self.edges.push(edge);
        }
    }

    fn finish(self) -> DependencyResolution {
        let resolvers = self.details.iter().skip(1).map(|d| Arc::clone(&d.classes)).collect();
        DependencyResolution {
            graph: DependenciesGraph {
                vertices: self.vertices,
                edges: self.edges,
            },
            handles: self.handles,
            resolvers,
        }
    }
}
