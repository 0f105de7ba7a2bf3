use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cache::{ProvideResult, ResourceCache, ResourceProvider};
use crate::dependencies::*;
use crate::plugin::{PluginCoordinate, PluginDependency, PluginDescriptor, PluginDetails};
use crate::resolver::EmptyResolver;

fn details(descriptor: PluginDescriptor) -> Arc<PluginDetails> {
    Arc::new(PluginDetails::new(descriptor, Arc::new(EmptyResolver)))
}

/// Finds plugins by id from a fixed map and counts lookups
#[derive(Default)]
struct MapFinder {
    plugins: HashMap<String, Arc<PluginDetails>>,
    lookups: AtomicUsize,
}

impl MapFinder {
    fn with(mut self, descriptor: PluginDescriptor) -> Self {
        self.plugins.insert(descriptor.id.clone(), details(descriptor));
        self
    }
}

impl DependencyFinder for MapFinder {
    fn find(&self, dependency: &PluginDependency) -> DependencyLookup {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.plugins.get(&dependency.id) {
            Some(found) => DependencyLookup::FoundPlugin(Arc::clone(found)),
            None => DependencyLookup::NotFound(NOT_FOUND.to_string()),
        }
    }
}

#[test]
fn test_cycle_terminates_with_one_vertex_per_id() {
    let start = details(PluginDescriptor::new("A", "1.0").with_dependency(PluginDependency::plugin("B")));
    let finder = MapFinder::default()
        .with(PluginDescriptor::new("B", "1.0").with_dependency(PluginDependency::plugin("A")))
        .with(PluginDescriptor::new("A", "2.0").with_dependency(PluginDependency::plugin("B")));

    let resolution = DepGraphBuilder::new(&finder).build(&start).unwrap();
    let graph = &resolution.graph;

    let ids: Vec<&str> = graph.vertices.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(graph.start().version, "1.0");
    assert_eq!(graph.edges.len(), 2);
    assert!(graph.edges.iter().all(|e| e.from.id != e.to.id));
    assert_eq!(graph.edges_from("B").next().unwrap().to, PluginCoordinate::new("A", "1.0"));
    assert_eq!(resolution.resolvers.len(), 1);
}

#[test]
fn test_self_dependency_has_no_edge() {
    let start = details(PluginDescriptor::new("A", "1.0").with_dependency(PluginDependency::plugin("A")));
    let finder = MapFinder::default().with(PluginDescriptor::new("A", "1.0"));

    let graph = DepGraphBuilder::new(&finder).build(&start).unwrap().graph;
    assert_eq!(graph.vertices.len(), 1);
    assert!(graph.edges.is_empty());
    assert!(graph.start().missing_dependencies.is_empty());
}

#[test]
fn test_each_dependency_looked_up_once() {
    let start = details(
        PluginDescriptor::new("A", "1.0")
            .with_dependency(PluginDependency::plugin("B"))
            .with_dependency(PluginDependency::plugin("C")),
    );
    let finder = MapFinder::default()
        .with(PluginDescriptor::new("B", "1.0").with_dependency(PluginDependency::plugin("C")))
        .with(PluginDescriptor::new("C", "1.0").with_dependency(PluginDependency::plugin("missing")));

    let graph = DepGraphBuilder::new(&finder).build(&start).unwrap().graph;
    assert_eq!(finder.lookups.load(Ordering::SeqCst), 3);
    assert_eq!(graph.vertices.len(), 3);
    assert_eq!(graph.edges.len(), 3);

    let transitive: Vec<_> = graph.transitive_missing().collect();
    assert_eq!(transitive.len(), 1);
    assert_eq!(transitive[0].0.id, "C");
    assert_eq!(transitive[0].1.dependency.id, "missing");
}

#[test]
fn test_missing_optional_module_and_host_modules() {
    let start = details(
        PluginDescriptor::new("A", "1.0")
            .with_dependency(PluginDependency::module("com.host.platform"))
            .with_dependency(PluginDependency::module("com.foo").optional()),
    );
    let finder = CompositeDependencyFinder::new(vec![Arc::new(MapFinder::default())]);

    let graph = DepGraphBuilder::new(&finder)
        .with_host_modules(["com.host.platform"])
        .build(&start)
        .unwrap()
        .graph;

    let missing = &graph.start().missing_dependencies;
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].dependency, PluginDependency::module("com.foo").optional());
    assert_eq!(missing[0].reason, "not found");
}

#[test]
fn test_cancelled_build() {
    let start = details(PluginDescriptor::new("A", "1.0"));
    let finder = MapFinder::default();
    let token = CancellationToken::new();
    token.cancel();

    let result = DepGraphBuilder::new(&finder).with_cancellation(token).build(&start);
    assert!(matches!(result, Err(DependencyError::Cancelled)));
}

#[test]
fn test_repository_handles_released_with_resolution() {
    struct Provider;
    impl ResourceProvider<PluginCoordinate, PluginDetails> for Provider {
        fn provide(&self, key: &PluginCoordinate) -> ProvideResult<PluginDetails> {
            ProvideResult::Provided(PluginDetails::new(
                PluginDescriptor::new(&key.id, &key.version),
                Arc::new(EmptyResolver),
            ))
        }
    }

    let repository = InMemoryPluginRepository::new();
    repository.add(Arc::new(PluginDescriptor::new("B", "1.0")));
    repository.add(Arc::new(PluginDescriptor::new("B", "1.1")));
    let cache = ResourceCache::new("plugins", 2, Arc::new(Provider));
    let finder = RepositoryDependencyFinder::new(Arc::new(repository), cache.clone());

    let start = details(PluginDescriptor::new("A", "1.0").with_dependency(PluginDependency::plugin("B")));
    let resolution = DepGraphBuilder::new(&finder).build(&start).unwrap();
    let key = PluginCoordinate::new("B", "1.1");
    assert_eq!(resolution.handles.len(), 1);
    assert_eq!(cache.ref_count(&key), Some(1));

    resolution.release();
    assert_eq!(cache.ref_count(&key), Some(0));
}
