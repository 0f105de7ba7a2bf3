//! Verification run orchestration

use anyhow::{Context, Result};
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cache::{DiskSpaceCleaner, FileLockRegistry, ResourceCache};
use crate::cli::{self, OutputFormat};
use crate::config::VerifierConfig;
use crate::dependencies::{InMemoryPluginRepository, PluginRepository, RepositoryDependencyFinder};
use crate::host::{HostVersion, LocalHost, LocalHostStore};
use crate::output;
use crate::plugin::{LocalPluginStore, PluginCoordinate, PluginDetails};
use crate::resolver::{DirectoryResolver, Resolver};
use crate::tasks::{TaskError, TaskScheduler};
use crate::verification::{
    HostSelection, LogReporter, PluginVerifier, ResultsAggregator, VerifierParameters, VerifyPluginTask,
};
use crate::verifier::{DocumentedProblemsFilter, IgnoredProblemsFilter, ProblemsFilter};

/// Problem filters from configured patterns plus the optional filter files
pub fn build_filters(args: &cli::Args, config: &VerifierConfig) -> Result<Vec<Arc<dyn ProblemsFilter>>> {
    let mut filters: Vec<Arc<dyn ProblemsFilter>> = Vec::new();

    let mut patterns = config.ignored_problems.join("\n");
    if let Some(path) = &args.ignored_problems {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ignored problems from {}", path.display()))?;
        patterns.push('\n');
        patterns.push_str(&text);
    }
    let ignored = IgnoredProblemsFilter::parse(&patterns)?;
    if !ignored.is_empty() {
        debug!("{} ignored problem patterns", ignored.len());
        filters.push(Arc::new(ignored));
    }

    if let Some(path) = &config.documented_problems {
        let documented = DocumentedProblemsFilter::load(path)?;
        info!("Loaded {} documented problems from {}", documented.len(), path.display());
        filters.push(Arc::new(documented));
    }
    Ok(filters)
}

/// Resolvers for each extra classpath directory
pub fn open_classpath(paths: &[PathBuf]) -> Result<Vec<Arc<dyn Resolver>>> {
    paths
        .iter()
        .map(|path| {
            let resolver = DirectoryResolver::open(path)
                .with_context(|| format!("Failed to open classpath entry {}", path.display()))?;
            debug!("Classpath entry {} holds {} classes", path.display(), resolver.len());
            Ok(Arc::new(resolver) as Arc<dyn Resolver>)
        })
        .collect()
}

/// Explicit `--host-version` values, or every host in the store filtered by plugin range
pub fn host_selection(args: &cli::Args, host_store: &LocalHostStore) -> Result<HostSelection> {
    if args.host_versions.is_empty() {
        let available = host_store.available_versions();
        if available.is_empty() {
            anyhow::bail!("No host builds found in {}", host_store.root().display());
        }
        return Ok(HostSelection::CompatibleWith(available));
    }
    let versions = args
        .host_versions
        .iter()
        .map(|text| HostVersion::parse(text).with_context(|| format!("Invalid host version '{}'", text)))
        .collect::<Result<Vec<_>>>()?;
    Ok(HostSelection::Versions(versions))
}

/// Plugins named as `id:version` or `id` (newest version); every stored plugin when none are named
pub fn resolve_plugins(
    names: &[String],
    store: &LocalPluginStore,
    repository: &dyn PluginRepository,
) -> Result<Vec<PluginCoordinate>> {
    if names.is_empty() {
        let mut coordinates: Vec<_> = store.descriptors().iter().map(|d| d.coordinate()).collect();
        coordinates.sort();
        return Ok(coordinates);
    }
    names
        .iter()
        .map(|name| match name.split_once(':') {
            Some((id, version)) => Ok(PluginCoordinate::new(id, version)),
            None => repository
                .last_version(name)
                .with_context(|| format!("Plugin '{}' not found in {}", name, store.root().display())),
        })
        .collect()
}

/// Verify every selected plugin and print the results. Returns whether any
/// verdict counts as a failure.
pub async fn run_verification(args: cli::Args, config: VerifierConfig) -> Result<bool> {
    let locks = FileLockRegistry::new();
    let plugin_store = Arc::new(LocalPluginStore::new(&args.plugins_dir, locks.clone()));
    let host_store = Arc::new(LocalHostStore::new(&args.hosts_dir, locks.clone()));
    let repository = Arc::new(InMemoryPluginRepository::from_store(&plugin_store));

    let plugin_cache: ResourceCache<PluginCoordinate, PluginDetails> =
        ResourceCache::new("plugins", config.plugin_cache_capacity, plugin_store.clone());
    let host_cache: ResourceCache<HostVersion, LocalHost> =
        ResourceCache::new("hosts", config.host_cache_capacity, host_store.clone());

    let params = VerifierParameters {
        external_prefixes: config.external_prefixes.clone(),
        filters: build_filters(&args, &config)?,
        extra_classpath: open_classpath(&args.classpath)?,
    };
    let verifier = Arc::new(
        PluginVerifier::new(params)
            .with_repository_finder(Arc::new(RepositoryDependencyFinder::new(repository.clone(), plugin_cache.clone()))),
    );

    let hosts = host_selection(&args, &host_store)?;
    let plugins = resolve_plugins(&args.plugins, &plugin_store, repository.as_ref())?;
    if plugins.is_empty() {
        warn!("No plugins to verify in {}", args.plugins_dir.display());
    }
    info!("Verifying {} plugins", plugins.len());

    let cleanup_token = CancellationToken::new();
    if let Some(dir) = &config.cache_dir {
        let cleaner = Arc::new(DiskSpaceCleaner::new(dir, config.disk_quota_bytes, locks.clone()));
        cleaner.spawn_periodic(config.cleanup_interval, cleanup_token.clone());
    }

    let scheduler = TaskScheduler::new(config.workers);
    let interrupt = scheduler.clone();
    let interrupt_watch = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling verification");
            interrupt.cancel_all();
        }
    });

    let reporter = Arc::new(LogReporter);
    let handles: Vec<_> = plugins
        .into_iter()
        .map(|plugin| {
            scheduler.submit(VerifyPluginTask::new(
                plugin,
                hosts.clone(),
                plugin_cache.clone(),
                host_cache.clone(),
                Arc::clone(&verifier),
                reporter.clone(),
            ))
        })
        .collect();

    let aggregator = ResultsAggregator::new();
    for outcome in join_all(handles.into_iter().map(|h| h.join())).await {
        match outcome {
            Ok(results) => aggregator.add_results(results),
            Err(TaskError::Cancelled) => debug!("Verification task cancelled"),
            Err(e) => error!("Verification task failed: {}", e),
        }
    }
    interrupt_watch.abort();
    cleanup_token.cancel();

    let stats = scheduler.stats();
    info!(
        "Tasks: {} succeeded, {} failed, {} cancelled",
        stats.succeeded, stats.failed, stats.cancelled
    );
    debug!("Plugin cache: {:?}, host cache: {:?}", plugin_cache.stats(), host_cache.stats());

    let reports = aggregator.reports();
    match args.format {
        OutputFormat::Table => print!("{}", output::format_summary_table(&reports)),
        OutputFormat::Json => println!("{}", output::format_json(&reports)?),
    }
    if stats.cancelled > 0 {
        anyhow::bail!("Verification cancelled after {} reports", reports.len());
    }
    Ok(aggregator.has_failures())
}
