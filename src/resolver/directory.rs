//! Resolver over a directory tree of `.class` files

use dashmap::DashMap;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{ResolverError, ResolverResult};
use super::fixed::decode;
use super::{Lookup, Resolver};
use crate::bytecode::ClassFile;

/// Resolver indexing `<root>/a/b/C.class` as `a/b/C`; files are read and
/// decoded on first lookup
#[derive(Debug)]
pub struct DirectoryResolver {
    root: PathBuf,
    index: BTreeMap<String, PathBuf>,
    decoded: DashMap<String, Result<Arc<ClassFile>, String>>,
}

impl DirectoryResolver {
    pub fn open<P: AsRef<Path>>(root: P) -> ResolverResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ResolverError::NotADirectory { path: root });
        }

        let mut index = BTreeMap::new();
        collect_classes(&root, &root, &mut index)?;
        debug!("Indexed {} classes under {}", index.len(), root.display());

        Ok(Self {
            root,
            index,
            decoded: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn collect_classes(root: &Path, dir: &Path, index: &mut BTreeMap<String, PathBuf>) -> ResolverResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| ResolverError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| ResolverError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_classes(root, &path, index)?;
        } else if path.extension().is_some_and(|ext| ext == "class") {
            if let Some(name) = internal_name(root, &path) {
                index.insert(name, path);
            }
        }
    }
    Ok(())
}

fn internal_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

impl Resolver for DirectoryResolver {
    fn lookup(&self, class_name: &str) -> Lookup {
        let Some(path) = self.index.get(class_name) else {
            return Lookup::NotFound;
        };
        let entry = self.decoded.entry(class_name.to_string()).or_insert_with(|| {
            fs::read(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))
                .and_then(|bytes| decode(class_name, &bytes))
        });
        match entry.value() {
            Ok(class) => Lookup::Found(Arc::clone(class)),
            Err(message) => Lookup::Invalid(message.clone()),
        }
    }

    fn contains(&self, class_name: &str) -> bool {
        self.index.contains_key(class_name)
    }

    fn class_names(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    fn description(&self) -> String {
        self.root.display().to_string()
    }
}
