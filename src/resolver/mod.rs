//! Class Resolvers
//!
//! A resolver maps an internal class name to its decoded class. The
//! verification classpath is a [`UnionResolver`] of the plugin, its
//! dependencies, the host and any extra sources, searched in that order.

pub mod directory;
pub mod error;
pub mod fixed;
pub mod union;

pub use directory::DirectoryResolver;
pub use error::{ResolverError, ResolverResult};
pub use fixed::FixedClassesResolver;
pub use union::UnionResolver;

use std::fmt;
use std::sync::Arc;

use crate::bytecode::ClassFile;

/// Outcome of looking up one class
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Arc<ClassFile>),
    NotFound,
    /// The class exists in the source but could not be decoded
    Invalid(String),
}

impl Lookup {
    pub fn found(self) -> Option<Arc<ClassFile>> {
        match self {
            Lookup::Found(class) => Some(class),
            Lookup::NotFound | Lookup::Invalid(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// A source of classes
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Find a class by internal name
    fn lookup(&self, class_name: &str) -> Lookup;

    /// Whether the source holds a class with this name, without decoding it
    fn contains(&self, class_name: &str) -> bool;

    /// All class names in the source, sorted
    fn class_names(&self) -> Vec<String>;

    /// Short human-readable label for log messages
    fn description(&self) -> String;
}

/// A resolver with no classes
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyResolver;

impl Resolver for EmptyResolver {
    fn lookup(&self, _class_name: &str) -> Lookup {
        Lookup::NotFound
    }

    fn contains(&self, _class_name: &str) -> bool {
        false
    }

    fn class_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn description(&self) -> String {
        "empty".to_string()
    }
}

/// Shared handle to any resolver
pub type SharedResolver = Arc<dyn Resolver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_resolver() {
        let resolver = EmptyResolver;
        assert!(matches!(resolver.lookup("java/lang/Object"), Lookup::NotFound));
        assert!(!resolver.contains("java/lang/Object"));
        assert!(resolver.class_names().is_empty());
    }
}
