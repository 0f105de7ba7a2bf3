//! In-memory resolver over a fixed set of classes

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Lookup, Resolver};
use crate::bytecode::ClassFile;

#[derive(Debug)]
enum Source {
    Bytes(Vec<u8>),
    Parsed(Arc<ClassFile>),
}

/// Resolver over classes supplied up front, either as decoded models or as raw
/// class bytes decoded on first lookup
#[derive(Debug)]
pub struct FixedClassesResolver {
    label: String,
    classes: BTreeMap<String, Source>,
    decoded: DashMap<String, Result<Arc<ClassFile>, String>>,
}

impl FixedClassesResolver {
    pub fn new<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            classes: BTreeMap::new(),
            decoded: DashMap::new(),
        }
    }

    /// Build from decoded class models
    pub fn from_classes<S, I>(label: S, classes: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = ClassFile>,
    {
        let mut resolver = Self::new(label);
        for class in classes {
            resolver.add_class(class);
        }
        resolver
    }

    /// Build from `(internal name, class bytes)` pairs
    pub fn from_bytes<S, I>(label: S, classes: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut resolver = Self::new(label);
        for (name, bytes) in classes {
            resolver.classes.insert(name, Source::Bytes(bytes));
        }
        resolver
    }

    pub fn add_class(&mut self, class: ClassFile) {
        self.classes.insert(class.name.clone(), Source::Parsed(Arc::new(class)));
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Resolver for FixedClassesResolver {
    fn lookup(&self, class_name: &str) -> Lookup {
        match self.classes.get(class_name) {
            None => Lookup::NotFound,
            Some(Source::Parsed(class)) => Lookup::Found(Arc::clone(class)),
            Some(Source::Bytes(bytes)) => {
                let entry = self
                    .decoded
                    .entry(class_name.to_string())
                    .or_insert_with(|| decode(class_name, bytes));
                match entry.value() {
                    Ok(class) => Lookup::Found(Arc::clone(class)),
                    Err(message) => Lookup::Invalid(message.clone()),
                }
            }
        }
    }

    fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    fn description(&self) -> String {
        self.label.clone()
    }
}

/// Decode class bytes, requiring the declared name to match the expected one
pub(crate) fn decode(expected: &str, bytes: &[u8]) -> Result<Arc<ClassFile>, String> {
    let class = ClassFile::parse(bytes).map_err(|e| e.to_string())?;
    if class.name != expected {
        return Err(format!("class file declares {} but was found as {}", class.name, expected));
    }
    Ok(Arc::new(class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::write_class;

    #[test]
    fn test_lookup_decoded_models() {
        let resolver = FixedClassesResolver::from_classes(
            "plugin",
            vec![ClassFile::new("a/B"), ClassFile::new("a/A")],
        );

        assert!(resolver.lookup("a/A").is_found());
        assert!(matches!(resolver.lookup("a/C"), Lookup::NotFound));
        assert_eq!(resolver.class_names(), vec!["a/A".to_string(), "a/B".to_string()]);
    }

    #[test]
    fn test_lookup_bytes_decodes_once() {
        let bytes = write_class(&ClassFile::new("a/B"));
        let resolver = FixedClassesResolver::from_bytes("plugin", vec![("a/B".to_string(), bytes)]);

        let first = resolver.lookup("a/B").found().unwrap();
        let second = resolver.lookup("a/B").found().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalid_bytes() {
        let resolver = FixedClassesResolver::from_bytes(
            "plugin",
            vec![
                ("a/Broken".to_string(), vec![0, 1, 2]),
                ("a/Wrong".to_string(), write_class(&ClassFile::new("a/Other"))),
            ],
        );

        assert!(matches!(resolver.lookup("a/Broken"), Lookup::Invalid(_)));
        match resolver.lookup("a/Wrong") {
            Lookup::Invalid(message) => assert!(message.contains("a/Other")),
            other => panic!("expected invalid lookup, got {:?}", other),
        }
        assert!(resolver.contains("a/Broken"));
    }
}
