//! Class Hierarchy Resolution
//!
//! Builds the supertype tree of a class against a resolver. Results are
//! memoized for the lifetime of one builder (one verification run), and a
//! class met again while its own supertypes are being resolved is emitted as
//! a cycle point leaf instead of being expanded again.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::bytecode::to_java_name;
use crate::resolver::{Lookup, Resolver};

/// How a node in the hierarchy was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HierarchyStatus {
    Resolved,
    /// The class could not be located (or decoded)
    Unresolved,
    /// The class closes a cycle and was not expanded again
    CyclePoint,
}

/// A class with its resolved superclass and interface trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHierarchy {
    pub name: String,
    pub status: HierarchyStatus,
    pub is_interface: bool,
    pub super_class: Option<Arc<ClassHierarchy>>,
    pub interfaces: Vec<Arc<ClassHierarchy>>,
}

impl ClassHierarchy {
    fn leaf(name: &str, status: HierarchyStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            is_interface: false,
            super_class: None,
            interfaces: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == HierarchyStatus::Resolved
    }

    /// Direct supertypes, superclass first
    pub fn supertypes(&self) -> impl Iterator<Item = &Arc<ClassHierarchy>> {
        self.super_class.iter().chain(self.interfaces.iter())
    }

    /// Names of every unresolved node below this one, sorted
    pub fn unresolved_supertypes(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        self.collect(&mut |node| {
            if node.status == HierarchyStatus::Unresolved {
                names.insert(node.name.clone());
            }
        });
        names.into_iter().collect()
    }

    /// Unresolved classes on the superclass chain only
    pub fn unresolved_superclasses(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = self.super_class.as_ref();
        while let Some(node) = current {
            if node.status == HierarchyStatus::Unresolved {
                names.push(node.name.clone());
            }
            current = node.super_class.as_ref();
        }
        names
    }

    /// Unresolved interfaces anywhere in the tree
    pub fn unresolved_interfaces(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        let superclasses: HashSet<String> = self.unresolved_superclasses().into_iter().collect();
        for name in self.unresolved_supertypes() {
            if !superclasses.contains(&name) {
                names.insert(name);
            }
        }
        names.into_iter().collect()
    }

    pub fn cycle_points(&self) -> usize {
        let mut count = 0;
        self.collect(&mut |node| {
            if node.status == HierarchyStatus::CyclePoint {
                count += 1;
            }
        });
        count
    }

    fn collect(&self, visit: &mut dyn FnMut(&ClassHierarchy)) {
        for supertype in self.supertypes() {
            visit(supertype);
            supertype.collect(visit);
        }
    }

    /// Hint appended to "not found" diagnostics when part of the hierarchy
    /// could not be resolved
    pub fn might_be_declared_in_unresolved_supertypes(&self, element: &str, include_interfaces: bool) -> Option<String> {
        let mut unresolved = self.unresolved_superclasses();
        if include_interfaces {
            unresolved.extend(self.unresolved_interfaces());
        }
        if unresolved.is_empty() {
            return None;
        }
        let names: Vec<String> = unresolved.iter().map(|n| to_java_name(n)).collect();
        Some(format!(
            "The {} might be declared in an unresolved supertype: {}",
            element,
            names.join(", ")
        ))
    }
}

/// Memoizing, cycle-safe hierarchy builder over one resolver
pub struct ClassHierarchyBuilder<'r> {
    resolver: &'r dyn Resolver,
    memo: HashMap<String, Arc<ClassHierarchy>>,
    visiting: HashSet<String>,
}

impl<'r> ClassHierarchyBuilder<'r> {
    pub fn new(resolver: &'r dyn Resolver) -> Self {
        Self {
            resolver,
            memo: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    pub fn resolve(&mut self, class_name: &str) -> Arc<ClassHierarchy> {
        if let Some(known) = self.memo.get(class_name) {
            return Arc::clone(known);
        }
        if self.visiting.contains(class_name) {
            return Arc::new(ClassHierarchy::leaf(class_name, HierarchyStatus::CyclePoint));
        }

        let class = match self.resolver.lookup(class_name) {
            Lookup::Found(class) => class,
            Lookup::NotFound | Lookup::Invalid(_) => {
                let leaf = Arc::new(ClassHierarchy::leaf(class_name, HierarchyStatus::Unresolved));
                self.memo.insert(class_name.to_string(), Arc::clone(&leaf));
                return leaf;
            }
        };

        self.visiting.insert(class_name.to_string());
        let super_class = class.super_name.as_deref().map(|name| self.resolve(name));
        let interfaces = class.interfaces.iter().map(|name| self.resolve(name)).collect();
        self.visiting.remove(class_name);

        let hierarchy = Arc::new(ClassHierarchy {
            name: class_name.to_string(),
            status: HierarchyStatus::Resolved,
            is_interface: class.is_interface(),
            super_class,
            interfaces,
        });
        self.memo.insert(class_name.to_string(), Arc::clone(&hierarchy));
        hierarchy
    }

    /// Number of memoized hierarchies
    pub fn memo_size(&self) -> usize {
        self.memo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{ClassFile, JAVA_LANG_OBJECT};
    use crate::resolver::FixedClassesResolver;

    fn resolver(classes: Vec<ClassFile>) -> FixedClassesResolver {
        FixedClassesResolver::from_classes("test", classes)
    }

    #[test]
    fn test_resolves_superclass_and_interfaces() {
        let resolver = resolver(vec![
            ClassFile::new(JAVA_LANG_OBJECT),
            ClassFile::new("a/Base"),
            ClassFile::interface("a/I"),
            ClassFile::new("a/Impl").with_super("a/Base").with_interface("a/I"),
        ]);
        let mut builder = ClassHierarchyBuilder::new(&resolver);
        let hierarchy = builder.resolve("a/Impl");

        assert!(hierarchy.is_resolved());
        let base = hierarchy.super_class.as_ref().unwrap();
        assert_eq!(base.name, "a/Base");
        assert_eq!(base.super_class.as_ref().unwrap().name, JAVA_LANG_OBJECT);
        assert!(hierarchy.interfaces[0].is_interface);
        assert!(hierarchy.unresolved_supertypes().is_empty());
        assert_eq!(hierarchy.cycle_points(), 0);
    }

    #[test]
    fn test_unresolved_supertypes_are_flagged() {
        let resolver = resolver(vec![ClassFile::new("a/Impl")
            .with_super("x/Missing")
            .with_interface("x/MissingI")]);
        let mut builder = ClassHierarchyBuilder::new(&resolver);
        let hierarchy = builder.resolve("a/Impl");

        assert!(hierarchy.is_resolved());
        assert_eq!(
            hierarchy.unresolved_supertypes(),
            vec!["x/Missing".to_string(), "x/MissingI".to_string()]
        );
        assert_eq!(hierarchy.unresolved_superclasses(), vec!["x/Missing".to_string()]);
        assert_eq!(hierarchy.unresolved_interfaces(), vec!["x/MissingI".to_string()]);
        let hint = hierarchy.might_be_declared_in_unresolved_supertypes("method", true).unwrap();
        assert!(hint.contains("x.Missing, x.MissingI"));
        assert!(hierarchy.might_be_declared_in_unresolved_supertypes("field", false).unwrap().contains("x.Missing"));
    }

    #[test]
    fn test_cycle_terminates_with_one_mark() {
        let resolver = resolver(vec![
            ClassFile::new("a/A").with_super("a/B"),
            ClassFile::new("a/B").with_super("a/A"),
        ]);
        let mut builder = ClassHierarchyBuilder::new(&resolver);
        let hierarchy = builder.resolve("a/A");

        assert_eq!(hierarchy.cycle_points(), 1);
        let b = hierarchy.super_class.as_ref().unwrap();
        let closing = b.super_class.as_ref().unwrap();
        assert_eq!(closing.name, "a/A");
        assert_eq!(closing.status, HierarchyStatus::CyclePoint);
        assert!(closing.super_class.is_none());
    }

    #[test]
    fn test_self_cycle_through_interface() {
        let resolver = resolver(vec![ClassFile::interface("a/I").with_interface("a/I")]);
        let mut builder = ClassHierarchyBuilder::new(&resolver);
        let hierarchy = builder.resolve("a/I");
        assert_eq!(hierarchy.cycle_points(), 1);
    }

    #[test]
    fn test_memoizes_shared_supertypes() {
        let resolver = resolver(vec![
            ClassFile::new("a/Base"),
            ClassFile::new("a/One").with_super("a/Base"),
            ClassFile::new("a/Two").with_super("a/Base"),
        ]);
        let mut builder = ClassHierarchyBuilder::new(&resolver);
        let one = builder.resolve("a/One");
        let two = builder.resolve("a/Two");

        assert!(Arc::ptr_eq(
            one.super_class.as_ref().unwrap(),
            two.super_class.as_ref().unwrap()
        ));
        // One, Two, Base and the unresolved java/lang/Object leaf
        assert_eq!(builder.memo_size(), 4);
    }
}
