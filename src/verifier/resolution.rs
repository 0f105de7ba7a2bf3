//! Member Resolution
//!
//! Field and method lookup following the JVM resolution rules: which
//! classes are searched, and in which order, depends on the instruction.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::bytecode::{ClassFile, FieldInfo, MethodInfo, JAVA_LANG_OBJECT};
use crate::resolver::Resolver;

/// A method found during resolution and the class declaring it
#[derive(Debug, Clone)]
pub struct ResolvedMethod {
    pub declaring: Arc<ClassFile>,
    index: usize,
}

impl ResolvedMethod {
    pub fn method(&self) -> &MethodInfo {
        &self.declaring.methods[self.index]
    }
}

/// A field found during resolution and the class declaring it
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub declaring: Arc<ClassFile>,
    index: usize,
}

impl ResolvedField {
    pub fn field(&self) -> &FieldInfo {
        &self.declaring.fields[self.index]
    }
}

pub struct MemberResolver<'r> {
    resolver: &'r dyn Resolver,
}

impl<'r> MemberResolver<'r> {
    pub fn new(resolver: &'r dyn Resolver) -> Self {
        Self { resolver }
    }

    pub fn class(&self, name: &str) -> Option<Arc<ClassFile>> {
        self.resolver.lookup(name).found()
    }

    /// `start` followed by its resolvable superclasses
    pub fn superclass_chain(&self, start: &Arc<ClassFile>) -> Vec<Arc<ClassFile>> {
        let mut chain = vec![Arc::clone(start)];
        let mut seen: HashSet<String> = HashSet::from([start.name.clone()]);
        let mut current = start.super_name.clone();
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                break;
            }
            let Some(class) = self.class(&name) else {
                break;
            };
            current = class.super_name.clone();
            chain.push(class);
        }
        chain
    }

    /// Every resolvable interface implemented by `classes`, breadth first
    pub fn superinterfaces(&self, classes: &[Arc<ClassFile>]) -> Vec<Arc<ClassFile>> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<String> = classes
            .iter()
            .flat_map(|c| c.interfaces.iter().cloned())
            .collect();
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(interface) = self.class(&name) {
                queue.extend(interface.interfaces.iter().cloned());
                result.push(interface);
            }
        }
        result
    }

    /// Whether `class_name` is `ancestor` or inherits from it through any supertype
    pub fn is_subtype_of(&self, class_name: &str, ancestor: &str) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([class_name.to_string()]);
        while let Some(name) = queue.pop_front() {
            if name == ancestor {
                return true;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(class) = self.class(&name) {
                queue.extend(class.supertypes().map(str::to_string));
            }
        }
        false
    }

    /// Whether `ancestor` is on the superclass chain of `class`
    pub fn is_subclass_of(&self, class: &Arc<ClassFile>, ancestor: &str) -> bool {
        self.superclass_chain(class).iter().any(|c| c.name == ancestor)
    }

    /// Field lookup: the class, its superinterfaces when `include_interfaces`,
    /// then the superclass, recursively
    pub fn resolve_field(
        &self,
        owner: &Arc<ClassFile>,
        name: &str,
        descriptor: &str,
        include_interfaces: bool,
    ) -> Option<ResolvedField> {
        let mut seen = HashSet::new();
        self.field_in(owner, name, descriptor, include_interfaces, &mut seen)
    }

    fn field_in(
        &self,
        class: &Arc<ClassFile>,
        name: &str,
        descriptor: &str,
        include_interfaces: bool,
        seen: &mut HashSet<String>,
    ) -> Option<ResolvedField> {
        if !seen.insert(class.name.clone()) {
            return None;
        }
        if let Some(index) = class
            .fields
            .iter()
            .position(|f| f.name == name && f.descriptor == descriptor)
        {
            return Some(ResolvedField {
                declaring: Arc::clone(class),
                index,
            });
        }
        if include_interfaces {
            for interface in &class.interfaces {
                if let Some(interface) = self.class(interface) {
                    if let Some(found) = self.field_in(&interface, name, descriptor, true, seen) {
                        return Some(found);
                    }
                }
            }
        }
        let super_class = self.class(class.super_name.as_deref()?)?;
        self.field_in(&super_class, name, descriptor, include_interfaces, seen)
    }

    /// Method lookup for a CONSTANT_Methodref: the class and its superclasses,
    /// then the maximally-specific superinterface methods. Constructors are
    /// only looked up in the named class.
    pub fn resolve_class_method(&self, owner: &Arc<ClassFile>, name: &str, descriptor: &str) -> Option<ResolvedMethod> {
        if name == "<init>" || name == "<clinit>" {
            return declared(owner, name, descriptor);
        }
        let chain = self.superclass_chain(owner);
        if let Some(found) = chain.iter().find_map(|c| declared(c, name, descriptor)) {
            return Some(found);
        }
        self.maximally_specific(&chain, name, descriptor)
    }

    /// Method lookup for a CONSTANT_InterfaceMethodref: the interface, public
    /// methods of `java/lang/Object`, then superinterfaces
    pub fn resolve_interface_method(&self, owner: &Arc<ClassFile>, name: &str, descriptor: &str) -> Option<ResolvedMethod> {
        if let Some(found) = declared(owner, name, descriptor) {
            return Some(found);
        }
        if let Some(object) = self.class(JAVA_LANG_OBJECT) {
            if let Some(found) = declared(&object, name, descriptor) {
                let method = found.method();
                if method.access.is_public() && !method.access.is_static() {
                    return Some(found);
                }
            }
        }
        self.maximally_specific(std::slice::from_ref(owner), name, descriptor)
    }

    /// Lookup restricted to the named class itself
    pub fn resolve_declared_method(&self, owner: &Arc<ClassFile>, name: &str, descriptor: &str) -> Option<ResolvedMethod> {
        declared(owner, name, descriptor)
    }

    fn maximally_specific(&self, roots: &[Arc<ClassFile>], name: &str, descriptor: &str) -> Option<ResolvedMethod> {
        let candidates: Vec<ResolvedMethod> = self
            .superinterfaces(roots)
            .iter()
            .filter_map(|interface| declared(interface, name, descriptor))
            .filter(|found| {
                let access = found.method().access;
                !access.is_private() && !access.is_static()
            })
            .collect();

        let most_specific: Vec<&ResolvedMethod> = candidates
            .iter()
            .filter(|candidate| {
                !candidates.iter().any(|other| {
                    other.declaring.name != candidate.declaring.name
                        && self.is_subtype_of(&other.declaring.name, &candidate.declaring.name)
                })
            })
            .collect();

        let concrete: Vec<&&ResolvedMethod> = most_specific
            .iter()
            .filter(|m| !m.method().access.is_abstract())
            .collect();
        if concrete.len() == 1 {
            return Some((*concrete[0]).clone());
        }
        most_specific.first().map(|m| (*m).clone())
    }
}

fn declared(class: &Arc<ClassFile>, name: &str, descriptor: &str) -> Option<ResolvedMethod> {
    class
        .methods
        .iter()
        .position(|m| m.name == name && m.descriptor == descriptor)
        .map(|index| ResolvedMethod {
            declaring: Arc::clone(class),
            index,
        })
}
