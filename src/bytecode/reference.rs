//! Symbolic References
//!
//! Class, method and field references as they appear in bytecode
//! instructions. Names use the JVM internal form (`java/lang/Object`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a class by internal name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassReference {
    pub class_name: String,
}

impl ClassReference {
    pub fn new<S: Into<String>>(class_name: S) -> Self {
        Self { class_name: class_name.into() }
    }

    /// Package part of the internal name (empty for the default package)
    pub fn package_name(&self) -> &str {
        package_of(&self.class_name)
    }
}

impl fmt::Display for ClassReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_java_name(&self.class_name))
    }
}

/// Reference to a method: owner + name + descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodReference {
    pub owner: ClassReference,
    pub name: String,
    pub descriptor: String,
}

impl MethodReference {
    pub fn new<O: Into<String>, N: Into<String>, D: Into<String>>(owner: O, name: N, descriptor: D) -> Self {
        Self {
            owner: ClassReference::new(owner),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

impl fmt::Display for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// Reference to a field: owner + name + descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldReference {
    pub owner: ClassReference,
    pub name: String,
    pub descriptor: String,
}

impl FieldReference {
    pub fn new<O: Into<String>, N: Into<String>, D: Into<String>>(owner: O, name: N, descriptor: D) -> Self {
        Self {
            owner: ClassReference::new(owner),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} : {}", self.owner, self.name, self.descriptor)
    }
}

/// Any symbolic reference carried by an instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolicReference {
    Class(ClassReference),
    Method(MethodReference),
    Field(FieldReference),
}

impl fmt::Display for SymbolicReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolicReference::Class(class) => class.fmt(f),
            SymbolicReference::Method(method) => method.fmt(f),
            SymbolicReference::Field(field) => field.fmt(f),
        }
    }
}

/// Package part of an internal class name
pub fn package_of(class_name: &str) -> &str {
    match class_name.rfind('/') {
        Some(pos) => &class_name[..pos],
        None => "",
    }
}

/// Convert `java/lang/Object` to `java.lang.Object`
pub fn to_java_name(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

/// Strip array dimensions from a class-constant name.
///
/// `[[Ljava/lang/String;` becomes `java/lang/String`, plain names are returned
/// unchanged and primitive arrays (`[I`) yield `None`.
pub fn array_element_class(name: &str) -> Option<&str> {
    if !name.starts_with('[') {
        return Some(name);
    }
    let element = name.trim_start_matches('[');
    element
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_element_class() {
        assert_eq!(array_element_class("java/lang/String"), Some("java/lang/String"));
        assert_eq!(array_element_class("[Ljava/lang/String;"), Some("java/lang/String"));
        assert_eq!(array_element_class("[[Lorg/Foo;"), Some("org/Foo"));
        assert_eq!(array_element_class("[I"), None);
        assert_eq!(array_element_class("[[J"), None);
    }

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("org/example/Foo"), "org/example");
        assert_eq!(package_of("Foo"), "");
        assert_eq!(ClassReference::new("a/b/C").package_name(), "a/b");
    }

    #[test]
    fn test_reference_display() {
        let method = MethodReference::new("org/example/Foo", "bar", "(I)V");
        assert_eq!(method.to_string(), "org.example.Foo.bar(I)V");

        let field = FieldReference::new("org/example/Foo", "count", "I");
        assert_eq!(field.to_string(), "org.example.Foo.count : I");
    }
}
