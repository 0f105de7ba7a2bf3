//! Compatibility Problems
//!
//! The closed set of problems the checker reports. Two problems are equal
//! when they have the same type, reference, instruction and accessing
//! location; the owner hierarchy and rendered text never take part.

use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::hierarchy::ClassHierarchy;
use crate::bytecode::{to_java_name, ClassReference, FieldReference, InstructionKind, MethodReference, SymbolicReference};

/// Why a member or class is inaccessible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    Private,
    Protected,
    PackagePrivate,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AccessType::Private => "private",
            AccessType::Protected => "protected",
            AccessType::PackagePrivate => "package-private",
        };
        f.write_str(text)
    }
}

/// Where in the plugin a problem was found
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProblemLocation {
    Class {
        class_name: String,
    },
    Method {
        class_name: String,
        method_name: String,
        descriptor: String,
    },
}

impl ProblemLocation {
    pub fn class<S: Into<String>>(class_name: S) -> Self {
        Self::Class {
            class_name: class_name.into(),
        }
    }

    pub fn method<C: Into<String>, N: Into<String>, D: Into<String>>(class_name: C, method_name: N, descriptor: D) -> Self {
        Self::Method {
            class_name: class_name.into(),
            method_name: method_name.into(),
            descriptor: descriptor.into(),
        }
    }

    pub fn class_name(&self) -> &str {
        match self {
            ProblemLocation::Class { class_name } | ProblemLocation::Method { class_name, .. } => class_name,
        }
    }
}

impl fmt::Display for ProblemLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProblemLocation::Class { class_name } => write!(f, "{}", to_java_name(class_name)),
            ProblemLocation::Method {
                class_name,
                method_name,
                descriptor,
            } => write!(f, "{}.{}{}", to_java_name(class_name), method_name, descriptor),
        }
    }
}

/// Problem category, used for grouping and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ProblemType {
    ClassNotFound,
    MethodNotFound,
    FieldNotFound,
    MethodNotImplemented,
    IllegalMethodAccess,
    IllegalFieldAccess,
    IllegalClassAccess,
    OverridingFinalMethod,
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProblemType::ClassNotFound => "Class not found",
            ProblemType::MethodNotFound => "Method not found",
            ProblemType::FieldNotFound => "Field not found",
            ProblemType::MethodNotImplemented => "Method not implemented",
            ProblemType::IllegalMethodAccess => "Illegal method invocation",
            ProblemType::IllegalFieldAccess => "Illegal field access",
            ProblemType::IllegalClassAccess => "Illegal class access",
            ProblemType::OverridingFinalMethod => "Overriding final method",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub enum CompatibilityProblem {
    ClassNotFound {
        reference: ClassReference,
        location: ProblemLocation,
        /// `None` for supertype references
        instruction: Option<InstructionKind>,
    },
    MethodNotFound {
        reference: MethodReference,
        location: ProblemLocation,
        instruction: InstructionKind,
        owner_hierarchy: Arc<ClassHierarchy>,
    },
    FieldNotFound {
        reference: FieldReference,
        location: ProblemLocation,
        instruction: InstructionKind,
        owner_hierarchy: Arc<ClassHierarchy>,
    },
    MethodNotImplemented {
        /// The abstract method left without implementation
        method: MethodReference,
        location: ProblemLocation,
    },
    IllegalMethodAccess {
        reference: MethodReference,
        /// Method the reference resolved to
        resolved: MethodReference,
        access: AccessType,
        location: ProblemLocation,
        instruction: InstructionKind,
    },
    IllegalFieldAccess {
        reference: FieldReference,
        resolved: FieldReference,
        access: AccessType,
        location: ProblemLocation,
        instruction: InstructionKind,
    },
    IllegalClassAccess {
        reference: ClassReference,
        access: AccessType,
        location: ProblemLocation,
        instruction: Option<InstructionKind>,
    },
    OverridingFinalMethod {
        /// The final method being overridden
        method: MethodReference,
        location: ProblemLocation,
    },
}

/// The fields problem equality is defined over
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProblemIdentity<'a> {
    problem_type: ProblemType,
    reference: SymbolicReference,
    instruction: Option<InstructionKind>,
    location: &'a ProblemLocation,
}

impl CompatibilityProblem {
    pub fn problem_type(&self) -> ProblemType {
        match self {
            CompatibilityProblem::ClassNotFound { .. } => ProblemType::ClassNotFound,
            CompatibilityProblem::MethodNotFound { .. } => ProblemType::MethodNotFound,
            CompatibilityProblem::FieldNotFound { .. } => ProblemType::FieldNotFound,
            CompatibilityProblem::MethodNotImplemented { .. } => ProblemType::MethodNotImplemented,
            CompatibilityProblem::IllegalMethodAccess { .. } => ProblemType::IllegalMethodAccess,
            CompatibilityProblem::IllegalFieldAccess { .. } => ProblemType::IllegalFieldAccess,
            CompatibilityProblem::IllegalClassAccess { .. } => ProblemType::IllegalClassAccess,
            CompatibilityProblem::OverridingFinalMethod { .. } => ProblemType::OverridingFinalMethod,
        }
    }

    pub fn location(&self) -> &ProblemLocation {
        match self {
            CompatibilityProblem::ClassNotFound { location, .. }
            | CompatibilityProblem::MethodNotFound { location, .. }
            | CompatibilityProblem::FieldNotFound { location, .. }
            | CompatibilityProblem::MethodNotImplemented { location, .. }
            | CompatibilityProblem::IllegalMethodAccess { location, .. }
            | CompatibilityProblem::IllegalFieldAccess { location, .. }
            | CompatibilityProblem::IllegalClassAccess { location, .. }
            | CompatibilityProblem::OverridingFinalMethod { location, .. } => location,
        }
    }

    pub fn instruction(&self) -> Option<InstructionKind> {
        match self {
            CompatibilityProblem::ClassNotFound { instruction, .. }
            | CompatibilityProblem::IllegalClassAccess { instruction, .. } => *instruction,
            CompatibilityProblem::MethodNotFound { instruction, .. }
            | CompatibilityProblem::FieldNotFound { instruction, .. }
            | CompatibilityProblem::IllegalMethodAccess { instruction, .. }
            | CompatibilityProblem::IllegalFieldAccess { instruction, .. } => Some(*instruction),
            CompatibilityProblem::MethodNotImplemented { .. } | CompatibilityProblem::OverridingFinalMethod { .. } => None,
        }
    }

    /// The reference the problem is about
    pub fn reference(&self) -> SymbolicReference {
        match self {
            CompatibilityProblem::ClassNotFound { reference, .. }
            | CompatibilityProblem::IllegalClassAccess { reference, .. } => SymbolicReference::Class(reference.clone()),
            CompatibilityProblem::MethodNotFound { reference, .. }
            | CompatibilityProblem::IllegalMethodAccess { reference, .. } => SymbolicReference::Method(reference.clone()),
            CompatibilityProblem::FieldNotFound { reference, .. }
            | CompatibilityProblem::IllegalFieldAccess { reference, .. } => SymbolicReference::Field(reference.clone()),
            CompatibilityProblem::MethodNotImplemented { method, .. }
            | CompatibilityProblem::OverridingFinalMethod { method, .. } => SymbolicReference::Method(method.clone()),
        }
    }

    fn identity(&self) -> ProblemIdentity<'_> {
        ProblemIdentity {
            problem_type: self.problem_type(),
            reference: self.reference(),
            instruction: self.instruction(),
            location: self.location(),
        }
    }

    pub fn short_description(&self) -> String {
        match self {
            CompatibilityProblem::ClassNotFound { reference, .. } => {
                format!("Access to unresolved class {}", reference)
            }
            CompatibilityProblem::MethodNotFound { reference, .. } => {
                format!("Invocation of unresolved method {}", reference)
            }
            CompatibilityProblem::FieldNotFound { reference, .. } => {
                format!("Access to unresolved field {}", reference)
            }
            CompatibilityProblem::MethodNotImplemented { method, location } => {
                format!("Abstract method {} is not implemented in {}", method, location)
            }
            CompatibilityProblem::IllegalMethodAccess { resolved, access, .. } => {
                format!("Illegal invocation of {} method {}", access, resolved)
            }
            CompatibilityProblem::IllegalFieldAccess { resolved, access, .. } => {
                format!("Illegal access to {} field {}", access, resolved)
            }
            CompatibilityProblem::IllegalClassAccess { reference, access, .. } => {
                format!("Illegal access to {} class {}", access, reference)
            }
            CompatibilityProblem::OverridingFinalMethod { method, .. } => {
                format!("Overriding a final method {}", method)
            }
        }
    }

    pub fn full_description(&self) -> String {
        match self {
            CompatibilityProblem::ClassNotFound {
                reference,
                location,
                instruction,
            } => match instruction {
                Some(instruction) => format!(
                    "Method {} contains a *{}* instruction referencing an unresolved class {}. \
                     This can lead to **NoClassDefFoundError** exception at runtime.",
                    location, instruction, reference
                ),
                None => format!(
                    "Class {} references an unresolved class {}. \
                     This can lead to **NoClassDefFoundError** exception at runtime.",
                    location, reference
                ),
            },
            CompatibilityProblem::MethodNotFound {
                reference,
                location,
                instruction,
                owner_hierarchy,
            } => {
                let mut text = format!(
                    "Method {} contains an *{}* instruction referencing an unresolved method {}. \
                     This can lead to **NoSuchMethodError** exception at runtime.",
                    location, instruction, reference
                );
                if let Some(hint) = owner_hierarchy.might_be_declared_in_unresolved_supertypes("method", true) {
                    text.push('\n');
                    text.push_str(&hint);
                }
                text
            }
            CompatibilityProblem::FieldNotFound {
                reference,
                location,
                instruction,
                owner_hierarchy,
            } => {
                let mut text = format!(
                    "Method {} contains a *{}* instruction referencing an unresolved field {}. \
                     This can lead to **NoSuchFieldError** exception at runtime.",
                    location, instruction, reference
                );
                // Instance fields can only come from superclasses
                if let Some(hint) =
                    owner_hierarchy.might_be_declared_in_unresolved_supertypes("field", instruction.is_static_field_access())
                {
                    text.push('\n');
                    text.push_str(&hint);
                }
                text
            }
            CompatibilityProblem::MethodNotImplemented { method, location } => format!(
                "Non-abstract class {} inherits from {} but does not implement the abstract method {}. \
                 This can lead to **AbstractMethodError** exception at runtime.",
                location,
                method.owner,
                method
            ),
            CompatibilityProblem::IllegalMethodAccess {
                resolved,
                access,
                location,
                instruction,
                ..
            } => format!(
                "Method {} contains an *{}* instruction referencing a {} method {} inaccessible to the class {}. \
                 This can lead to **IllegalAccessError** exception at runtime.",
                location,
                instruction,
                access,
                resolved,
                to_java_name(location.class_name())
            ),
            CompatibilityProblem::IllegalFieldAccess {
                resolved,
                access,
                location,
                instruction,
                ..
            } => format!(
                "Method {} contains a *{}* instruction referencing a {} field {} inaccessible to the class {}. \
                 This can lead to **IllegalAccessError** exception at runtime.",
                location,
                instruction,
                access,
                resolved,
                to_java_name(location.class_name())
            ),
            CompatibilityProblem::IllegalClassAccess {
                reference,
                access,
                location,
                ..
            } => format!(
                "{} references a {} class {} inaccessible to the class {}. \
                 This can lead to **IllegalAccessError** exception at runtime.",
                location,
                access,
                reference,
                to_java_name(location.class_name())
            ),
            CompatibilityProblem::OverridingFinalMethod { method, location } => format!(
                "Method {} overrides the final method {}. \
                 This can lead to **VerifyError** exception at runtime.",
                location, method
            ),
        }
    }
}

impl PartialEq for CompatibilityProblem {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for CompatibilityProblem {}

impl Hash for CompatibilityProblem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for CompatibilityProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_description())
    }
}

/// Serialized form used by reports
#[derive(Serialize)]
struct ProblemReport<'a> {
    problem_type: ProblemType,
    short_description: String,
    full_description: String,
    location: &'a ProblemLocation,
}

impl Serialize for CompatibilityProblem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ProblemReport {
            problem_type: self.problem_type(),
            short_description: self.short_description(),
            full_description: self.full_description(),
            location: self.location(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::hierarchy::HierarchyStatus;
    use std::collections::HashSet;

    fn hierarchy(name: &str, super_status: HierarchyStatus) -> Arc<ClassHierarchy> {
        Arc::new(ClassHierarchy {
            name: name.to_string(),
            status: HierarchyStatus::Resolved,
            is_interface: false,
            super_class: Some(Arc::new(ClassHierarchy {
                name: "x/Parent".to_string(),
                status: super_status,
                is_interface: false,
                super_class: None,
                interfaces: Vec::new(),
            })),
            interfaces: Vec::new(),
        })
    }

    fn method_not_found(status: HierarchyStatus) -> CompatibilityProblem {
        CompatibilityProblem::MethodNotFound {
            reference: MethodReference::new("x/Owner", "gone", "()V"),
            location: ProblemLocation::method("p/Caller", "run", "()V"),
            instruction: InstructionKind::InvokeVirtual,
            owner_hierarchy: hierarchy("x/Owner", status),
        }
    }

    #[test]
    fn test_identity_ignores_hierarchy() {
        let resolved = method_not_found(HierarchyStatus::Resolved);
        let unresolved = method_not_found(HierarchyStatus::Unresolved);
        assert_eq!(resolved, unresolved);

        let set: HashSet<_> = [resolved, unresolved].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_identity_includes_instruction_and_location() {
        let base = CompatibilityProblem::FieldNotFound {
            reference: FieldReference::new("x/Owner", "f", "I"),
            location: ProblemLocation::method("p/Caller", "run", "()V"),
            instruction: InstructionKind::GetField,
            owner_hierarchy: hierarchy("x/Owner", HierarchyStatus::Resolved),
        };
        let CompatibilityProblem::FieldNotFound { reference, location, owner_hierarchy, .. } = base.clone() else {
            unreachable!()
        };
        let put = CompatibilityProblem::FieldNotFound {
            reference: reference.clone(),
            location,
            instruction: InstructionKind::PutField,
            owner_hierarchy: owner_hierarchy.clone(),
        };
        let elsewhere = CompatibilityProblem::FieldNotFound {
            reference,
            location: ProblemLocation::method("p/Caller", "other", "()V"),
            instruction: InstructionKind::GetField,
            owner_hierarchy,
        };
        assert_ne!(base, put);
        assert_ne!(base, elsewhere);
    }

    #[test]
    fn test_unresolved_supertype_hint() {
        let text = method_not_found(HierarchyStatus::Unresolved).full_description();
        assert!(text.contains("might be declared in an unresolved supertype: x.Parent"));
        assert!(!method_not_found(HierarchyStatus::Resolved)
            .full_description()
            .contains("unresolved supertype"));
    }

    #[test]
    fn test_descriptions() {
        let problem = CompatibilityProblem::IllegalMethodAccess {
            reference: MethodReference::new("x/Owner", "secret", "()V"),
            resolved: MethodReference::new("x/Owner", "secret", "()V"),
            access: AccessType::Private,
            location: ProblemLocation::method("p/Caller", "run", "()V"),
            instruction: InstructionKind::InvokeVirtual,
        };
        assert_eq!(problem.short_description(), "Illegal invocation of private method x.Owner.secret()V");
        assert!(problem.full_description().contains("inaccessible to the class p.Caller"));
        assert_eq!(problem.problem_type().to_string(), "Illegal method invocation");

        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["problem_type"], "IllegalMethodAccess");
        assert_eq!(json["location"]["kind"], "method");
    }
}
