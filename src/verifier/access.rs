//! Access Checks
//!
//! Accessibility of classes and members from a plugin class (JVMS 5.4.4).
//! Private members are accessible to nestmates.

use std::sync::Arc;

use super::problems::AccessType;
use super::resolution::MemberResolver;
use crate::bytecode::{AccessFlags, ClassFile};

/// `None` when `accessor` may use a member with `access` declared in `declaring`
pub fn member_access_violation(
    access: AccessFlags,
    declaring: &ClassFile,
    accessor: &Arc<ClassFile>,
    members: &MemberResolver<'_>,
) -> Option<AccessType> {
    if access.is_public() {
        return None;
    }
    if access.is_private() {
        if declaring.name == accessor.name || declaring.is_nestmate_of(accessor) {
            return None;
        }
        return Some(AccessType::Private);
    }
    let same_package = declaring.package_name() == accessor.package_name();
    if access.is_protected() {
        if same_package || members.is_subclass_of(accessor, &declaring.name) {
            return None;
        }
        return Some(AccessType::Protected);
    }
    if same_package {
        None
    } else {
        Some(AccessType::PackagePrivate)
    }
}

/// `None` when `accessor` may reference `target`
pub fn class_access_violation(target: &ClassFile, accessor: &ClassFile) -> Option<AccessType> {
    if target.is_public() || target.package_name() == accessor.package_name() || target.is_nestmate_of(accessor) {
        None
    } else {
        Some(AccessType::PackagePrivate)
    }
}
