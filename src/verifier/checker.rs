//! Compatibility Checker
//!
//! Walks every reference-carrying instruction of every plugin class and
//! resolves it against the verification classpath. Classes are visited in
//! sorted order, methods in declaration order and instructions by offset, so
//! the problems of one run always come out in the same order.

use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

use super::access::{class_access_violation, member_access_violation};
use super::context::VerificationContext;
use super::error::VerificationResult;
use super::filter::{FilterDecision, IgnoredProblem, ProblemsFilter};
use super::hierarchy::ClassHierarchyBuilder;
use super::problems::{CompatibilityProblem, ProblemLocation};
use super::resolution::MemberResolver;
use crate::bytecode::{
    array_element_class, ClassFile, ClassReference, FieldReference, Instruction, InstructionKind, MethodInfo,
    MethodReference, SymbolicReference,
};
use crate::resolver::{Lookup, Resolver};

/// Problems of one checker run
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    /// Reported problems, deduplicated, in traversal order
    pub problems: Vec<CompatibilityProblem>,
    pub ignored: Vec<IgnoredProblem>,
    pub checked_classes: usize,
    /// Plugin classes that could not be decoded
    pub invalid_classes: Vec<(String, String)>,
}

impl CheckResult {
    pub fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }
}

/// Progress callback: classes done, total classes, current class
pub type ProgressCallback<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

pub struct CompatibilityChecker<'c> {
    context: &'c VerificationContext,
    filters: Vec<Arc<dyn ProblemsFilter>>,
    progress: Option<ProgressCallback<'c>>,
}

impl<'c> CompatibilityChecker<'c> {
    pub fn new(context: &'c VerificationContext) -> Self {
        Self {
            context,
            filters: Vec::new(),
            progress: None,
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn ProblemsFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters<I: IntoIterator<Item = Arc<dyn ProblemsFilter>>>(mut self, filters: I) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback<'c>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Check every class of `plugin_classes` against the context classpath.
    ///
    /// Returns [`VerificationError::Cancelled`](super::VerificationError::Cancelled)
    /// when the context's token fires; the token is polled before each class.
    pub fn check(&self, plugin_classes: &dyn Resolver) -> VerificationResult<CheckResult> {
        let class_names = plugin_classes.class_names();
        let total = class_names.len();
        debug!(
            "Checking {} classes of {} against {}",
            total,
            self.context.plugin,
            self.context.classpath.description()
        );

        let mut run = CheckRun::new(self.context, &self.filters);
        for (index, class_name) in class_names.iter().enumerate() {
            self.context.check_cancelled()?;
            if let Some(progress) = self.progress {
                progress(index, total, class_name);
            }
            match plugin_classes.lookup(class_name) {
                Lookup::Found(class) => {
                    run.check_class(&class);
                    run.result.checked_classes += 1;
                }
                Lookup::Invalid(message) => {
                    warn!("Skipping invalid plugin class {}: {}", class_name, message);
                    run.result.invalid_classes.push((class_name.clone(), message));
                }
                Lookup::NotFound => {
                    warn!("Plugin class {} disappeared from {}", class_name, plugin_classes.description());
                }
            }
        }
        if let Some(progress) = self.progress {
            progress(total, total, "");
        }

        debug!(
            "Checked {} classes of {}: {} problems, {} ignored",
            run.result.checked_classes,
            self.context.plugin,
            run.result.problems.len(),
            run.result.ignored.len()
        );
        Ok(run.result)
    }
}

/// State of one pass over the plugin classes
struct CheckRun<'c> {
    context: &'c VerificationContext,
    filters: &'c [Arc<dyn ProblemsFilter>],
    members: MemberResolver<'c>,
    hierarchies: ClassHierarchyBuilder<'c>,
    seen: HashSet<CompatibilityProblem>,
    result: CheckResult,
}

impl<'c> CheckRun<'c> {
    fn new(context: &'c VerificationContext, filters: &'c [Arc<dyn ProblemsFilter>]) -> Self {
        Self {
            context,
            filters,
            members: MemberResolver::new(context.classpath.as_ref()),
            hierarchies: ClassHierarchyBuilder::new(context.classpath.as_ref()),
            seen: HashSet::new(),
            result: CheckResult::default(),
        }
    }

    fn report(&mut self, problem: CompatibilityProblem) {
        if self.seen.contains(&problem) {
            return;
        }
        self.seen.insert(problem.clone());

        for filter in self.filters {
            match filter.should_report(&problem, self.context) {
                FilterDecision::Keep => {}
                FilterDecision::Ignore(reason) => {
                    debug!("Problem ignored by {} filter: {}", filter.name(), reason);
                    self.result.ignored.push(IgnoredProblem {
                        problem,
                        filter: filter.name().to_string(),
                        reason,
                    });
                    return;
                }
            }
        }
        self.result.problems.push(problem);
    }

    fn check_class(&mut self, class: &Arc<ClassFile>) {
        let class_location = ProblemLocation::class(&class.name);
        for supertype in class.supertypes() {
            self.check_class_reference(supertype, class, &class_location, None);
        }

        for method in &class.methods {
            let location = ProblemLocation::method(&class.name, &method.name, &method.descriptor);
            for instruction in &method.instructions {
                self.check_instruction(instruction, class, &location);
            }
        }

        if !class.is_abstract() && !class.is_interface() {
            self.check_abstract_methods_implemented(class);
        }
        for method in &class.methods {
            self.check_overriding_final(class, method);
        }
    }

    fn check_instruction(&mut self, instruction: &Instruction, accessor: &Arc<ClassFile>, location: &ProblemLocation) {
        match &instruction.reference {
            SymbolicReference::Class(reference) => {
                self.check_class_reference(&reference.class_name, accessor, location, Some(instruction.kind));
            }
            SymbolicReference::Method(reference) => {
                self.check_method_reference(reference, instruction, accessor, location);
            }
            SymbolicReference::Field(reference) => {
                self.check_field_reference(reference, instruction.kind, accessor, location);
            }
        }
    }

    /// Resolve a class reference, reporting it when missing or inaccessible.
    /// Returns the class when member resolution can continue.
    fn check_class_reference(
        &mut self,
        class_name: &str,
        accessor: &ClassFile,
        location: &ProblemLocation,
        instruction: Option<InstructionKind>,
    ) -> Option<Arc<ClassFile>> {
        let element = array_element_class(class_name)?;
        if self.context.is_external(element) {
            return None;
        }
        match self.context.classpath.lookup(element) {
            Lookup::Found(class) => {
                if let Some(access) = class_access_violation(&class, accessor) {
                    self.report(CompatibilityProblem::IllegalClassAccess {
                        reference: ClassReference::new(element),
                        access,
                        location: location.clone(),
                        instruction,
                    });
                }
                Some(class)
            }
            Lookup::Invalid(message) => {
                debug!("Class {} is present but invalid: {}", element, message);
                self.report_class_not_found(element, location, instruction);
                None
            }
            Lookup::NotFound => {
                self.report_class_not_found(element, location, instruction);
                None
            }
        }
    }

    fn report_class_not_found(&mut self, class_name: &str, location: &ProblemLocation, instruction: Option<InstructionKind>) {
        self.report(CompatibilityProblem::ClassNotFound {
            reference: ClassReference::new(class_name),
            location: location.clone(),
            instruction,
        });
    }

    fn check_method_reference(
        &mut self,
        reference: &MethodReference,
        instruction: &Instruction,
        accessor: &Arc<ClassFile>,
        location: &ProblemLocation,
    ) {
        let owner_name = &reference.owner.class_name;
        let Some(owner) = self.check_class_reference(owner_name, accessor, location, Some(instruction.kind)) else {
            return;
        };
        // methods of array types are those of java/lang/Object
        if owner_name.starts_with('[') {
            return;
        }

        let resolved = match (instruction.kind, instruction.interface_owner) {
            (InstructionKind::InvokeInterface, _) | (InstructionKind::InvokeSpecial, true) => {
                self.members.resolve_interface_method(&owner, &reference.name, &reference.descriptor)
            }
            (InstructionKind::InvokeStatic, true) => {
                self.members.resolve_declared_method(&owner, &reference.name, &reference.descriptor)
            }
            _ => self.members.resolve_class_method(&owner, &reference.name, &reference.descriptor),
        };

        match resolved {
            None => {
                let owner_hierarchy = self.hierarchies.resolve(owner_name);
                self.report(CompatibilityProblem::MethodNotFound {
                    reference: reference.clone(),
                    location: location.clone(),
                    instruction: instruction.kind,
                    owner_hierarchy,
                });
            }
            Some(found) => {
                let method = found.method();
                if let Some(access) = member_access_violation(method.access, &found.declaring, accessor, &self.members) {
                    self.report(CompatibilityProblem::IllegalMethodAccess {
                        reference: reference.clone(),
                        resolved: MethodReference::new(&found.declaring.name, &method.name, &method.descriptor),
                        access,
                        location: location.clone(),
                        instruction: instruction.kind,
                    });
                }
            }
        }
    }

    fn check_field_reference(
        &mut self,
        reference: &FieldReference,
        kind: InstructionKind,
        accessor: &Arc<ClassFile>,
        location: &ProblemLocation,
    ) {
        let owner_name = &reference.owner.class_name;
        let Some(owner) = self.check_class_reference(owner_name, accessor, location, Some(kind)) else {
            return;
        };
        if owner_name.starts_with('[') {
            return;
        }

        let resolved = self.members.resolve_field(
            &owner,
            &reference.name,
            &reference.descriptor,
            kind.is_static_field_access(),
        );
        match resolved {
            None => {
                let owner_hierarchy = self.hierarchies.resolve(owner_name);
                self.report(CompatibilityProblem::FieldNotFound {
                    reference: reference.clone(),
                    location: location.clone(),
                    instruction: kind,
                    owner_hierarchy,
                });
            }
            Some(found) => {
                let field = found.field();
                if let Some(access) = member_access_violation(field.access, &found.declaring, accessor, &self.members) {
                    self.report(CompatibilityProblem::IllegalFieldAccess {
                        reference: reference.clone(),
                        resolved: FieldReference::new(&found.declaring.name, &field.name, &field.descriptor),
                        access,
                        location: location.clone(),
                        instruction: kind,
                    });
                }
            }
        }
    }

    /// Every abstract method inherited by a concrete class must resolve to
    /// an implementation. Skipped when part of the hierarchy is unresolved.
    fn check_abstract_methods_implemented(&mut self, class: &Arc<ClassFile>) {
        let hierarchy = self.hierarchies.resolve(&class.name);
        if !hierarchy.unresolved_supertypes().is_empty() {
            return;
        }

        let chain = self.members.superclass_chain(class);
        let interfaces = self.members.superinterfaces(&chain);
        let mut declared = HashSet::new();
        let mut abstract_methods = Vec::new();
        for declaring in chain.iter().chain(interfaces.iter()) {
            for method in &declaring.methods {
                if !method.access.is_abstract() || method.access.is_static() || method.access.is_private() {
                    continue;
                }
                if declared.insert((method.name.as_str(), method.descriptor.as_str())) {
                    abstract_methods.push(MethodReference::new(&declaring.name, &method.name, &method.descriptor));
                }
            }
        }

        for method in abstract_methods {
            let implemented = self
                .members
                .resolve_class_method(class, &method.name, &method.descriptor)
                .is_some_and(|found| !found.method().access.is_abstract());
            if !implemented {
                self.report(CompatibilityProblem::MethodNotImplemented {
                    method,
                    location: ProblemLocation::class(&class.name),
                });
            }
        }
    }

    fn check_overriding_final(&mut self, class: &Arc<ClassFile>, method: &MethodInfo) {
        if method.is_constructor() || method.access.is_private() || method.access.is_static() {
            return;
        }
        let chain = self.members.superclass_chain(class);
        for parent in chain.iter().skip(1) {
            let Some(overridden) = parent.find_method(&method.name, &method.descriptor) else {
                continue;
            };
            let access = overridden.access;
            if access.is_private() || access.is_static() {
                continue;
            }
            if access.is_package_private() && parent.package_name() != class.package_name() {
                continue;
            }
            if access.is_final() && !access.is_abstract() {
                self.report(CompatibilityProblem::OverridingFinalMethod {
                    method: MethodReference::new(&parent.name, &overridden.name, &overridden.descriptor),
                    location: ProblemLocation::method(&class.name, &method.name, &method.descriptor),
                });
            }
            return;
        }
    }
}
