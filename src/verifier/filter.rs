//! Problem Filters
//!
//! Every problem found by the checker passes an ordered chain of filters
//! before it is reported. The first filter answering [`FilterDecision::Ignore`]
//! wins, and the problem goes to the ignored-problems sink with that reason.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::context::VerificationContext;
use super::error::{VerificationError, VerificationResult};
use super::problems::CompatibilityProblem;
use super::resolution::MemberResolver;
use crate::bytecode::package_of;

/// Outcome of passing a problem through one filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Ignore(String),
}

/// A collaborator that may suppress problems
pub trait ProblemsFilter: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn should_report(&self, problem: &CompatibilityProblem, context: &VerificationContext) -> FilterDecision;
}

/// A problem dropped by a filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IgnoredProblem {
    pub problem: CompatibilityProblem,
    pub filter: String,
    pub reason: String,
}

/// A documented, intentional API change in the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DocumentedProblem {
    ClassRemoved { class: String },
    PackageRemoved { package: String },
    MethodRemoved { owner: String, name: String },
    MethodReturnTypeChanged { owner: String, name: String },
    MethodParameterTypeChanged { owner: String, name: String },
    MethodVisibilityChanged { owner: String, name: String },
    FieldRemoved { owner: String, name: String },
    FieldTypeChanged { owner: String, name: String },
    FieldVisibilityChanged { owner: String, name: String },
    AbstractMethodAdded { owner: String, name: String },
}

impl DocumentedProblem {
    /// Same change with class and package names in internal form
    fn normalized(self) -> Self {
        let internal = |name: String| name.replace('.', "/");
        match self {
            Self::ClassRemoved { class } => Self::ClassRemoved { class: internal(class) },
            Self::PackageRemoved { package } => Self::PackageRemoved {
                package: internal(package),
            },
            Self::MethodRemoved { owner, name } => Self::MethodRemoved {
                owner: internal(owner),
                name,
            },
            Self::MethodReturnTypeChanged { owner, name } => Self::MethodReturnTypeChanged {
                owner: internal(owner),
                name,
            },
            Self::MethodParameterTypeChanged { owner, name } => Self::MethodParameterTypeChanged {
                owner: internal(owner),
                name,
            },
            Self::MethodVisibilityChanged { owner, name } => Self::MethodVisibilityChanged {
                owner: internal(owner),
                name,
            },
            Self::FieldRemoved { owner, name } => Self::FieldRemoved {
                owner: internal(owner),
                name,
            },
            Self::FieldTypeChanged { owner, name } => Self::FieldTypeChanged {
                owner: internal(owner),
                name,
            },
            Self::FieldVisibilityChanged { owner, name } => Self::FieldVisibilityChanged {
                owner: internal(owner),
                name,
            },
            Self::AbstractMethodAdded { owner, name } => Self::AbstractMethodAdded {
                owner: internal(owner),
                name,
            },
        }
    }
}

impl fmt::Display for DocumentedProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClassRemoved { class } => write!(f, "class {} is removed", class),
            Self::PackageRemoved { package } => write!(f, "package {} is removed", package),
            Self::MethodRemoved { owner, name } => write!(f, "method {}.{} is removed", owner, name),
            Self::MethodReturnTypeChanged { owner, name } => {
                write!(f, "method {}.{} return type is changed", owner, name)
            }
            Self::MethodParameterTypeChanged { owner, name } => {
                write!(f, "method {}.{} parameter types are changed", owner, name)
            }
            Self::MethodVisibilityChanged { owner, name } => {
                write!(f, "method {}.{} visibility is changed", owner, name)
            }
            Self::FieldRemoved { owner, name } => write!(f, "field {}.{} is removed", owner, name),
            Self::FieldTypeChanged { owner, name } => write!(f, "field {}.{} type is changed", owner, name),
            Self::FieldVisibilityChanged { owner, name } => {
                write!(f, "field {}.{} visibility is changed", owner, name)
            }
            Self::AbstractMethodAdded { owner, name } => {
                write!(f, "abstract method {}.{} is added", owner, name)
            }
        }
    }
}

/// Ignores problems explained by documented host API changes.
///
/// Member problems match hierarchically: a missing `B.foo` is ignored when
/// `A.foo` is documented as removed and `B` is a subtype of `A`.
#[derive(Debug, Clone, Default)]
pub struct DocumentedProblemsFilter {
    documented: Vec<DocumentedProblem>,
}

impl DocumentedProblemsFilter {
    pub fn new(documented: Vec<DocumentedProblem>) -> Self {
        Self {
            documented: documented.into_iter().map(DocumentedProblem::normalized).collect(),
        }
    }

    /// Read a YAML list of documented problems
    pub fn from_yaml(source_name: &str, text: &str) -> VerificationResult<Self> {
        let documented: Vec<DocumentedProblem> =
            serde_yaml::from_str(text).map_err(|e| VerificationError::invalid_filter(source_name, e.to_string()))?;
        Ok(Self::new(documented))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> VerificationResult<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let text =
            std::fs::read_to_string(path).map_err(|e| VerificationError::invalid_filter(&source_name, e.to_string()))?;
        Self::from_yaml(&source_name, &text)
    }

    pub fn len(&self) -> usize {
        self.documented.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documented.is_empty()
    }

    fn explains(&self, documented: &DocumentedProblem, problem: &CompatibilityProblem, members: &MemberResolver<'_>) -> bool {
        // `class_name` is a subtype of the documented `owner`
        let within = |class_name: &str, owner: &str| class_name == owner || members.is_subtype_of(class_name, owner);

        match documented {
            DocumentedProblem::ClassRemoved { class } => {
                matches!(subject(problem), ProblemSubject::MissingClass(missing) if missing == class)
            }
            DocumentedProblem::PackageRemoved { package } => match subject(problem) {
                ProblemSubject::MissingClass(missing) => {
                    let actual = package_of(missing);
                    actual == package || actual.starts_with(&format!("{}/", package))
                }
                _ => false,
            },
            DocumentedProblem::MethodRemoved { owner, name }
            | DocumentedProblem::MethodReturnTypeChanged { owner, name }
            | DocumentedProblem::MethodParameterTypeChanged { owner, name } => {
                matches!(
                    subject(problem),
                    ProblemSubject::MissingMethod(class, method) if method == name && within(class, owner)
                )
            }
            DocumentedProblem::MethodVisibilityChanged { owner, name } => {
                matches!(
                    subject(problem),
                    ProblemSubject::InaccessibleMethod(class, method) if method == name && within(class, owner)
                )
            }
            DocumentedProblem::FieldRemoved { owner, name } | DocumentedProblem::FieldTypeChanged { owner, name } => {
                matches!(
                    subject(problem),
                    ProblemSubject::MissingField(class, field) if field == name && within(class, owner)
                )
            }
            DocumentedProblem::FieldVisibilityChanged { owner, name } => {
                matches!(
                    subject(problem),
                    ProblemSubject::InaccessibleField(class, field) if field == name && within(class, owner)
                )
            }
            DocumentedProblem::AbstractMethodAdded { owner, name } => {
                matches!(
                    subject(problem),
                    ProblemSubject::UnimplementedMethod(class, method) if method == name && within(class, owner)
                )
            }
        }
    }
}

/// What a problem is about, as far as documented changes can explain it
enum ProblemSubject<'a> {
    MissingClass(&'a str),
    /// `(owner class, method name)`
    MissingMethod(&'a str, &'a str),
    InaccessibleMethod(&'a str, &'a str),
    MissingField(&'a str, &'a str),
    InaccessibleField(&'a str, &'a str),
    /// `(implementing class, abstract method name)`
    UnimplementedMethod(&'a str, &'a str),
    /// No documented change covers it
    Undocumentable,
}

fn subject(problem: &CompatibilityProblem) -> ProblemSubject<'_> {
    match problem {
        CompatibilityProblem::ClassNotFound { reference, .. } => ProblemSubject::MissingClass(&reference.class_name),
        CompatibilityProblem::MethodNotFound { reference, .. } => {
            ProblemSubject::MissingMethod(&reference.owner.class_name, &reference.name)
        }
        CompatibilityProblem::IllegalMethodAccess { resolved, .. } => {
            ProblemSubject::InaccessibleMethod(&resolved.owner.class_name, &resolved.name)
        }
        CompatibilityProblem::FieldNotFound { reference, .. } => {
            ProblemSubject::MissingField(&reference.owner.class_name, &reference.name)
        }
        CompatibilityProblem::IllegalFieldAccess { resolved, .. } => {
            ProblemSubject::InaccessibleField(&resolved.owner.class_name, &resolved.name)
        }
        CompatibilityProblem::MethodNotImplemented { method, location } => {
            ProblemSubject::UnimplementedMethod(location.class_name(), &method.name)
        }
        CompatibilityProblem::IllegalClassAccess { .. } | CompatibilityProblem::OverridingFinalMethod { .. } => {
            ProblemSubject::Undocumentable
        }
    }
}

impl ProblemsFilter for DocumentedProblemsFilter {
    fn name(&self) -> &str {
        "documented"
    }

    fn should_report(&self, problem: &CompatibilityProblem, context: &VerificationContext) -> FilterDecision {
        let members = MemberResolver::new(context.classpath.as_ref());
        match self.documented.iter().find(|d| self.explains(d, problem, &members)) {
            Some(documented) => FilterDecision::Ignore(format!("The problem is documented: {}", documented)),
            None => FilterDecision::Keep,
        }
    }
}

/// Ignores problems by plugin id and short description, both regular
/// expressions that must match in full
#[derive(Debug, Clone, Default)]
pub struct IgnoredProblemsFilter {
    patterns: Vec<(Regex, Regex)>,
}

impl IgnoredProblemsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, plugin_id: &str, description: &str) -> VerificationResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|e| VerificationError::invalid_filter("ignored problems", e.to_string()))
        };
        self.patterns.push((compile(plugin_id)?, compile(description)?));
        Ok(self)
    }

    /// Parse `plugin-id-regex:description-regex` lines; blank lines and `//`
    /// comments are skipped. A line without a colon applies to every plugin.
    pub fn parse(text: &str) -> VerificationResult<Self> {
        let mut filter = Self::new();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            filter = match line.split_once(':') {
                Some((plugin_id, description)) => filter.with_pattern(plugin_id.trim(), description.trim())?,
                None => filter.with_pattern(".*", line)?,
            };
        }
        Ok(filter)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl ProblemsFilter for IgnoredProblemsFilter {
    fn name(&self) -> &str {
        "ignored"
    }

    fn should_report(&self, problem: &CompatibilityProblem, context: &VerificationContext) -> FilterDecision {
        let description = problem.short_description();
        for (plugin_id, pattern) in &self.patterns {
            if plugin_id.is_match(&context.plugin.id) && pattern.is_match(&description) {
                return FilterDecision::Ignore(format!(
                    "The problem matches the ignoring pattern {}:{}",
                    plugin_id.as_str(),
                    pattern.as_str()
                ));
            }
        }
        FilterDecision::Keep
    }
}
