//! Ordered union of resolvers

use std::collections::BTreeSet;
use std::sync::Arc;

use super::{Lookup, Resolver};

/// Searches its members in order; the first member holding a class wins
#[derive(Debug, Clone, Default)]
pub struct UnionResolver {
    members: Vec<Arc<dyn Resolver>>,
}

impl UnionResolver {
    pub fn new(members: Vec<Arc<dyn Resolver>>) -> Self {
        Self { members }
    }

    pub fn push(&mut self, member: Arc<dyn Resolver>) {
        self.members.push(member);
    }

    pub fn members(&self) -> &[Arc<dyn Resolver>] {
        &self.members
    }
}

impl Resolver for UnionResolver {
    fn lookup(&self, class_name: &str) -> Lookup {
        self.members
            .iter()
            .find(|member| member.contains(class_name))
            .map(|member| member.lookup(class_name))
            .unwrap_or(Lookup::NotFound)
    }

    fn contains(&self, class_name: &str) -> bool {
        self.members.iter().any(|member| member.contains(class_name))
    }

    fn class_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self.members.iter().flat_map(|m| m.class_names()).collect();
        names.into_iter().collect()
    }

    fn description(&self) -> String {
        let labels: Vec<_> = self.members.iter().map(|m| m.description()).collect();
        format!("union[{}]", labels.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{AccessFlags, ClassFile};
    use crate::resolver::{EmptyResolver, FixedClassesResolver};

    #[test]
    fn test_first_member_wins() {
        let plugin = FixedClassesResolver::from_classes(
            "plugin",
            vec![ClassFile::new("a/Shared").with_access(AccessFlags::FINAL)],
        );
        let host = FixedClassesResolver::from_classes(
            "host",
            vec![ClassFile::new("a/Shared"), ClassFile::new("h/Only")],
        );
        let union = UnionResolver::new(vec![
            Arc::new(EmptyResolver),
            Arc::new(plugin),
            Arc::new(host),
        ]);

        let shared = union.lookup("a/Shared").found().unwrap();
        assert!(shared.access.is_final());
        assert!(union.lookup("h/Only").is_found());
        assert!(!union.contains("x/Y"));
        assert_eq!(
            union.class_names(),
            vec!["a/Shared".to_string(), "h/Only".to_string()]
        );
        assert_eq!(union.description(), "union[empty, plugin, host]");
    }
}
