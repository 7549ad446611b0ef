//! Role hierarchy expansion.

use std::collections::{BTreeSet, HashMap};

/// Role to the roles it directly implies.
#[derive(Debug, Clone, Default)]
pub struct RoleHierarchy {
    implied: HashMap<String, Vec<String>>,
}

impl RoleHierarchy {
    pub fn new(implied: HashMap<String, Vec<String>>) -> Self {
        Self { implied }
    }

    /// `roles` plus everything they imply, transitively. Cycles are harmless.
    pub fn reachable_roles<'a, I>(&self, roles: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut reached = BTreeSet::new();
        let mut pending: Vec<String> = roles.into_iter().cloned().collect();

        while let Some(role) = pending.pop() {
            if !reached.insert(role.clone()) {
                continue;
            }
            if let Some(children) = self.implied.get(&role) {
                pending.extend(children.iter().cloned());
            }
        }

        reached
    }
}
