use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::value_objects::{ClusterId, Constraint, ResourceRef};

/// Which level of the hierarchy a compiled constraint applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Domain(Uuid),
    Project(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    cluster: ClusterId,
    scope: Scope,
    resource: ResourceRef,
}

/// In-memory, recompiled-on-reload store of constraints (§3: "Constraint
/// entries live only in memory and are recompiled on configuration
/// reload"). Safe for concurrent reads from request handlers while a
/// reload is in progress on another task — a reload only ever inserts
/// complete, already-reduced constraints.
#[derive(Default)]
pub struct ConstraintStore {
    inner: DashMap<Key, Constraint>,
}

impl ConstraintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, cluster: &ClusterId, scope: Scope, resource: ResourceRef, constraint: Constraint) {
        self.inner.insert(
            Key { cluster: cluster.clone(), scope, resource },
            constraint,
        );
    }

    pub fn get(&self, cluster: &ClusterId, scope: Scope, resource: &ResourceRef) -> Constraint {
        self.inner
            .get(&Key { cluster: cluster.clone(), scope, resource: resource.clone() })
            .map(|r| *r.value())
            .unwrap_or_default()
    }

    /// Replaces every entry belonging to `cluster` with a freshly
    /// compiled set, as happens on configuration reload.
    pub fn reload_cluster(&self, cluster: &ClusterId, entries: Vec<(Scope, ResourceRef, Constraint)>) {
        self.inner.retain(|k, _| &k.cluster != cluster);
        for (scope, resource, constraint) in entries {
            self.set(cluster, scope, resource, constraint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ClusterId;

    #[test]
    fn unset_scope_returns_unbounded_default() {
        let store = ConstraintStore::new();
        let cluster = ClusterId::new("eu-west-1").unwrap();
        let resource = ResourceRef::new("compute", "cores");
        let c = store.get(&cluster, Scope::Domain(Uuid::nil()), &resource);
        assert_eq!(c, Constraint::default());
    }

    #[test]
    fn reload_replaces_only_the_given_cluster() {
        let store = ConstraintStore::new();
        let a = ClusterId::new("a").unwrap();
        let b = ClusterId::new("b").unwrap();
        let resource = ResourceRef::new("compute", "cores");
        let scope = Scope::Project(Uuid::nil());
        store.set(&a, scope, resource.clone(), Constraint { minimum: Some(1), maximum: None, expected: None });
        store.set(&b, scope, resource.clone(), Constraint { minimum: Some(2), maximum: None, expected: None });

        store.reload_cluster(&a, vec![]);

        assert_eq!(store.get(&a, scope, &resource), Constraint::default());
        assert_eq!(store.get(&b, scope, &resource).minimum, Some(2));
    }
}
