//! Dependency ordering of a manifest snapshot.

use fxhash::{FxHashMap, FxHashSet};
use opshub_domain::ids::ModuleId;
use opshub_domain::manifest::ModuleDescriptor;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Topological order of a snapshot, by index into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DependencyGraph {
    /// Dependencies before dependents; ties broken by registration order.
    pub(crate) order: Vec<usize>,
    /// Longest dependency chain below each module; `0` for roots.
    pub(crate) depth: Vec<usize>,
    /// Registered dependencies of each module, deduplicated.
    pub(crate) dependencies: Vec<Vec<usize>>,
    /// Dependencies that name no registered module.
    pub(crate) missing: Vec<Vec<ModuleId>>,
}

impl DependencyGraph {
    /// Kahn's algorithm over `descriptors`, which must be in registration order.
    ///
    /// Returns the cycle path, e.g. `[a, b, a]` for `a -> b -> a`, when the
    /// graph is not acyclic.
    pub(crate) fn build(descriptors: &[&ModuleDescriptor]) -> Result<Self, Vec<ModuleId>> {
        let index: FxHashMap<&ModuleId, usize> =
            descriptors.iter().enumerate().map(|(i, d)| (&d.id, i)).collect();

        let count = descriptors.len();
        let mut dependencies = vec![Vec::new(); count];
        let mut missing = vec![Vec::new(); count];
        let mut dependents = vec![Vec::new(); count];

        for (module, descriptor) in descriptors.iter().enumerate() {
            let mut seen = FxHashSet::default();
            for dependency in &descriptor.depends_on {
                if !seen.insert(dependency) {
                    continue;
                }
                match index.get(dependency) {
                    Some(&target) => {
                        dependencies[module].push(target);
                        dependents[target].push(module);
                    },
                    None => missing[module].push(dependency.clone()),
                }
            }
        }

        let mut indegree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> =
            (0..count).filter(|&i| indegree[i] == 0).map(Reverse).collect();
        let mut order = Vec::with_capacity(count);
        let mut depth = vec![0; count];

        while let Some(Reverse(module)) = ready.pop() {
            order.push(module);
            for &dependent in &dependents[module] {
                depth[dependent] = depth[dependent].max(depth[module] + 1);
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        if order.len() < count {
            return Err(find_cycle(descriptors, &dependencies, &indegree));
        }

        Ok(Self { order, depth, dependencies, missing })
    }
}

/// Walks unresolved dependencies from the first unsorted module until a
/// module repeats. Every unsorted module has at least one unsorted dependency,
/// so the walk always closes.
fn find_cycle(
    descriptors: &[&ModuleDescriptor],
    dependencies: &[Vec<usize>],
    indegree: &[usize],
) -> Vec<ModuleId> {
    let unsorted = |i: usize| indegree[i] > 0;
    let Some(start) = (0..descriptors.len()).find(|&i| unsorted(i)) else {
        return Vec::new();
    };

    let mut path = vec![start];
    let mut position: FxHashMap<usize, usize> = FxHashMap::default();
    position.insert(start, 0);

    let mut current = start;
    loop {
        let Some(&next) = dependencies[current].iter().find(|&&d| unsorted(d)) else {
            return Vec::new();
        };
        if let Some(&first) = position.get(&next) {
            let mut cycle: Vec<ModuleId> =
                path[first..].iter().map(|&i| descriptors[i].id.clone()).collect();
            cycle.push(descriptors[next].id.clone());
            return cycle;
        }
        position.insert(next, path.len());
        path.push(next);
        current = next;
    }
}

/// Order in which `members` can be torn down: a module goes only after every
/// member that depends on it. Registration order breaks ties; on a cycle the
/// earliest remaining member goes next.
pub(crate) fn teardown_order(descriptors: &[&ModuleDescriptor], members: &[usize]) -> Vec<usize> {
    let mut remaining: Vec<usize> = members.to_vec();
    remaining.sort_unstable();
    remaining.dedup();

    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let free = remaining.iter().position(|&candidate| {
            let id = &descriptors[candidate].id;
            !remaining
                .iter()
                .any(|&other| other != candidate && descriptors[other].depends_on.contains(id))
        });
        order.push(remaining.remove(free.unwrap_or(0)));
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors(modules: &[(&str, &[&str])]) -> Vec<ModuleDescriptor> {
        modules
            .iter()
            .map(|(id, deps)| ModuleDescriptor::new(*id).depends_on(deps.iter().copied()))
            .collect()
    }

    fn build(modules: &[(&str, &[&str])]) -> Result<DependencyGraph, Vec<ModuleId>> {
        let owned = descriptors(modules);
        let refs: Vec<&ModuleDescriptor> = owned.iter().collect();
        DependencyGraph::build(&refs)
    }

    fn ids(cycle: &[ModuleId]) -> Vec<&str> {
        cycle.iter().map(ModuleId::as_str).collect()
    }

    #[test]
    fn dependencies_come_first_and_registration_breaks_ties() {
        let graph = build(&[("c", &["a"]), ("b", &[]), ("a", &[]), ("d", &["c", "b"])]).unwrap();

        assert_eq!(graph.order, [1, 2, 0, 3]);
        assert_eq!(graph.depth, [1, 0, 0, 2]);
    }

    #[test]
    fn duplicates_and_unknown_dependencies() {
        let graph = build(&[("a", &[]), ("b", &["a", "a", "ghost"])]).unwrap();

        assert_eq!(graph.dependencies[1], [0]);
        assert_eq!(ids(&graph.missing[1]), ["ghost"]);
        assert_eq!(graph.order, [0, 1]);
    }

    #[test]
    fn cycle_is_reported_as_a_path() {
        let cycle = build(&[("root", &[]), ("a", &["b"]), ("b", &["c"]), ("c", &["a"])]).unwrap_err();
        assert_eq!(ids(&cycle), ["a", "b", "c", "a"]);

        let cycle = build(&[("self", &["self"])]).unwrap_err();
        assert_eq!(ids(&cycle), ["self", "self"]);
    }

    #[test]
    fn cycle_behind_a_dependent_is_found() {
        let cycle = build(&[("top", &["x"]), ("x", &["y"]), ("y", &["x"])]).unwrap_err();
        assert_eq!(ids(&cycle), ["x", "y", "x"]);
    }

    #[test]
    fn teardown_runs_dependents_first() {
        let owned = descriptors(&[("base", &[]), ("mid", &["base"]), ("top", &["mid", "base"])]);
        let refs: Vec<&ModuleDescriptor> = owned.iter().collect();

        assert_eq!(teardown_order(&refs, &[0, 1, 2]), [2, 1, 0]);
        assert_eq!(teardown_order(&refs, &[0, 2]), [2, 0]);
    }
}
