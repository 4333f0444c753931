// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Builds an [`InstallPlan`] from a target [`Resource`]: depth-bounded
//! required-edge traversal, explicit cycle detection, and a deterministic
//! Kahn's-algorithm topological schedule with id-ascending tie-breaks.
//!
//! The dependency graph is stored in the workspace's [`dag::Dag`] for cycle
//! safety and as the canonical graph representation; `Dag`'s own `topo()`
//! iterator does not guarantee a tie-break order, so scheduling is done here
//! against adjacency/in-degree bookkeeping kept alongside it.

mod error;

use std::collections::{HashMap, HashSet};

use dag::Dag;
use model::{CyclicDependencyError, DependencyDepthError, InstallPlan, Kind, MissingDependencyError, Resource, ResourceId};

pub use crate::error::ResolveError;

pub const DEFAULT_MAX_DEPTH: usize = 5;

type Key = (Kind, ResourceId);

/// Looks up a resource by `(id, kind)`. Implemented by the catalog loader in
/// the full system; a plain `HashMap` suffices for tests.
pub trait ResourceSource {
    fn lookup(&self, id: &ResourceId, kind: Kind) -> Option<Resource>;
}

impl ResourceSource for HashMap<Key, Resource> {
    fn lookup(&self, id: &ResourceId, kind: Kind) -> Option<Resource> {
        self.get(&(kind, id.clone())).cloned()
    }
}

pub struct Resolver<'s, S: ResourceSource> {
    source: &'s S,
    max_depth: usize,
}

impl<'s, S: ResourceSource> Resolver<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Self { source, max_depth: DEFAULT_MAX_DEPTH }
    }

    pub fn with_max_depth(source: &'s S, max_depth: usize) -> Self {
        Self { source, max_depth }
    }

    /// Build the install plan for `target`, treating nothing as already
    /// installed. See [`Resolver::resolve_with_installed`] to account for
    /// resources already present on disk.
    pub fn resolve(&self, target: &Resource) -> Result<InstallPlan, ResolveError> {
        self.resolve_with_installed(target, |_, _| false)
    }

    /// Build the install plan for `target`. `is_installed` is consulted per
    /// resource in the required closure; matches are moved into
    /// `already_installed` and excluded from `to_install`/`order`.
    pub fn resolve_with_installed(
        &self,
        target: &Resource,
        is_installed: impl Fn(&ResourceId, Kind) -> bool,
    ) -> Result<InstallPlan, ResolveError> {
        let mut graph = Graph::default();
        let mut missing = HashSet::new();
        let mut recommended: HashMap<Key, Resource> = HashMap::new();
        let mut stack = Vec::new();
        let mut done = HashSet::new();

        walk(self.source, self.max_depth, target, 0, &mut stack, &mut done, &mut graph, &mut missing, &mut recommended)?;

        let (order, levels) = graph.schedule();

        let mut already_installed = HashSet::new();
        let mut to_install = Vec::with_capacity(levels.len());
        let mut filtered_order = Vec::with_capacity(order.len());

        for level in &levels {
            let mut resources_at_level = Vec::new();
            for key in level {
                let resource = graph.resources.get(key).expect("resolved node has a resource").clone();
                if is_installed(&resource.id, resource.kind) {
                    already_installed.insert(resource.id.clone());
                } else {
                    resources_at_level.push(resource);
                }
            }
            if !resources_at_level.is_empty() {
                to_install.push(resources_at_level);
            }
        }
        for key in &order {
            if !already_installed.contains(&key.1) {
                filtered_order.push(key.1.clone());
            }
        }

        Ok(InstallPlan {
            target: target.id.clone(),
            to_install,
            already_installed,
            missing,
            recommended: recommended.into_values().collect(),
            order: filtered_order,
        })
    }

    /// Standalone cycle check over `root`'s required closure, unbounded by
    /// `max_depth` (a diagnostic probe, not a planning step).
    pub fn detect_cycle(&self, root: &Resource) -> Option<CyclicDependencyError> {
        let mut stack = Vec::new();
        let mut done = HashSet::new();
        find_cycle(self.source, root, &mut stack, &mut done)
    }

    /// Resources (drawn from `universe`) that list `(id, kind)` as a
    /// required or recommended dependency.
    pub fn reverse_dependents(&self, id: &ResourceId, kind: Kind, universe: impl IntoIterator<Item = Resource>) -> Vec<Resource> {
        let mut hits: Vec<Resource> = universe
            .into_iter()
            .filter(|r| r.required.iter().chain(r.recommended.iter()).any(|d| d.id == *id && d.kind == kind))
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        hits
    }

    /// The longest required-dependency chain starting at `target` (0 for a
    /// resource with no required dependencies).
    pub fn depth(&self, target: &Resource) -> Result<usize, ResolveError> {
        let mut graph = Graph::default();
        let mut missing = HashSet::new();
        let mut recommended = HashMap::new();
        let mut stack = Vec::new();
        let mut done = HashSet::new();

        walk(self.source, self.max_depth, target, 0, &mut stack, &mut done, &mut graph, &mut missing, &mut recommended)?;

        let (_, levels) = graph.schedule();
        Ok(levels.len().saturating_sub(1))
    }
}

#[derive(Default)]
struct Graph {
    dag: Dag<Key>,
    resources: HashMap<Key, Resource>,
    successors: HashMap<Key, Vec<Key>>,
    in_degree: HashMap<Key, usize>,
}

impl Graph {
    fn ensure_node(&mut self, key: &Key, resource: &Resource) {
        if !self.resources.contains_key(key) {
            self.dag.add_node_or_get_index(key.clone());
            self.resources.insert(key.clone(), resource.clone());
            self.in_degree.entry(key.clone()).or_insert(0);
        }
    }

    /// Edge from `dep` to `node`: `dep` must be installed before `node`.
    fn add_required_edge(&mut self, dep: &Key, node: &Key) {
        let dep_idx = self.dag.add_node_or_get_index(dep.clone());
        let node_idx = self.dag.add_node_or_get_index(node.clone());
        if self.dag.add_edge(dep_idx, node_idx) {
            self.successors.entry(dep.clone()).or_default().push(node.clone());
            *self.in_degree.entry(node.clone()).or_insert(0) += 1;
        }
    }

    /// Kahn's algorithm, grouped into levels by longest-path depth, with
    /// ties within a frontier broken by id ascending.
    fn schedule(&self) -> (Vec<Key>, Vec<Vec<Key>>) {
        let mut in_degree = self.in_degree.clone();
        let mut level_of: HashMap<Key, usize> = HashMap::new();
        let mut ready: Vec<Key> = self.resources.keys().filter(|k| in_degree.get(*k).copied().unwrap_or(0) == 0).cloned().collect();
        for key in &ready {
            level_of.insert(key.clone(), 0);
        }

        let mut order = Vec::new();
        let mut levels: Vec<Vec<Key>> = Vec::new();

        while !ready.is_empty() {
            ready.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            let mut next_ready = Vec::new();

            for node in std::mem::take(&mut ready) {
                let level = level_of[&node];
                while levels.len() <= level {
                    levels.push(Vec::new());
                }
                levels[level].push(node.clone());
                order.push(node.clone());

                for succ in self.successors.get(&node).into_iter().flatten() {
                    let candidate = level + 1;
                    let entry = level_of.entry(succ.clone()).or_insert(0);
                    if candidate > *entry {
                        *entry = candidate;
                    }
                    if let Some(degree) = in_degree.get_mut(succ) {
                        *degree -= 1;
                        if *degree == 0 {
                            next_ready.push(succ.clone());
                        }
                    }
                }
            }

            ready = next_ready;
        }

        (order, levels)
    }
}

#[allow(clippy::too_many_arguments)]
fn walk<S: ResourceSource>(
    source: &S,
    max_depth: usize,
    node: &Resource,
    depth: usize,
    stack: &mut Vec<Key>,
    done: &mut HashSet<Key>,
    graph: &mut Graph,
    missing: &mut HashSet<MissingDependencyError>,
    recommended: &mut HashMap<Key, Resource>,
) -> Result<(), ResolveError> {
    let key = (node.kind, node.id.clone());
    graph.ensure_node(&key, node);

    for rec in &node.recommended {
        if let Some(rec_resource) = source.lookup(&rec.id, rec.kind) {
            recommended.entry((rec.kind, rec.id.clone())).or_insert(rec_resource);
        }
    }

    stack.push(key.clone());

    for dep in &node.required {
        let dep_key = (dep.kind, dep.id.clone());

        if let Some(pos) = stack.iter().position(|k| *k == dep_key) {
            let mut path: Vec<ResourceId> = stack[pos..].iter().map(|(_, id)| id.clone()).collect();
            path.push(dep.id.clone());
            stack.pop();
            return Err(ResolveError::Cycle(CyclicDependencyError { path }));
        }

        match source.lookup(&dep.id, dep.kind) {
            Some(dep_resource) => {
                graph.ensure_node(&dep_key, &dep_resource);
                graph.add_required_edge(&dep_key, &key);

                if !done.contains(&dep_key) {
                    if depth + 1 > max_depth {
                        let mut chain: Vec<ResourceId> = stack.iter().map(|(_, id)| id.clone()).collect();
                        chain.push(dep.id.clone());
                        stack.pop();
                        return Err(ResolveError::DepthExceeded(DependencyDepthError { max_depth, chain }));
                    }
                    walk(source, max_depth, &dep_resource, depth + 1, stack, done, graph, missing, recommended)?;
                }
            }
            None => {
                missing.insert(MissingDependencyError { id: dep.id.clone(), kind: dep.kind });
            }
        }
    }

    stack.pop();
    done.insert(key);
    Ok(())
}

fn find_cycle<S: ResourceSource>(
    source: &S,
    node: &Resource,
    stack: &mut Vec<Key>,
    done: &mut HashSet<Key>,
) -> Option<CyclicDependencyError> {
    let key = (node.kind, node.id.clone());
    stack.push(key.clone());

    for dep in &node.required {
        let dep_key = (dep.kind, dep.id.clone());

        if let Some(pos) = stack.iter().position(|k| *k == dep_key) {
            let mut path: Vec<ResourceId> = stack[pos..].iter().map(|(_, id)| id.clone()).collect();
            path.push(dep.id.clone());
            return Some(CyclicDependencyError { path });
        }

        if done.contains(&dep_key) {
            continue;
        }

        if let Some(dep_resource) = source.lookup(&dep.id, dep.kind) {
            if let Some(cycle) = find_cycle(source, &dep_resource, stack, done) {
                return Some(cycle);
            }
        }
    }

    stack.pop();
    done.insert(key);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Dependency, Source};

    fn resource(id: &str, required: &[&str]) -> Resource {
        Resource {
            id: ResourceId::parse(id).unwrap(),
            kind: Kind::Agent,
            name: id.to_string(),
            description: String::new(),
            summary: String::new(),
            version: "v1.0.0".to_string(),
            author: None,
            file_type: ".md".to_string(),
            source: Source {
                repo: "org/repo".to_string(),
                path: String::new(),
                url: url::Url::parse("https://raw.githubusercontent.com/org/repo/main/a.md").unwrap(),
            },
            install_path: format!("agents/{id}.md"),
            metadata: Default::default(),
            required: required.iter().map(|id| Dependency { id: ResourceId::parse(*id).unwrap(), kind: Kind::Agent, reason: None }).collect(),
            recommended: vec![],
        }
    }

    fn source_of(resources: &[Resource]) -> HashMap<Key, Resource> {
        resources.iter().map(|r| ((r.kind, r.id.clone()), r.clone())).collect()
    }

    #[test]
    fn diamond_resolves_with_expected_levels() {
        let top = resource("top", &["left", "right"]);
        let left = resource("left", &["bottom"]);
        let right = resource("right", &["bottom"]);
        let bottom = resource("bottom", &[]);
        let source = source_of(&[top.clone(), left, right, bottom]);

        let plan = Resolver::new(&source).resolve(&top).unwrap();

        assert_eq!(plan.order, vec!["bottom", "left", "right", "top"].into_iter().map(|s| ResourceId::parse(s).unwrap()).collect::<Vec<_>>());
        assert_eq!(plan.order.iter().filter(|id| id.as_str() == "bottom").count(), 1);
        assert_eq!(plan.to_install.len(), 3);
        assert_eq!(plan.to_install[0].len(), 1);
        assert_eq!(plan.to_install[0][0].id.as_str(), "bottom");
        assert!(plan.is_complete());
    }

    #[test]
    fn cycle_is_reported_rotated_to_target() {
        let a = resource("a", &["b"]);
        let b = resource("b", &["c"]);
        let c = resource("c", &["a"]);
        let source = source_of(&[a.clone(), b, c]);

        let err = Resolver::new(&source).resolve(&a).unwrap_err();
        match err {
            ResolveError::Cycle(e) => {
                let ids: Vec<&str> = e.path.iter().map(ResourceId::as_str).collect();
                assert_eq!(ids, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn self_edge_is_a_length_one_cycle() {
        let a = resource("a", &["a"]);
        let source = source_of(&[a.clone()]);

        let err = Resolver::new(&source).resolve(&a).unwrap_err();
        match err {
            ResolveError::Cycle(e) => assert_eq!(e.path.iter().map(ResourceId::as_str).collect::<Vec<_>>(), vec!["a", "a"]),
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn empty_required_resolves_to_single_level_plan() {
        let leaf = resource("leaf", &[]);
        let source = source_of(&[leaf.clone()]);

        let plan = Resolver::new(&source).resolve(&leaf).unwrap();
        assert_eq!(plan.to_install.len(), 1);
        assert_eq!(plan.to_install[0].len(), 1);
        assert_eq!(plan.order.len(), 1);
    }

    #[test]
    fn missing_required_ref_marks_plan_incomplete() {
        let top = resource("top", &["ghost"]);
        let source = source_of(&[top.clone()]);

        let plan = Resolver::new(&source).resolve(&top).unwrap();
        assert!(!plan.is_complete());
        assert!(plan.missing.contains(&MissingDependencyError { id: ResourceId::parse("ghost").unwrap(), kind: Kind::Agent }));
    }

    #[test]
    fn chain_at_max_depth_resolves_one_past_it_fails() {
        let mut chain = Vec::new();
        for i in 0..=DEFAULT_MAX_DEPTH {
            let id = format!("n{i}");
            let required = if i == 0 { String::new() } else { format!("n{}", i - 1) };
            let required: Vec<&str> = if required.is_empty() { vec![] } else { vec![required.as_str()] };
            chain.push(resource(&id, &required));
        }
        let source = source_of(&chain);

        let ok_target = chain[DEFAULT_MAX_DEPTH].clone();
        assert!(Resolver::new(&source).resolve(&ok_target).is_ok());

        let last_id = format!("n{DEFAULT_MAX_DEPTH}");
        let extra_id = format!("n{}", DEFAULT_MAX_DEPTH + 1);
        let extra = resource(&extra_id, &[last_id.as_str()]);
        let mut with_extra = chain.clone();
        with_extra.push(extra.clone());
        let source = source_of(&with_extra);

        let err = Resolver::new(&source).resolve(&extra).unwrap_err();
        assert!(matches!(err, ResolveError::DepthExceeded(_)));
    }

    #[test]
    fn reverse_dependents_finds_requirers() {
        let top = resource("top", &["bottom"]);
        let bottom = resource("bottom", &[]);
        let source = source_of(&[top.clone(), bottom.clone()]);

        let resolver = Resolver::new(&source);
        let dependents = resolver.reverse_dependents(&bottom.id, Kind::Agent, vec![top.clone(), bottom]);
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].id.as_str(), "top");
    }
}
