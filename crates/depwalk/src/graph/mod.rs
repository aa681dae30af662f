//! The resolved dependency graph.
//!
//! Arena-style: every distinct container is stored once, keyed by canonical
//! path, with edges between keys. The petgraph `DiGraph` is maintained
//! alongside the arena during construction and drives the graph algorithms.
//!
//! ## Operations
//!
//! | Operation | Algorithm |
//! |-----------|-----------|
//! | Dependencies / dependents | Direct neighbors |
//! | Walk | Pre-order DFS from the root |
//! | Cycle detection | Tarjan's SCC algorithm |
//! | Dependency chain | A* with unit costs (shortest hop count) |
//!
//! Construction goes through `pub(crate)` methods used only by the
//! orchestrator; once returned to the caller the graph is immutable.

mod types;

pub use types::{Cycle, DependencyChain, DependencyKind, Edge};

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::Problem;
use crate::path_lookup::canonical_or_normalized;
use crate::types::{ContainerKind, Location, SourceContainer};

/// All containers reached from one root, the edges between them, and the
/// problems found on the way.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    root: PathBuf,
    display_root: PathBuf,
    library_roots: Vec<PathBuf>,
    containers: Vec<Arc<SourceContainer>>,
    graph: DiGraph<usize, usize>,
    node_map: HashMap<PathBuf, NodeIndex>,
    edges: Vec<Edge>,
    whitelisted: BTreeSet<String>,
    problems: Vec<Problem>,
}

impl DependencyGraph {
    pub(crate) fn new(root: &Arc<SourceContainer>, display_root: &Path, library_roots: Vec<PathBuf>) -> Self {
        let mut graph = Self {
            root: root.path().to_path_buf(),
            display_root: display_root.to_path_buf(),
            library_roots,
            containers: Vec::new(),
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            edges: Vec::new(),
            whitelisted: BTreeSet::new(),
            problems: Vec::new(),
        };
        graph.add_container(root);
        graph
    }

    /// Insert a container if absent; returns its node.
    pub(crate) fn add_container(&mut self, container: &Arc<SourceContainer>) -> NodeIndex {
        if let Some(&node) = self.node_map.get(container.path()) {
            return node;
        }
        let node = self.graph.add_node(self.containers.len());
        self.containers.push(Arc::clone(container));
        self.node_map.insert(container.path().to_path_buf(), node);
        node
    }

    /// Add an edge from an existing container to `to`, inserting `to` if needed.
    ///
    /// Returns `false` if the `(from, to)` pair was already present.
    pub(crate) fn add_edge(
        &mut self,
        from: &Path,
        to: &Arc<SourceContainer>,
        kind: DependencyKind,
        location: Option<Location>,
    ) -> bool {
        let Some(&source) = self.node_map.get(from) else {
            return false;
        };
        let target = self.add_container(to);
        if self.graph.find_edge(source, target).is_some() {
            return false;
        }
        self.graph.add_edge(source, target, self.edges.len());
        self.edges.push(Edge {
            from: from.to_path_buf(),
            to: to.path().to_path_buf(),
            kind,
            location,
        });
        true
    }

    pub(crate) fn add_whitelisted(&mut self, name: String) {
        self.whitelisted.insert(name);
    }

    pub(crate) fn add_problem(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    pub(crate) fn add_library_root(&mut self, dir: &Path) {
        if !self.library_roots.iter().any(|r| r == dir) {
            self.library_roots.push(dir.to_path_buf());
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Canonical path of the root container.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of distinct containers reached, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Always `false`: the root is part of every graph.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Every problem found, in discovery order.
    #[must_use]
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Whether resolution found no problems at all.
    #[must_use]
    pub fn is_problem_free(&self) -> bool {
        self.problems.is_empty()
    }

    /// Every edge, in discovery order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Every edge as a `(from, to)` pair.
    #[must_use]
    pub fn edge_set(&self) -> BTreeSet<(PathBuf, PathBuf)> {
        self.edges
            .iter()
            .map(|e| (e.from.clone(), e.to.clone()))
            .collect()
    }

    /// Canonical paths of every container.
    #[must_use]
    pub fn all_paths(&self) -> BTreeSet<PathBuf> {
        self.node_map.keys().cloned().collect()
    }

    /// Display names of every container.
    #[must_use]
    pub fn all_relative_names(&self) -> BTreeSet<String> {
        self.containers
            .iter()
            .map(|c| self.relative_name(c.path()))
            .collect()
    }

    /// Display name for a path.
    ///
    /// Relative to the display root when the path is inside it, otherwise
    /// relative to the closest enclosing library root, otherwise absolute.
    /// Separators are always `/`.
    #[must_use]
    pub fn relative_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.display_root).ok().or_else(|| {
            self.library_roots
                .iter()
                .filter_map(|root| path.strip_prefix(root).ok())
                .min_by_key(|rel| rel.components().count())
        });
        match relative {
            Some(rel) if !rel.as_os_str().is_empty() => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            _ => path.display().to_string(),
        }
    }

    /// Container for a path, canonicalizing it if needed.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Arc<SourceContainer>> {
        self.node(path).map(|node| self.container_at(node))
    }

    /// Every container in discovery order, root first.
    pub fn containers(&self) -> impl Iterator<Item = &Arc<SourceContainer>> {
        self.containers.iter()
    }

    /// Names of allow-listed modules referenced anywhere in the graph.
    #[must_use]
    pub fn whitelisted_names(&self) -> &BTreeSet<String> {
        &self.whitelisted
    }

    /// Installed-package stubs reached.
    pub fn installed_packages(&self) -> impl Iterator<Item = &Arc<SourceContainer>> {
        self.containers
            .iter()
            .filter(|c| c.kind() == ContainerKind::InstalledPackage)
    }

    /// Containers `path` depends on directly, in discovery order.
    #[must_use]
    pub fn dependencies_of(&self, path: &Path) -> Vec<&Arc<SourceContainer>> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Containers depending directly on `path`, in discovery order.
    #[must_use]
    pub fn dependents_of(&self, path: &Path) -> Vec<&Arc<SourceContainer>> {
        self.neighbors(path, Direction::Incoming)
    }

    /// Pre-order walk from the root with depth; each container appears once.
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, &Arc<SourceContainer>)> {
        let Some(start) = self.node(&self.root) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(self.containers.len());
        let mut stack = vec![(start, 0)];

        while let Some((node, depth)) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push((depth, self.container_at(node)));
            let mut children = self.ordered_edges(node, Direction::Outgoing);
            children.reverse();
            for (_, child) in children {
                if !visited.contains(&child) {
                    stack.push((child, depth + 1));
                }
            }
        }
        order
    }

    /// Groups of containers that depend on each other in a loop.
    ///
    /// Self-imports count as a cycle of one. Output is sorted for stable
    /// reporting.
    #[must_use]
    pub fn detect_cycles(&self) -> Vec<Cycle> {
        let mut cycles: Vec<Cycle> = algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut paths: Vec<PathBuf> = scc
                    .into_iter()
                    .map(|node| self.container_at(node).path().to_path_buf())
                    .collect();
                paths.sort();
                Cycle { paths }
            })
            .collect();
        cycles.sort_by(|a, b| a.paths.cmp(&b.paths));
        cycles
    }

    /// Shortest chain of dependencies leading from `from` to `to`.
    #[must_use]
    pub fn dependency_chain(&self, from: &Path, to: &Path) -> Option<DependencyChain> {
        let start = self.node(from)?;
        let goal = self.node(to)?;
        let (_, nodes) = algo::astar(&self.graph, start, |n| n == goal, |_| 1usize, |_| 0)?;
        DependencyChain::new(
            nodes
                .into_iter()
                .map(|node| self.container_at(node).path().to_path_buf())
                .collect(),
        )
    }

    fn node(&self, path: &Path) -> Option<NodeIndex> {
        self.node_map
            .get(path)
            .or_else(|| self.node_map.get(&canonical_or_normalized(path)))
            .copied()
    }

    fn container_at(&self, node: NodeIndex) -> &Arc<SourceContainer> {
        &self.containers[self.graph[node]]
    }

    /// Neighbor nodes sorted by the discovery order of the connecting edge.
    fn ordered_edges(&self, node: NodeIndex, direction: Direction) -> Vec<(usize, NodeIndex)> {
        let mut neighbors: Vec<(usize, NodeIndex)> = self
            .graph
            .edges_directed(node, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (*edge.weight(), other)
            })
            .collect();
        neighbors.sort_unstable();
        neighbors
    }

    fn neighbors(&self, path: &Path, direction: Direction) -> Vec<&Arc<SourceContainer>> {
        self.node(path)
            .map(|node| {
                self.ordered_edges(node, direction)
                    .into_iter()
                    .map(|(_, other)| self.container_at(other))
                    .collect()
            })
            .unwrap_or_default()
    }
}
