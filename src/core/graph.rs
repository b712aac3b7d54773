//! Dependency Graph Engine
//!
//! An arena view over the component universe: node `i` is the `i`-th
//! component in creation order and `edges[i]` holds the indices of its
//! dependencies. Every traversal here is iterative with an explicit stack,
//! so graph size is bounded by memory rather than call-stack depth.
//!
//! # Operations
//!
//! | Operation | Algorithm |
//! |-----------|-----------|
//! | Cycle guard | DFS reachability from target toward source |
//! | Depth | memoized post-order DFS with an on-path marker |
//! | Balance | dispersion of in-degrees within a problem |
//! | Resolution order | Kahn's algorithm, ties by creation order |

use super::store::Component;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Best (and single-component) balance score
pub const PERFECT_BALANCE: f64 = 10.0;
/// Lowest balance score ever reported
pub const MIN_BALANCE: f64 = 1.0;

/// Per-node traversal state for depth computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done(usize),
}

/// Adjacency view of components, borrowed from the store
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    ids: Vec<&'a str>,
    index: HashMap<&'a str, usize>,
    edges: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph from components in creation order.
    ///
    /// Dependency ids that resolve to no component are dropped.
    pub fn from_components<I>(components: I) -> Self
    where
        I: IntoIterator<Item = &'a Component>,
    {
        let components: Vec<&'a Component> = components.into_iter().collect();
        let ids: Vec<&'a str> = components.iter().map(|c| c.id.as_str()).collect();
        let index: HashMap<&'a str, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let edges = components
            .iter()
            .map(|c| {
                c.dependencies
                    .iter()
                    .filter_map(|dep| index.get(dep.as_str()).copied())
                    .collect()
            })
            .collect();

        Self { ids, index, edges }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Arena index of a component
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Resolved dependency ids of a component
    pub fn dependencies(&self, id: &str) -> Vec<&'a str> {
        self.index_of(id)
            .map(|i| self.edges[i].iter().map(|&d| self.ids[d]).collect())
            .unwrap_or_default()
    }

    /// Find a dependency path `from -> ... -> to`.
    ///
    /// Returns the ids along the path (both ends included), or `None` when
    /// `to` is unreachable. `from == to` yields a one-element path.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let start = self.index_of(from)?;
        let goal = self.index_of(to)?;

        let mut parent: Vec<Option<usize>> = vec![None; self.ids.len()];
        let mut visited = vec![false; self.ids.len()];
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(current) = stack.pop() {
            if current == goal {
                let mut path = vec![self.ids[current].to_string()];
                let mut cursor = current;
                while let Some(prev) = parent[cursor] {
                    path.push(self.ids[prev].to_string());
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for &dep in &self.edges[current] {
                if !visited[dep] {
                    visited[dep] = true;
                    parent[dep] = Some(current);
                    stack.push(dep);
                }
            }
        }

        None
    }

    /// Cycle guard for a new edge `source -> target`.
    ///
    /// The edge closes a loop exactly when `target` already reaches `source`;
    /// the returned path is that existing chain `target -> ... -> source`.
    pub fn would_create_cycle(&self, source: &str, target: &str) -> Option<Vec<String>> {
        self.find_path(target, source)
    }

    /// Whether any component can reach itself
    pub fn has_cycle(&self) -> bool {
        (0..self.ids.len()).any(|node| {
            self.edges[node]
                .iter()
                .any(|&dep| self.find_path(self.ids[dep], self.ids[node]).is_some())
        })
    }

    /// Dependency depth of every node, indexed like the arena.
    ///
    /// A node without dependencies has depth 1; any other node has
    /// `1 + max(depth(dep))`. A dependency that is already on the current
    /// path (only possible if a cycle slipped past the guard) contributes 0.
    pub fn depths(&self) -> Vec<usize> {
        let mut marks = vec![Mark::Unvisited; self.ids.len()];
        for root in 0..self.ids.len() {
            if marks[root] == Mark::Unvisited {
                self.resolve_depths(root, &mut marks);
            }
        }
        marks
            .into_iter()
            .map(|mark| match mark {
                Mark::Done(depth) => depth,
                _ => 0,
            })
            .collect()
    }

    /// Depth of a single component, `None` if it is not in the graph
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        let node = self.index_of(id)?;
        let mut marks = vec![Mark::Unvisited; self.ids.len()];
        self.resolve_depths(node, &mut marks);
        match marks[node] {
            Mark::Done(depth) => Some(depth),
            _ => None,
        }
    }

    /// Maximum depth over the given arena indices (0 when empty)
    pub fn max_depth(&self, scope: &[usize]) -> usize {
        if scope.is_empty() {
            return 0;
        }
        let depths = self.depths();
        scope.iter().map(|&i| depths[i]).max().unwrap_or(0)
    }

    /// In-degree of each scoped node, counting only edges from scoped nodes
    pub fn in_degrees(&self, scope: &[usize]) -> Vec<usize> {
        let mut position: HashMap<usize, usize> = HashMap::with_capacity(scope.len());
        for (pos, &node) in scope.iter().enumerate() {
            position.insert(node, pos);
        }

        let mut degrees = vec![0usize; scope.len()];
        for &node in scope {
            for dep in &self.edges[node] {
                if let Some(&pos) = position.get(dep) {
                    degrees[pos] += 1;
                }
            }
        }
        degrees
    }

    /// Dependency-first ordering of the scoped nodes.
    ///
    /// Among nodes that are ready at the same time, the one created first
    /// comes first. Nodes left over by a cycle are appended in creation order.
    pub fn resolution_order(&self, scope: &[usize]) -> Vec<String> {
        let in_scope: BTreeSet<usize> = scope.iter().copied().collect();
        let mut pending: HashMap<usize, usize> = HashMap::with_capacity(in_scope.len());
        let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();

        for &node in &in_scope {
            let deps: Vec<usize> = self.edges[node]
                .iter()
                .copied()
                .filter(|d| in_scope.contains(d))
                .collect();
            pending.insert(node, deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(node);
            }
        }

        let mut ready: BTreeSet<usize> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&node, _)| node)
            .collect();
        let mut order = Vec::with_capacity(in_scope.len());
        let mut placed = vec![false; self.ids.len()];

        while let Some(node) = ready.pop_first() {
            order.push(self.ids[node].to_string());
            placed[node] = true;
            for &dependent in dependents.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() < in_scope.len() {
            warn!(
                unresolved = in_scope.len() - order.len(),
                "Resolution order incomplete, dependency cycle present"
            );
            order.extend(
                in_scope
                    .iter()
                    .filter(|&&node| !placed[node])
                    .map(|&node| self.ids[node].to_string()),
            );
        }

        order
    }

    fn resolve_depths(&self, root: usize, marks: &mut [Mark]) {
        if marks[root] != Mark::Unvisited {
            return;
        }

        // (node, next edge to visit, best dependency depth so far)
        let mut stack: Vec<(usize, usize, usize)> = vec![(root, 0, 0)];
        marks[root] = Mark::OnPath;

        while let Some(&(node, next, best)) = stack.last() {
            let top = stack.len() - 1;
            match self.edges[node].get(next) {
                Some(&dep) => {
                    stack[top].1 += 1;
                    match marks[dep] {
                        Mark::Done(depth) => stack[top].2 = best.max(depth),
                        Mark::OnPath => {
                            warn!(
                                component = self.ids[node],
                                dependency = self.ids[dep],
                                "Dependency cycle encountered during depth computation"
                            );
                        }
                        Mark::Unvisited => {
                            marks[dep] = Mark::OnPath;
                            stack.push((dep, 0, 0));
                        }
                    }
                }
                None => {
                    stack.pop();
                    let depth = best + 1;
                    marks[node] = Mark::Done(depth);
                    if let Some(parent) = stack.last_mut() {
                        parent.2 = parent.2.max(depth);
                    }
                }
            }
        }
    }
}

/// Balance score of a set of in-degrees, in `[1, 10]`.
///
/// The population standard deviation of the in-degrees is normalised by
/// `n - 1`, the in-degree of a component every other component depends on,
/// and mapped to `10 * (1 - sigma_norm)`. Zero or one component scores 10.
pub fn balance_score(in_degrees: &[usize]) -> f64 {
    let n = in_degrees.len();
    if n <= 1 {
        return PERFECT_BALANCE;
    }

    let count = n as f64;
    let mean = in_degrees.iter().sum::<usize>() as f64 / count;
    let variance = in_degrees
        .iter()
        .map(|&d| {
            let diff = d as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count;
    let normalized = (variance.sqrt() / (count - 1.0)).clamp(0.0, 1.0);

    (PERFECT_BALANCE * (1.0 - normalized)).clamp(MIN_BALANCE, PERFECT_BALANCE)
}
