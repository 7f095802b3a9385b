//! Strongly-connected-component grouping and dependency merging.
//!
//! Type-usage edges can legitimately cycle across files within one
//! library (and across libraries), but a unit's persisted dependency
//! fan-out must be a flat, cycle-free list. Grouping mutually-referential
//! units lets the group compute its combined dependency set once and
//! share it among all members instead of looping on the cycle.
//!
//! Orientation convention: components are numbered in completion order
//! of the decomposition, so every component a component points to has a
//! strictly smaller id. Component ids therefore form a valid topological
//! order, and merged dependency sets are computed in increasing id
//! order, when everything a component needs is already final.

use std::collections::BTreeSet;

use crate::resolver::{CancelToken, Interrupted};

const UNVISITED: usize = usize::MAX;

/// An index-addressed directed graph over a unit set.
#[derive(Debug, Default)]
pub struct SccGraph {
    adj: Vec<Vec<usize>>,
}

impl SccGraph {
    /// Create a graph over `nodes` nodes and no edges.
    pub fn new(nodes: usize) -> Self {
        SccGraph {
            adj: vec![Vec::new(); nodes],
        }
    }

    /// Add a directed edge. Self-loops carry no information here and are
    /// dropped at insertion.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        if from != to {
            self.adj[from].push(to);
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.adj.len()
    }

    fn neighbors(&self, node: usize) -> &[usize] {
        &self.adj[node]
    }
}

/// One strongly connected component plus its merged external
/// dependency set: the nodes members directly reference in other
/// components, unioned with those components' own merged sets. Nodes
/// internal to a referenced component are not repeated here; they
/// resurface through the entered node's own dependencies.
#[derive(Debug)]
pub struct Component {
    /// Member nodes, ascending.
    pub members: Vec<usize>,
    /// Merged external dependencies of the whole component.
    pub external_deps: BTreeSet<usize>,
}

/// Decompose the graph into strongly connected components and compute
/// each component's merged external dependency set.
///
/// The decomposition is an iterative Tarjan: an explicit work stack
/// carries (node, next-edge) resumption state, so stack depth never
/// scales with graph size. Cancellation is checked once per node.
pub fn decompose(
    graph: &SccGraph,
    cancel: Option<&CancelToken>,
) -> Result<Vec<Component>, Interrupted> {
    let n = graph.node_count();

    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut component_of = vec![UNVISITED; n];
    let mut next_index = 0usize;

    let mut tarjan_stack: Vec<usize> = Vec::new();
    // (node, next edge offset) resumption frames
    let mut work: Vec<(usize, usize)> = Vec::new();
    let mut components: Vec<Component> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        work.push((root, 0));

        while let Some(frame) = work.last_mut() {
            let node = frame.0;

            if frame.1 == 0 {
                if let Some(token) = cancel {
                    if token.is_cancelled() {
                        return Err(Interrupted);
                    }
                }
                index[node] = next_index;
                lowlink[node] = next_index;
                next_index += 1;
                tarjan_stack.push(node);
                on_stack[node] = true;
            }

            if let Some(&next) = graph.neighbors(node).get(frame.1) {
                frame.1 += 1;
                if index[next] == UNVISITED {
                    work.push((next, 0));
                } else if on_stack[next] {
                    lowlink[node] = lowlink[node].min(index[next]);
                }
            } else {
                work.pop();

                if let Some(&(parent, _)) = work.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[node]);
                }

                if lowlink[node] == index[node] {
                    // node is the root of a finished component
                    let id = components.len();
                    let mut members = Vec::new();
                    loop {
                        let member = tarjan_stack
                            .pop()
                            .expect("component root is still on the stack");
                        on_stack[member] = false;
                        component_of[member] = id;
                        members.push(member);
                        if member == node {
                            break;
                        }
                    }
                    members.sort_unstable();
                    components.push(Component {
                        members,
                        external_deps: BTreeSet::new(),
                    });
                }
            }
        }
    }

    merge_external_deps(graph, &component_of, &mut components);

    Ok(components)
}

/// For each component in increasing id order, union (a) direct neighbors
/// in other components and (b) the already-final merged sets of those
/// components. Completion-order numbering guarantees every pointed-to
/// component has a smaller id, so a single ascending pass suffices.
fn merge_external_deps(
    graph: &SccGraph,
    component_of: &[usize],
    components: &mut [Component],
) {
    for id in 0..components.len() {
        let mut external = BTreeSet::new();

        for &member in &components[id].members {
            for &next in graph.neighbors(member) {
                let target = component_of[next];
                if target == id {
                    continue;
                }
                debug_assert!(target < id, "edges point at finished components");
                external.insert(next);
                external.extend(components[target].external_deps.iter().copied());
            }
        }

        components[id].external_deps = external;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: usize, edges: &[(usize, usize)]) -> SccGraph {
        let mut g = SccGraph::new(nodes);
        for &(from, to) in edges {
            g.add_edge(from, to);
        }
        g
    }

    fn component_of(components: &[Component], node: usize) -> usize {
        components
            .iter()
            .position(|c| c.members.contains(&node))
            .unwrap()
    }

    #[test]
    fn test_singletons_without_edges() {
        let components = decompose(&graph(3, &[]), None).unwrap();

        assert_eq!(components.len(), 3);
        for c in &components {
            assert_eq!(c.members.len(), 1);
            assert!(c.external_deps.is_empty());
        }
    }

    #[test]
    fn test_chain_merges_transitively() {
        // 0 -> 1 -> 2
        let components = decompose(&graph(3, &[(0, 1), (1, 2)]), None).unwrap();

        assert_eq!(components.len(), 3);
        let c0 = component_of(&components, 0);
        let c1 = component_of(&components, 1);
        let c2 = component_of(&components, 2);

        // Completion order: the sink finishes first
        assert!(c2 < c1 && c1 < c0);
        assert_eq!(components[c2].external_deps, BTreeSet::new());
        assert_eq!(components[c1].external_deps, BTreeSet::from([2]));
        assert_eq!(components[c0].external_deps, BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_cycle_is_one_component() {
        // 0 <-> 1, 0 -> 2
        let components = decompose(&graph(3, &[(0, 1), (1, 0), (0, 2)]), None).unwrap();

        assert_eq!(components.len(), 2);
        let cycle = component_of(&components, 0);
        assert_eq!(components[cycle].members, vec![0, 1]);
        assert_eq!(components[cycle].external_deps, BTreeSet::from([2]));
    }

    #[test]
    fn test_self_loop_ignored() {
        let components = decompose(&graph(2, &[(0, 0), (0, 1)]), None).unwrap();

        assert_eq!(components.len(), 2);
        let c0 = component_of(&components, 0);
        assert_eq!(components[c0].members, vec![0]);
        assert_eq!(components[c0].external_deps, BTreeSet::from([1]));
    }

    #[test]
    fn test_component_ids_form_topological_order() {
        // Two cycles with a bridge: {0,1} -> {2,3} -> 4
        let g = graph(
            5,
            &[(0, 1), (1, 0), (1, 2), (2, 3), (3, 2), (3, 4)],
        );
        let components = decompose(&g, None).unwrap();
        let mut owner = vec![0; 5];
        for (id, c) in components.iter().enumerate() {
            for &m in &c.members {
                owner[m] = id;
            }
        }

        // Every cross-component edge points at a smaller component id
        for from in 0..5 {
            for &to in g.neighbors(from) {
                if owner[from] != owner[to] {
                    assert!(owner[to] < owner[from]);
                }
            }
        }
    }

    #[test]
    fn test_groups_are_mutually_reachable_and_acyclic() {
        // {0,1,2} cycle, {3} singleton, edges into the cycle
        let g = graph(4, &[(0, 1), (1, 2), (2, 0), (3, 0)]);
        let components = decompose(&g, None).unwrap();

        assert_eq!(components.len(), 2);
        let cycle = component_of(&components, 0);
        let single = component_of(&components, 3);

        assert_eq!(components[cycle].members, vec![0, 1, 2]);
        // The singleton records the node it enters the cycle through;
        // the remaining members follow via that node's own dependency
        // set. No cycle member reaches back, so the groups form a DAG.
        assert_eq!(components[single].external_deps, BTreeSet::from([0]));
        assert!(components[cycle].external_deps.is_empty());
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        // A path long enough to overflow a native stack if the
        // decomposition recursed per node.
        let n = 200_000;
        let edges: Vec<(usize, usize)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        let components = decompose(&graph(n, &edges), None).unwrap();

        assert_eq!(components.len(), n);
    }

    #[test]
    fn test_cancellation_stops_decomposition() {
        let cancel = CancelToken::new();
        cancel.cancel();

        assert!(decompose(&graph(3, &[(0, 1)]), Some(&cancel)).is_err());
    }
}
