//! UnitGraph - a read-only dependency view over a resolved closure.
//!
//! Built from a resolved unit list, never mutated afterwards. Downstream
//! tooling uses it to order output dependencies-first and to answer
//! "what does this unit pull in" questions without re-resolving.

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::source_unit::SourceUnit;
use crate::util::InternedString;

/// Dependency graph over a fixed set of resolved units.
#[derive(Debug)]
pub struct UnitGraph {
    /// Unit graph; an edge `a -> b` means "a depends on b"
    graph: DiGraph<InternedString, ()>,

    /// Map from unit id to node index
    id_to_node: HashMap<InternedString, NodeIndex>,
}

impl UnitGraph {
    /// Build the graph over a resolved unit set. Edges to units outside
    /// the set are dropped; the closure already decided membership.
    pub fn from_units(units: &[&SourceUnit]) -> Self {
        let mut graph = DiGraph::new();
        let mut id_to_node = HashMap::new();

        for unit in units {
            let node = graph.add_node(unit.id());
            id_to_node.insert(unit.id(), node);
        }

        for unit in units {
            let from = id_to_node[&unit.id()];
            for dep in unit.dependencies() {
                if let Some(&to) = id_to_node.get(dep) {
                    // Check if edge already exists
                    if !graph.contains_edge(from, to) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        UnitGraph { graph, id_to_node }
    }

    /// Direct dependencies of a unit.
    pub fn deps(&self, id: &str) -> Vec<InternedString> {
        match self.node(id) {
            Some(node) => self.graph.neighbors(node).map(|n| self.graph[n]).collect(),
            None => Vec::new(),
        }
    }

    /// Units that directly depend on the given unit.
    pub fn dependents(&self, id: &str) -> Vec<InternedString> {
        match self.node(id) {
            Some(node) => self
                .graph
                .neighbors_directed(node, petgraph::Direction::Incoming)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// All unit ids in dependencies-first order.
    ///
    /// Members of a dependency cycle come out grouped; the order is
    /// deterministic for a fixed construction order.
    pub fn topological_order(&self) -> Vec<InternedString> {
        tarjan_scc(&self.graph)
            .into_iter()
            .flatten()
            .map(|node| self.graph[node])
            .collect()
    }

    /// Everything a unit transitively requires within the set.
    pub fn transitive_deps(&self, id: &str) -> HashSet<InternedString> {
        let mut visited = HashSet::new();
        let mut stack: Vec<InternedString> = match self.node(id) {
            Some(node) => vec![self.graph[node]],
            None => return visited,
        };

        while let Some(current) = stack.pop() {
            if visited.insert(current) {
                for dep in self.deps(&current) {
                    stack.push(dep);
                }
            }
        }

        visited.remove(&InternedString::new(id));
        visited
    }

    /// Whether the unit is part of this graph.
    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn node(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_node.get(&InternedString::new(id)).copied()
    }
}
