//! Ordered-path cycle detection
//!
//! Depth-first traversal with an explicit path stack. When an edge reaches
//! a node that is on the current path, the slice of the path from that node
//! onward, closed by the node again, is recorded as an elementary cycle.

use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::fmt;

use super::DependencyGraph;
use crate::scan::TypeName;

/// An elementary cycle as a closed path: `first == last`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cycle {
    path: Vec<TypeName>,
}

impl Cycle {
    /// Build a cycle from a closed path. Returns None unless the path has
    /// at least two entries and ends where it starts.
    pub fn from_closed_path(path: Vec<TypeName>) -> Option<Self> {
        if path.len() >= 2 && path.first() == path.last() {
            Some(Self { path })
        } else {
            None
        }
    }

    /// The closed path, including the repeated first node at the end
    pub fn path(&self) -> &[TypeName] {
        &self.path
    }

    /// Distinct members, in discovery order
    pub fn members(&self) -> &[TypeName] {
        &self.path[..self.path.len() - 1]
    }

    /// First-discovered member
    pub fn anchor(&self) -> &TypeName {
        &self.path[0]
    }

    /// The edge from the last-discovered member back to the first
    pub fn closing_edge(&self) -> (&TypeName, &TypeName) {
        let members = self.members();
        (&members[members.len() - 1], &members[0])
    }

    pub fn is_self_loop(&self) -> bool {
        self.members().len() == 1
    }

    pub fn into_path(self) -> Vec<TypeName> {
        self.path
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join(" -> "))
    }
}

struct CycleFinder<'g> {
    graph: &'g DependencyGraph,
    visited: Vec<bool>,
    on_path: Vec<bool>,
    path: Vec<NodeIndex>,
    cycles: Vec<Cycle>,
}

impl<'g> CycleFinder<'g> {
    fn visit(&mut self, node: NodeIndex) {
        if self.on_path[node.index()] {
            let start = self.path.iter().position(|&n| n == node).unwrap_or(0);
            let mut closed: Vec<TypeName> = self.path[start..]
                .iter()
                .map(|&n| self.graph.name(n).clone())
                .collect();
            closed.push(self.graph.name(node).clone());
            self.cycles.extend(Cycle::from_closed_path(closed));
            return;
        }
        if self.visited[node.index()] {
            return;
        }

        self.visited[node.index()] = true;
        self.on_path[node.index()] = true;
        self.path.push(node);

        for next in self.graph.successors(node) {
            self.visit(next);
        }

        self.path.pop();
        self.on_path[node.index()] = false;
    }
}

/// Find cycles in the graph, starting a traversal from every unvisited
/// node in declaration order.
///
/// Every cyclic graph yields at least one cycle, but not every elementary
/// cycle is reported: nodes are visited once per call.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let n = graph.node_count();
    let mut finder = CycleFinder {
        graph,
        visited: vec![false; n],
        on_path: vec![false; n],
        path: Vec::new(),
        cycles: Vec::new(),
    };

    for node in graph.graph.node_indices() {
        if !finder.visited[node.index()] {
            finder.visit(node);
        }
    }

    finder.cycles
}
