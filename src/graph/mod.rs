//! Type Dependency Graph
//!
//! Primary data structure using petgraph for type-to-type references.
//! One node per top-level type, an edge `A -> B` when the body of `A`
//! references `B`. Provides fast lookup via a name index.
//!
//! Node indices follow declaration order, and every traversal visits
//! neighbours in that order, so the graph (and everything derived from it)
//! is a pure function of the input.

pub mod cycles;
pub mod resolve;

pub use cycles::{find_cycles, Cycle};
pub use resolve::{
    break_cycles, merge_cycles, BrokenCycles, MergeGroup, MergeResolution,
};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::diagnostics::Diagnostics;
use crate::scan::{resolve_type_token, scan_references, DefKind, SchemaModel, TypeName};

/// The type dependency graph
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Primary graph structure - may contain cycles
    pub(crate) graph: DiGraph<TypeName, ()>,

    /// Node index lookup: name -> NodeIndex
    pub(crate) node_indices: HashMap<TypeName, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with the given nodes and no edges.
    pub fn with_nodes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TypeName>,
    {
        let mut graph = Self::new();
        for name in names {
            graph.add_node(name);
        }
        graph
    }

    /// Add a node, returning the existing index if already present.
    pub fn add_node(&mut self, name: impl Into<TypeName>) -> NodeIndex {
        let name = name.into();
        if let Some(&idx) = self.node_indices.get(&name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.node_indices.insert(name, idx);
        idx
    }

    /// Add an edge between two existing nodes. Returns false if either node
    /// is unknown or the edge already exists.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        match (self.index_of(from), self.index_of(to)) {
            (Some(a), Some(b)) => self.add_edge_idx(a, b),
            _ => false,
        }
    }

    pub(crate) fn add_edge_idx(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Remove an edge. Returns false if it did not exist.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        let (Some(a), Some(b)) = (self.index_of(from), self.index_of(to)) else {
            return false;
        };
        self.remove_edge_idx(a, b)
    }

    pub(crate) fn remove_edge_idx(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        match self.graph.find_edge(from, to) {
            Some(edge) => {
                self.graph.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index_of(from), self.index_of(to)) {
            (Some(a), Some(b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.node_indices.get(name).copied()
    }

    pub(crate) fn name(&self, idx: NodeIndex) -> &TypeName {
        &self.graph[idx]
    }

    /// Outgoing neighbours in declaration order
    pub(crate) fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        next.sort_unstable();
        next.dedup();
        next
    }

    /// Get immediate outgoing references of a type, in declaration order
    pub fn references(&self, name: &str) -> Vec<&TypeName> {
        let Some(idx) = self.index_of(name) else {
            return Vec::new();
        };
        self.successors(idx).into_iter().map(|n| self.name(n)).collect()
    }

    /// All node names in declaration order
    pub fn node_names(&self) -> impl Iterator<Item = &TypeName> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// All edges, ordered by source then target declaration order
    pub fn edges(&self) -> Vec<(&TypeName, &TypeName)> {
        let mut pairs: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_references()
            .map(|e| (e.source(), e.target()))
            .collect();
        pairs.sort_unstable();
        pairs
            .into_iter()
            .map(|(a, b)| (self.name(a), self.name(b)))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no directed cycle, self-loops included
    pub fn is_acyclic(&self) -> bool {
        petgraph::algo::toposort(&self.graph, None).is_ok()
    }

    /// Export the graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph TypeGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        for name in self.node_names() {
            output.push_str(&format!("  \"{}\";\n", name));
        }

        output.push('\n');

        for (from, to) in self.edges() {
            output.push_str(&format!("  \"{}\" -> \"{}\";\n", from, to));
        }

        output.push_str("}\n");
        output
    }
}

impl PartialEq for DependencyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.node_names().eq(other.node_names()) && self.edges() == other.edges()
    }
}

impl Eq for DependencyGraph {}

/// Build the dependency graph for a model.
///
/// Records are scanned for references; enumerations are leaves and are
/// never scanned. References that resolve to no known type are dropped and
/// reported as diagnostics.
pub fn build_graph(model: &SchemaModel, diagnostics: &mut Diagnostics) -> DependencyGraph {
    let known = model.known_types();
    let package = model.package();
    let mut graph = DependencyGraph::with_nodes(model.names().cloned());

    for def in model.defs() {
        if def.kind == DefKind::Enum {
            continue;
        }
        for reference in scan_references(&def.body) {
            match resolve_type_token(&reference.type_name, &known, package) {
                Some(target) => {
                    graph.add_edge(&def.name, target);
                }
                None => diagnostics.external_reference(&def.name, &reference.type_name),
            }
        }
    }

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built dependency graph"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::extract_model;

    fn graph_of(source: &str) -> DependencyGraph {
        let model = extract_model(source).unwrap();
        build_graph(&model, &mut Diagnostics::new())
    }

    #[test]
    fn test_build_graph_edges() {
        let graph = graph_of(
            "message A { B b = 1; C c = 2; }\nmessage B { C c = 1; }\nmessage C { int32 x = 1; }",
        );
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.references("A"), vec!["B", "C"]);
        assert_eq!(graph.references("B"), vec!["C"]);
        assert!(graph.references("C").is_empty());
    }

    #[test]
    fn test_enums_are_leaves() {
        // Field-like lines in an enum body are never scanned
        let graph = graph_of("enum E { A a = 1; }\nmessage A { E e = 1; }");
        assert!(graph.references("E").is_empty());
        assert_eq!(graph.references("A"), vec!["E"]);
    }

    #[test]
    fn test_external_references_are_dropped() {
        let model = extract_model("message A { Missing m = 1; B b = 2; }\nmessage B {}").unwrap();
        let mut diags = Diagnostics::new();
        let graph = build_graph(&model, &mut diags);
        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.contains("Missing"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_package_qualified_references_resolve() {
        let model = extract_model(
            "package shop.v1;\nmessage A { shop.v1.B b = 1; .shop.v1.B c = 2; }\nmessage B { int32 x = 1; }",
        )
        .unwrap();
        let mut diags = Diagnostics::new();
        let graph = build_graph(&model, &mut diags);
        assert_eq!(graph.references("A"), vec!["B"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_is_acyclic() {
        let mut graph = DependencyGraph::with_nodes(["A", "B", "C"]);
        graph.add_edge("A", "B");
        graph.add_edge("B", "C");
        assert!(graph.is_acyclic());

        graph.add_edge("C", "A");
        assert!(!graph.is_acyclic());

        let mut looped = DependencyGraph::with_nodes(["Node"]);
        looped.add_edge("Node", "Node");
        assert!(!looped.is_acyclic());
    }

    #[test]
    fn test_edges_are_deduplicated() {
        let mut graph = DependencyGraph::with_nodes(["A", "B"]);
        assert!(graph.add_edge("A", "B"));
        assert!(!graph.add_edge("A", "B"));
        assert!(!graph.add_edge("A", "Z"));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.remove_edge("A", "B"));
        assert!(!graph.remove_edge("A", "B"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let src = "message A { C c = 1; B b = 2; }\nmessage B { A a = 1; }\nmessage C {}";
        assert_eq!(graph_of(src), graph_of(src));
        assert_eq!(graph_of(src).to_dot(), graph_of(src).to_dot());
    }

    #[test]
    fn test_to_dot() {
        let graph = graph_of("message A { B b = 1; }\nmessage B {}");
        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph TypeGraph {"));
        assert!(dot.contains("  \"A\" -> \"B\";\n"));
    }
}
