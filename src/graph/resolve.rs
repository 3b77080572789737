//! Cycle Resolution
//!
//! Two passes over the dependency graph:
//!
//! 1. [`break_cycles`] removes the closing edge of every detected cycle,
//!    repeating until a pass finds none, giving an acyclic type-level graph.
//! 2. [`merge_cycles`] decides which types must share an output file so that
//!    the file-level import graph is acyclic. Every cycle is collapsed onto
//!    its first-discovered member (the anchor); overlapping cycles are
//!    consolidated into a single group.

use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;

use super::cycles::{find_cycles, Cycle};
use super::DependencyGraph;
use crate::error::{Result, SplitError};
use crate::scan::TypeName;

// =============================================================================
// Elementary cycle breaking
// =============================================================================

/// Result of breaking type-level cycles
#[derive(Debug, Clone)]
pub struct BrokenCycles {
    /// The graph with every closing edge removed (acyclic)
    pub graph: DependencyGraph,
    /// Edges removed, in removal order
    pub removed: Vec<(TypeName, TypeName)>,
    /// Every cycle recorded across all passes
    pub cycles: Vec<Cycle>,
    /// Number of detection passes run, including the final clean pass
    pub passes: usize,
}

/// Default pass ceiling for [`break_cycles`]
pub fn default_pass_limit(graph: &DependencyGraph) -> usize {
    graph.node_count() + 1
}

/// Remove one edge per detected cycle, from its last-discovered member back
/// to its first, until a full pass finds no cycle.
///
/// Fails with [`SplitError::NonConvergence`] if `max_passes` passes do not
/// reach an acyclic graph.
pub fn break_cycles(graph: &DependencyGraph, max_passes: usize) -> Result<BrokenCycles> {
    let mut working = graph.clone();
    let mut removed = Vec::new();
    let mut recorded = Vec::new();
    let mut last_seen: Vec<Cycle> = Vec::new();

    for pass in 1..=max_passes.max(1) {
        let cycles = find_cycles(&working);
        if cycles.is_empty() {
            return Ok(BrokenCycles {
                graph: working,
                removed,
                cycles: recorded,
                passes: pass,
            });
        }

        for cycle in &cycles {
            let (from, to) = cycle.closing_edge();
            if working.remove_edge(from, to) {
                tracing::debug!(%cycle, from = %from, to = %to, "removed closing edge");
                removed.push((from.clone(), to.clone()));
            }
        }

        recorded.extend(cycles.iter().cloned());
        last_seen = cycles;
    }

    Err(SplitError::NonConvergence {
        passes: max_passes.max(1),
        cycles: last_seen.into_iter().map(Cycle::into_path).collect(),
    })
}

// =============================================================================
// File-level merging
// =============================================================================

/// A set of types forced into one output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeGroup {
    pub anchor: TypeName,
    /// All members including the anchor, in declaration order
    pub members: Vec<TypeName>,
}

/// Result of file-level cycle merging
#[derive(Debug, Clone)]
pub struct MergeResolution {
    /// Quotient graph: edges only between anchors, no self-loops
    file_graph: DependencyGraph,
    /// Anchor of every node, indexed by node
    anchors: Vec<NodeIndex>,
    /// Cycles that caused merges, in detection order
    cycles: Vec<Cycle>,
    rounds: usize,
}

impl MergeResolution {
    /// Anchor (output file) of a type
    pub fn anchor_of(&self, name: &str) -> Option<&TypeName> {
        let idx = self.file_graph.index_of(name)?;
        Some(self.file_graph.name(self.anchors[idx.index()]))
    }

    /// `(type, anchor)` for every type in declaration order
    pub fn assignments(&self) -> Vec<(&TypeName, &TypeName)> {
        self.file_graph
            .graph
            .node_indices()
            .map(|idx| (self.file_graph.name(idx), self.file_graph.name(self.anchors[idx.index()])))
            .collect()
    }

    /// Distinct anchors in declaration order
    pub fn anchors(&self) -> Vec<&TypeName> {
        self.file_graph
            .graph
            .node_indices()
            .filter(|idx| self.anchors[idx.index()] == *idx)
            .map(|idx| self.file_graph.name(idx))
            .collect()
    }

    /// Groups with more than one member, ordered by anchor
    pub fn groups(&self) -> Vec<MergeGroup> {
        let mut members: HashMap<NodeIndex, Vec<TypeName>> = HashMap::new();
        for idx in self.file_graph.graph.node_indices() {
            members
                .entry(self.anchors[idx.index()])
                .or_default()
                .push(self.file_graph.name(idx).clone());
        }

        let mut groups: Vec<(NodeIndex, Vec<TypeName>)> =
            members.into_iter().filter(|(_, m)| m.len() > 1).collect();
        groups.sort_by_key(|(anchor, _)| *anchor);
        groups
            .into_iter()
            .map(|(anchor, members)| MergeGroup {
                anchor: self.file_graph.name(anchor).clone(),
                members,
            })
            .collect()
    }

    /// The file-level import graph between anchors
    pub fn file_graph(&self) -> &DependencyGraph {
        &self.file_graph
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Number of detection rounds run, including the final clean round
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

/// Collapse every node onto its anchor. Edges internal to a group vanish,
/// edges into a group point at its anchor, and edges out of any member
/// leave from the anchor.
fn contract(graph: &DependencyGraph, anchors: &[NodeIndex]) -> DependencyGraph {
    let mut out = DependencyGraph::with_nodes(graph.node_names().cloned());
    let mut edges: Vec<(NodeIndex, NodeIndex)> = graph
        .graph
        .edge_references()
        .map(|e| (anchors[e.source().index()], anchors[e.target().index()]))
        .filter(|(a, b)| a != b)
        .collect();
    edges.sort_unstable();
    for (a, b) in edges {
        out.add_edge_idx(a, b);
    }
    out
}

/// Merge the members of every cycle into one file anchored at the cycle's
/// first-discovered member.
///
/// Detection repeats on the contracted graph until it is acyclic, since
/// collapsing one cycle can expose a cycle between anchors that no earlier
/// round recorded. A type keeps the first anchor it was assigned; cycles
/// that overlap an existing group join that group.
pub fn merge_cycles(graph: &DependencyGraph, max_rounds: usize) -> Result<MergeResolution> {
    let n = graph.node_count();
    let mut sets: UnionFind<usize> = UnionFind::new(n);
    // Set representative -> (anchor, order in which the anchor was assigned)
    let mut group_anchor: HashMap<usize, (NodeIndex, usize)> = HashMap::new();
    let mut anchors: Vec<NodeIndex> = (0..n).map(NodeIndex::new).collect();
    let mut file_graph = contract(graph, &anchors);
    let mut merged_cycles = Vec::new();
    let mut assigned = 0usize;
    let mut last_seen: Vec<Cycle> = Vec::new();

    for round in 1..=max_rounds.max(1) {
        let cycles = find_cycles(&file_graph);
        if cycles.is_empty() {
            return Ok(MergeResolution {
                file_graph,
                anchors,
                cycles: merged_cycles,
                rounds: round,
            });
        }

        for cycle in &cycles {
            let members: Vec<usize> = cycle
                .members()
                .iter()
                .filter_map(|m| graph.index_of(m))
                .map(|idx| idx.index())
                .collect();
            if members.len() < 2 {
                continue;
            }

            let existing = members
                .iter()
                .filter_map(|&m| group_anchor.get(&sets.find(m)).copied())
                .min_by_key(|&(_, order)| order);
            let chosen = existing.unwrap_or_else(|| {
                assigned += 1;
                (NodeIndex::new(members[0]), assigned)
            });

            for &m in &members {
                let root = sets.find(m);
                group_anchor.remove(&root);
            }
            for &m in &members[1..] {
                sets.union(members[0], m);
            }
            group_anchor.insert(sets.find(members[0]), chosen);

            tracing::debug!(
                %cycle,
                anchor = %graph.name(chosen.0),
                "merging cycle into one file"
            );
        }

        for (i, anchor) in anchors.iter_mut().enumerate() {
            if let Some(&(a, _)) = group_anchor.get(&sets.find(i)) {
                *anchor = a;
            }
        }
        file_graph = contract(graph, &anchors);
        merged_cycles.extend(cycles.iter().cloned());
        last_seen = cycles;
    }

    Err(SplitError::UnresolvableCycle {
        cycle: last_seen
            .into_iter()
            .next()
            .map(Cycle::into_path)
            .unwrap_or_default(),
    })
}

/// Default round ceiling for [`merge_cycles`]
pub fn default_round_limit(graph: &DependencyGraph) -> usize {
    graph.node_count() + 1
}
