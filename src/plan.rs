//! File Planning
//!
//! Turns a merge resolution into one [`FilePlan`] per anchor: which types the
//! file holds and which other files it imports.
//!
//! Imports are computed by re-scanning member bodies against every known
//! type, so references dropped while breaking type-level cycles still
//! produce imports. Each referenced type contributes the anchor of the file
//! that holds it, never its own name.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, SplitError};
use crate::graph::{find_cycles, Cycle, DependencyGraph, MergeResolution};
use crate::scan::{extract_references, SchemaModel, TypeDef, TypeName};

/// Contents and imports of one output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePlan {
    /// Anchor name; the file is `<file_name>.<ext>`
    pub file_name: TypeName,
    /// Enumerations first, then records, each in declaration order
    pub members: Vec<TypeName>,
    /// Anchors of the files this one depends on, sorted
    pub imports: BTreeSet<TypeName>,
}

impl FilePlan {
    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    /// Whether the file holds more than one type
    pub fn is_merged(&self) -> bool {
        self.members.len() > 1
    }
}

/// Build file plans for every type in the model.
///
/// Plans are ordered by the declaration position of their anchor. The
/// result is verified before it is returned: every import must name another
/// plan and the import graph must be acyclic.
pub fn plan(model: &SchemaModel, merge: &MergeResolution) -> Result<Vec<FilePlan>> {
    let known = model.known_types();
    let package = model.package();

    // Anchor position -> member definitions in declaration order
    let mut files: BTreeMap<usize, (TypeName, Vec<&TypeDef>)> = BTreeMap::new();
    // A type the merge does not know, or whose anchor is not in the model,
    // keeps a file of its own.
    for (index, def) in model.defs().iter().enumerate() {
        let position = merge
            .anchor_of(&def.name)
            .and_then(|anchor| model.position(anchor))
            .unwrap_or(index);
        files
            .entry(position)
            .or_insert_with(|| (model.defs()[position].name.clone(), Vec::new()))
            .1
            .push(def);
    }

    let mut plans = Vec::with_capacity(files.len());
    for (_, (file_name, defs)) in files {
        let members: Vec<TypeName> = defs
            .iter()
            .filter(|d| d.is_enum())
            .chain(defs.iter().filter(|d| !d.is_enum()))
            .map(|d| d.name.clone())
            .collect();

        let mut imports = BTreeSet::new();
        for def in defs.iter().filter(|d| !d.is_enum()) {
            for target in extract_references(&def.body, &known, package) {
                if members.contains(&target) {
                    continue;
                }
                let anchor = merge.anchor_of(&target).unwrap_or(&target);
                if *anchor != file_name {
                    imports.insert(anchor.clone());
                }
            }
        }

        plans.push(FilePlan {
            file_name,
            members,
            imports,
        });
    }

    verify(&plans)?;
    tracing::debug!(files = plans.len(), "planned output files");
    Ok(plans)
}

/// Import graph between planned files: one node per plan, edge per import.
pub fn import_graph(plans: &[FilePlan]) -> DependencyGraph {
    let mut graph = DependencyGraph::with_nodes(plans.iter().map(|p| p.file_name.clone()));
    for plan in plans {
        for import in &plan.imports {
            graph.add_edge(&plan.file_name, import);
        }
    }
    graph
}

/// Check import validity, self-imports and acyclicity.
pub fn verify(plans: &[FilePlan]) -> Result<()> {
    let names: BTreeSet<&str> = plans.iter().map(|p| p.file_name.as_str()).collect();
    for plan in plans {
        for import in &plan.imports {
            if *import == plan.file_name || !names.contains(import.as_str()) {
                return Err(SplitError::InvalidImport {
                    file: plan.file_name.clone(),
                    import: import.clone(),
                });
            }
        }
    }

    let graph = import_graph(plans);
    if !graph.is_acyclic() {
        let cycle = find_cycles(&graph)
            .into_iter()
            .next()
            .map(Cycle::into_path)
            .unwrap_or_default();
        return Err(SplitError::UnresolvableCycle { cycle });
    }
    Ok(())
}
