//! Split pipeline
//!
//! Chains the stages as immutable values:
//! scan -> build graph -> break cycles -> merge cycles -> plan -> render.
//! Nothing is written here; a run either yields a complete [`SplitOutput`]
//! or an error.

use crate::config::SplitterConfig;
use crate::diagnostics::Diagnostics;
use crate::emit::{render_all, RenderOptions, RenderedFile};
use crate::error::Result;
use crate::graph::resolve::{default_pass_limit, default_round_limit};
use crate::graph::{break_cycles, build_graph, merge_cycles, BrokenCycles, DependencyGraph, MergeResolution};
use crate::plan::{plan, FilePlan};
use crate::scan::{extract_model, SchemaModel};

/// Options for one run
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    pub render: RenderOptions,
    /// Cycle-breaking pass ceiling; `|V| + 1` if unset
    pub max_break_passes: Option<usize>,
    /// Merge round ceiling; `|V| + 1` if unset
    pub max_merge_rounds: Option<usize>,
}

impl From<&SplitterConfig> for SplitOptions {
    fn from(config: &SplitterConfig) -> Self {
        Self {
            render: config.render_options(),
            max_break_passes: config.resolve.max_break_passes,
            max_merge_rounds: config.resolve.max_merge_rounds,
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub model: SchemaModel,
    /// Full reference graph
    pub graph: DependencyGraph,
    pub broken: BrokenCycles,
    pub merge: MergeResolution,
    pub plans: Vec<FilePlan>,
    /// Rendered files, paired with `plans` by position
    pub files: Vec<RenderedFile>,
    pub diagnostics: Diagnostics,
}

/// Splits one schema file
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    options: SplitOptions,
}

impl Splitter {
    pub fn new(options: SplitOptions) -> Self {
        Self { options }
    }

    /// Run every stage on `source`.
    pub fn split(&self, source: &str) -> Result<SplitOutput> {
        let mut diagnostics = Diagnostics::new();

        let model = extract_model(source)?;
        for block in model.skipped() {
            diagnostics.skipped_definition(&block.keyword, block.name.as_deref(), block.line);
        }
        tracing::info!(
            records = model.records().count(),
            enums = model.enums().count(),
            skipped = model.skipped().len(),
            "extracted model"
        );

        let graph = build_graph(&model, &mut diagnostics);
        for name in graph.node_names() {
            if graph.has_edge(name, name) {
                diagnostics.self_reference(name);
            }
        }

        let passes = self
            .options
            .max_break_passes
            .unwrap_or_else(|| default_pass_limit(&graph));
        let broken = break_cycles(&graph, passes)?;
        for (from, to) in &broken.removed {
            diagnostics.cycle_broken(from, to);
        }
        tracing::info!(
            cycles = broken.cycles.len(),
            removed = broken.removed.len(),
            passes = broken.passes,
            "broke type-level cycles"
        );

        let rounds = self
            .options
            .max_merge_rounds
            .unwrap_or_else(|| default_round_limit(&graph));
        let merge = merge_cycles(&graph, rounds)?;
        for group in merge.groups() {
            tracing::warn!(
                anchor = %group.anchor,
                members = ?group.members,
                "merging types into one file"
            );
            diagnostics.files_merged(&group.anchor, &group.members);
        }

        let plans = plan(&model, &merge)?;
        let files = render_all(&plans, &model, &self.options.render);
        tracing::info!(
            files = files.len(),
            merged = plans.iter().filter(|p| p.is_merged()).count(),
            "planned output"
        );

        Ok(SplitOutput {
            model,
            graph,
            broken,
            merge,
            plans,
            files,
            diagnostics,
        })
    }
}
