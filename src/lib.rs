//! Proto Splitter
//!
//! Splits a single `.proto` schema into one file per top-level type,
//! replacing in-file references with `import` statements and guaranteeing
//! that the resulting import graph has no cycles.
//!
//! ## Pipeline
//!
//! ```text
//! source text
//!   └─ scan        records and enums with verbatim bodies
//!       └─ graph   type -> referenced types
//!           ├─ resolve::break_cycles   acyclic type-level graph
//!           └─ resolve::merge_cycles   types that must share a file
//!               └─ plan               members and imports per file
//!                   └─ emit           rendered text, writer, drift check
//! ```
//!
//! Types caught in a reference cycle are merged into the file of the
//! cycle's first-discovered member (the anchor). Every other type gets a
//! file of its own.
//!
//! ## Example
//!
//! ```
//! use proto_splitter::Splitter;
//!
//! let output = Splitter::default()
//!     .split("message A { B b = 1; }\nmessage B { A a = 1; }\nmessage C { A a = 1; }")
//!     .unwrap();
//!
//! assert_eq!(output.plans.len(), 2);
//! assert_eq!(output.plans[0].members, vec!["A", "B"]);
//! assert!(output.plans[1].imports.contains("A"));
//! ```

pub mod checksum;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod plan;
pub mod scan;

pub use checksum::Checksum;
pub use config::SplitterConfig;
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use emit::{check_output, render, write_files, DriftReport, Manifest, RenderOptions, RenderedFile};
pub use error::{Result, SplitError};
pub use graph::{build_graph, find_cycles, Cycle, DependencyGraph, MergeGroup, MergeResolution};
pub use pipeline::{SplitOptions, SplitOutput, Splitter};
pub use plan::FilePlan;
pub use scan::{extract_model, extract_references, DefKind, SchemaModel, TypeDef, TypeName};
