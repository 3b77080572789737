//! Error types for the splitter

use thiserror::Error;

/// Result type for splitter operations
pub type Result<T> = std::result::Result<T, SplitError>;

/// Splitter errors
///
/// Every variant is fatal to a run: either a fully consistent set of
/// file plans is produced, or nothing is written.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Structural error at line {line}: {message}")]
    Structural { line: usize, message: String },

    #[error("Duplicate type definition: {name} (first defined at line {first_line}, again at line {line})")]
    DuplicateType {
        name: String,
        first_line: usize,
        line: usize,
    },

    #[error("Unresolvable import cycle: {}", cycle.join(" -> "))]
    UnresolvableCycle { cycle: Vec<String> },

    #[error("Cycle breaking did not converge after {passes} passes; last cycles: {}", format_cycles(cycles))]
    NonConvergence {
        passes: usize,
        cycles: Vec<Vec<String>>,
    },

    #[error("File {file} imports {import}, which is not a planned file")]
    InvalidImport { file: String, import: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|c| format!("[{}]", c.join(" -> ")))
        .collect::<Vec<_>>()
        .join(", ")
}
