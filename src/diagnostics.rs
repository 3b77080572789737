//! Diagnostics
//!
//! Collects non-fatal findings during a split run.
//! Fatal conditions are `SplitError`s; everything here is informational
//! or a warning and never stops output from being written.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scan::TypeName;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === References ===
    /// Type token matched no local definition and was treated as external
    ExternalReference,
    /// Record references itself
    SelfReference,

    // === Cycles ===
    /// An edge was removed to break a type-level cycle
    CycleBroken,
    /// Several types were merged into one output file
    FilesMerged,

    // === Scanning ===
    /// Top-level block (service, extend) not emitted as a type
    SkippedDefinition,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalReference => "I001",
            Self::SelfReference => "I002",
            Self::CycleBroken => "I003",
            Self::FilesMerged => "W001",
            Self::SkippedDefinition => "W002",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::ExternalReference | Self::SelfReference | Self::CycleBroken => Severity::Info,
            Self::FilesMerged | Self::SkippedDefinition => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Type (or skipped block) the finding is about
    pub subject: String,
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Additional context (cycle paths, group members)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.subject
        )?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from a split run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Reference to a type with no local definition
    pub fn external_reference(&mut self, from: &str, token: &str) {
        self.push(DiagnosticItem::new(
            from,
            DiagnosticCode::ExternalReference,
            format!("'{}' is not defined in this file; treated as external", token),
        ));
    }

    /// Record that refers to itself
    pub fn self_reference(&mut self, name: &str) {
        self.push(DiagnosticItem::new(
            name,
            DiagnosticCode::SelfReference,
            "type references itself; needs no import",
        ));
    }

    /// Edge removed while breaking a cycle
    pub fn cycle_broken(&mut self, from: &str, to: &str) {
        self.push(DiagnosticItem::new(
            from,
            DiagnosticCode::CycleBroken,
            format!("reference '{}' -> '{}' closes a cycle", from, to),
        ));
    }

    /// Several types share one output file
    pub fn files_merged(&mut self, anchor: &str, members: &[TypeName]) {
        self.push(
            DiagnosticItem::new(
                anchor,
                DiagnosticCode::FilesMerged,
                format!("{} types merged into '{}' to avoid an import cycle", members.len(), anchor),
            )
            .with_context(format!("Members: {}", members.join(", "))),
        );
    }

    /// Top-level block that is not emitted
    pub fn skipped_definition(&mut self, keyword: &str, name: Option<&str>, line: usize) {
        let subject = name.unwrap_or(keyword);
        self.push(DiagnosticItem::new(
            subject,
            DiagnosticCode::SkippedDefinition,
            format!("`{}` block at line {} is not split", keyword, line),
        ));
    }

    pub fn infos(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Info)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Items with a given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!(
                "\n{} warning(s), {} note(s)\n",
                self.warning_count(),
                self.infos().count()
            ));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
