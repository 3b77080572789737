//! Emitting
//!
//! Renders file plans to text, writes them to an output directory, and
//! compares a directory with what a run would produce.
//!
//! Rendered layout of one file:
//!
//! ```text
//! syntax = "proto3";
//!
//! package demo.v1;
//!
//! import "B.proto";
//! import "C.proto";
//!
//! message A { ... }
//! ```

use serde::Serialize;
use similar::TextDiff;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::checksum::Checksum;
use crate::error::Result;
use crate::plan::FilePlan;
use crate::scan::SchemaModel;

/// Syntax written when neither the options nor the input name one
pub const DEFAULT_SYNTAX: &str = "proto3";

/// Options controlling rendered output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// File extension, without the dot
    pub extension: String,
    /// Prepended to every import path
    pub import_prefix: String,
    /// Overrides the input's syntax declaration
    pub syntax: Option<String>,
    /// Repeat the input's package declaration
    pub preserve_package: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            extension: "proto".to_string(),
            import_prefix: String::new(),
            syntax: None,
            preserve_package: true,
        }
    }
}

impl RenderOptions {
    /// `<name>.<ext>`
    pub fn file_name(&self, name: &str) -> String {
        format!("{}.{}", name, self.extension)
    }
}

/// A rendered output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// File name including extension, relative to the output directory
    pub file_name: String,
    pub contents: String,
    pub checksum: Checksum,
}

/// Render one plan.
///
/// Members missing from the model are skipped; plans produced by
/// [`crate::plan::plan`] never contain any.
pub fn render(plan: &FilePlan, model: &SchemaModel, options: &RenderOptions) -> RenderedFile {
    let syntax = options
        .syntax
        .as_deref()
        .or(model.syntax())
        .unwrap_or(DEFAULT_SYNTAX);

    let mut contents = format!("syntax = \"{}\";\n\n", syntax);

    if options.preserve_package {
        if let Some(package) = model.package() {
            contents.push_str(&format!("package {};\n\n", package));
        }
    }

    for import in &plan.imports {
        contents.push_str(&format!(
            "import \"{}{}\";\n",
            options.import_prefix,
            options.file_name(import)
        ));
    }
    if !plan.imports.is_empty() {
        contents.push('\n');
    }

    let bodies: Vec<&str> = plan
        .members
        .iter()
        .filter_map(|m| model.get(m))
        .map(|def| def.body.as_str())
        .collect();
    contents.push_str(&bodies.join("\n\n"));
    contents.push('\n');

    RenderedFile {
        file_name: options.file_name(&plan.file_name),
        checksum: Checksum::of(&contents),
        contents,
    }
}

/// Render every plan, in plan order.
pub fn render_all(plans: &[FilePlan], model: &SchemaModel, options: &RenderOptions) -> Vec<RenderedFile> {
    plans.iter().map(|p| render(p, model, options)).collect()
}

/// Write rendered files into `dir`, creating it if needed and overwriting
/// existing files.
pub fn write_files(dir: &Path, files: &[RenderedFile]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for file in files {
        let path = dir.join(&file.file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.contents)?;
        tracing::debug!(path = %path.display(), "wrote file");
    }
    tracing::info!(dir = %dir.display(), files = files.len(), "wrote output");
    Ok(())
}

// =============================================================================
// Drift checking
// =============================================================================

/// A file whose content on disk differs from the rendered content
#[derive(Debug, Clone, Serialize)]
pub struct ChangedFile {
    pub file_name: String,
    /// Unified diff from disk to rendered content
    pub diff: String,
}

/// Differences between an output directory and a fresh render
#[derive(Debug, Clone, Default, Serialize)]
pub struct DriftReport {
    /// Rendered but not on disk
    pub missing: Vec<String>,
    /// On disk with different content
    pub changed: Vec<ChangedFile>,
    /// On disk with the output extension but not produced by this run
    pub stale: Vec<String>,
    pub unchanged: usize,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        !self.missing.is_empty() || !self.changed.is_empty() || !self.stale.is_empty()
    }
}

/// Compare rendered files with the contents of `dir`.
///
/// A missing directory counts as every file missing.
pub fn check_output(dir: &Path, files: &[RenderedFile], extension: &str) -> Result<DriftReport> {
    let mut report = DriftReport::default();

    for file in files {
        let path = dir.join(&file.file_name);
        if !path.is_file() {
            report.missing.push(file.file_name.clone());
            continue;
        }
        let on_disk = fs::read_to_string(&path)?;
        if file.checksum.verify(&on_disk) {
            report.unchanged += 1;
        } else {
            let diff = TextDiff::from_lines(&on_disk, &file.contents)
                .unified_diff()
                .header(&format!("a/{}", file.file_name), &format!("b/{}", file.file_name))
                .to_string();
            report.changed.push(ChangedFile {
                file_name: file.file_name.clone(),
                diff,
            });
        }
    }

    if dir.is_dir() {
        let produced: BTreeSet<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        let mut stale = Vec::new();
        for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != extension).unwrap_or(true) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !produced.contains(name.as_str()) {
                stale.push(name);
            }
        }
        stale.sort();
        report.stale = stale;
    }

    Ok(report)
}

// =============================================================================
// Manifest
// =============================================================================

/// One output file in the manifest
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub file: String,
    pub members: Vec<String>,
    pub imports: Vec<String>,
    pub checksum: Checksum,
}

/// Record of one split run
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub input_checksum: Checksum,
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest; `plans` and `files` are paired by position.
    pub fn new(input: &str, plans: &[FilePlan], files: &[RenderedFile]) -> Self {
        let files = plans
            .iter()
            .zip(files)
            .map(|(plan, file)| ManifestEntry {
                file: file.file_name.clone(),
                members: plan.members.clone(),
                imports: plan.imports.iter().cloned().collect(),
                checksum: file.checksum.clone(),
            })
            .collect();
        Self {
            input_checksum: Checksum::of(input),
            files,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
