//! End-to-end split tests
//!
//! Each fixture is split with default options and checked against the
//! expected file layout, then against the properties every run must hold.

use std::collections::BTreeSet;

use proto_splitter::graph::merge_cycles;
use proto_splitter::plan::{import_graph, verify};
use proto_splitter::{
    check_output, find_cycles, write_files, DiagnosticCode, FilePlan, SplitError, SplitOptions,
    SplitOutput, Splitter,
};

fn split(source: &str) -> SplitOutput {
    Splitter::default().split(source).unwrap()
}

fn plan_for<'a>(output: &'a SplitOutput, file: &str) -> &'a FilePlan {
    output
        .plans
        .iter()
        .find(|p| p.file_name == file)
        .unwrap_or_else(|| panic!("no plan for {}", file))
}

fn imports(plan: &FilePlan) -> Vec<&str> {
    plan.imports.iter().map(String::as_str).collect()
}

fn file_names(output: &SplitOutput) -> Vec<&str> {
    output.plans.iter().map(|p| p.file_name.as_str()).collect()
}

fn contents<'a>(output: &'a SplitOutput, file_name: &str) -> &'a str {
    output
        .files
        .iter()
        .find(|f| f.file_name == file_name)
        .map(|f| f.contents.as_str())
        .unwrap_or_else(|| panic!("no rendered file {}", file_name))
}

/// Properties that hold for every successful split
fn assert_invariants(output: &SplitOutput) {
    // Acyclicity
    assert!(import_graph(&output.plans).is_acyclic());
    assert!(find_cycles(&import_graph(&output.plans)).is_empty());
    assert!(verify(&output.plans).is_ok());

    // Coverage: each type in exactly one file
    let mut seen = BTreeSet::new();
    for plan in &output.plans {
        for member in &plan.members {
            assert!(seen.insert(member.clone()), "{} planned twice", member);
        }
    }
    let all: BTreeSet<String> = output.model.names().cloned().collect();
    assert_eq!(seen, all);

    let names: BTreeSet<&str> = output.plans.iter().map(|p| p.file_name.as_str()).collect();
    for plan in &output.plans {
        // No self-import
        assert!(!plan.imports.contains(&plan.file_name));
        // Import validity
        for import in &plan.imports {
            assert!(names.contains(import.as_str()), "{} imports unknown {}", plan.file_name, import);
        }
    }

    assert_eq!(output.plans.len(), output.files.len());
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_simple_reference() {
    let output = split(include_str!("fixtures/simple_reference.proto"));
    assert_invariants(&output);

    assert_eq!(file_names(&output), vec!["A", "B"]);
    assert_eq!(imports(plan_for(&output, "A")), vec!["B"]);
    assert!(plan_for(&output, "B").imports.is_empty());
    assert_eq!(
        contents(&output, "A.proto"),
        "syntax = \"proto3\";\n\nimport \"B.proto\";\n\nmessage A {\n  B b = 1;\n}\n"
    );
    assert_eq!(
        contents(&output, "B.proto"),
        "syntax = \"proto3\";\n\nmessage B {\n  int32 value = 1;\n}\n"
    );
}

#[test]
fn test_mutual_cycle_merges() {
    let output = split(include_str!("fixtures/mutual_cycle.proto"));
    assert_invariants(&output);

    assert_eq!(file_names(&output), vec!["A"]);
    let a = plan_for(&output, "A");
    assert_eq!(a.members, vec!["A", "B"]);
    assert!(a.imports.is_empty());

    let text = contents(&output, "A.proto");
    assert!(text.contains("message A {"));
    assert!(text.contains("message B {"));
    assert!(!text.contains("import"));
    assert_eq!(output.diagnostics.with_code(DiagnosticCode::FilesMerged).count(), 1);
}

#[test]
fn test_enum_usage() {
    let output = split(include_str!("fixtures/enum_usage.proto"));
    assert_invariants(&output);

    assert_eq!(imports(plan_for(&output, "Shape")), vec!["Color"]);
    let color = plan_for(&output, "Color");
    assert_eq!(color.members, vec!["Color"]);
    assert!(color.imports.is_empty());
    assert!(contents(&output, "Shape.proto").contains("import \"Color.proto\";\n"));
}

#[test]
fn test_three_cycle_merges_at_first_member() {
    let output = split(include_str!("fixtures/three_cycle.proto"));
    assert_invariants(&output);

    assert_eq!(file_names(&output), vec!["A"]);
    assert_eq!(plan_for(&output, "A").members, vec!["A", "B", "C"]);
    assert_eq!(output.merge.anchor_of("C").map(String::as_str), Some("A"));
}

#[test]
fn test_external_reference_is_dropped() {
    let output = split(include_str!("fixtures/external_reference.proto"));
    assert_invariants(&output);

    assert_eq!(file_names(&output), vec!["Event"]);
    assert!(plan_for(&output, "Event").imports.is_empty());
    assert_eq!(output.diagnostics.with_code(DiagnosticCode::ExternalReference).count(), 2);
    // The input's own imports are not carried over
    assert!(!contents(&output, "Event.proto").contains("import"));
}

#[test]
fn test_diamond_imports_direct_references_only() {
    let output = split(include_str!("fixtures/diamond.proto"));
    assert_invariants(&output);

    assert_eq!(file_names(&output), vec!["A", "B", "C", "D"]);
    assert_eq!(imports(plan_for(&output, "A")), vec!["B", "C"]);
    assert_eq!(imports(plan_for(&output, "B")), vec!["D"]);
    assert_eq!(imports(plan_for(&output, "C")), vec!["D"]);
    assert!(plan_for(&output, "D").imports.is_empty());
    assert!(output.merge.groups().is_empty());
}

#[test]
fn test_package_qualified_names_resolve_locally() {
    let output = split(include_str!("fixtures/qualified_names.proto"));
    assert_invariants(&output);

    assert_eq!(file_names(&output), vec!["A", "B", "Outer", "Left"]);
    assert_eq!(imports(plan_for(&output, "A")), vec!["B", "Outer"]);

    // The cycle closes only through qualified names
    let left = plan_for(&output, "Left");
    assert_eq!(left.members, vec!["Left", "Right"]);
    assert!(left.imports.is_empty());

    assert_eq!(output.diagnostics.with_code(DiagnosticCode::ExternalReference).count(), 0);
    let a = contents(&output, "A.proto");
    assert!(a.contains("import \"B.proto\";\nimport \"Outer.proto\";\n"));
    // Bodies keep the qualified spelling
    assert!(a.contains(".shop.v1.B c = 2;"));
}

// =============================================================================
// Mixed input
// =============================================================================

#[test]
fn test_catalog() {
    let output = split(include_str!("fixtures/catalog.proto"));
    assert_invariants(&output);

    assert_eq!(file_names(&output), vec!["Product", "Price", "Status", "Order"]);

    let product = plan_for(&output, "Product");
    assert_eq!(product.members, vec!["Product", "Category"]);
    assert_eq!(imports(product), vec!["Price", "Status"]);

    let order = plan_for(&output, "Order");
    assert_eq!(order.members, vec!["Order", "Bundle"]);
    assert_eq!(imports(order), vec!["Price", "Product"]);

    // Commented-out and string-literal field shapes are not references
    assert!(!output.graph.contains("Legacy"));
    assert!(!output.graph.contains("Ghost"));
    assert!(!output.graph.contains("Note"));

    // Nested type stays inside its parent's body
    assert!(contents(&output, "Product.proto").contains("message Banner {"));
    assert!(contents(&output, "Product.proto").starts_with(
        "syntax = \"proto3\";\n\npackage shop.catalog.v1;\n\nimport \"Price.proto\";\nimport \"Status.proto\";\n\nmessage Product {"
    ));

    let codes: Vec<DiagnosticCode> = output.diagnostics.all().iter().map(|d| d.code).collect();
    assert!(codes.contains(&DiagnosticCode::SkippedDefinition));
    assert!(codes.contains(&DiagnosticCode::SelfReference));
}

#[test]
fn test_cycle_breaking_report() {
    let output = split(include_str!("fixtures/catalog.proto"));
    let removed: Vec<(&str, &str)> = output
        .broken
        .removed
        .iter()
        .map(|(a, b)| (a.as_str(), b.as_str()))
        .collect();
    assert_eq!(
        removed,
        vec![("Category", "Product"), ("Category", "Category"), ("Bundle", "Order")]
    );
    assert!(find_cycles(&output.broken.graph).is_empty());
    assert_eq!(output.broken.passes, 2);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_deterministic_output() {
    let source = include_str!("fixtures/catalog.proto");
    let first = split(source);
    let second = split(source);
    assert_eq!(first.plans, second.plans);
    assert_eq!(first.files, second.files);
}

#[test]
fn test_merge_is_idempotent() {
    let output = split(include_str!("fixtures/catalog.proto"));
    let file_graph = output.merge.file_graph();
    let again = merge_cycles(file_graph, file_graph.node_count() + 1).unwrap();
    assert_eq!(again.file_graph(), file_graph);
    assert!(again.groups().is_empty());
}

#[test]
fn test_merge_ceiling_reports_unresolvable_cycle() {
    let options = SplitOptions {
        max_merge_rounds: Some(1),
        ..SplitOptions::default()
    };
    let err = Splitter::new(options)
        .split(include_str!("fixtures/mutual_cycle.proto"))
        .unwrap_err();
    match err {
        SplitError::UnresolvableCycle { cycle } => assert_eq!(cycle, vec!["A", "B", "A"]),
        other => panic!("Expected UnresolvableCycle, got {:?}", other),
    }
}

#[test]
fn test_duplicate_type_is_rejected() {
    let err = Splitter::default()
        .split("message A {}\nenum A { X = 0; }")
        .unwrap_err();
    assert!(matches!(err, SplitError::DuplicateType { .. }));
}

#[test]
fn test_empty_input_plans_nothing() {
    let output = split("syntax = \"proto3\";\n");
    assert!(output.plans.is_empty());
    assert!(output.files.is_empty());
}

// =============================================================================
// Writing
// =============================================================================

#[test]
fn test_written_output_matches_check() {
    let dir = tempfile::tempdir().unwrap();
    let output = split(include_str!("fixtures/diamond.proto"));

    write_files(dir.path(), &output.files).unwrap();
    for file in &output.files {
        let on_disk = std::fs::read_to_string(dir.path().join(&file.file_name)).unwrap();
        assert_eq!(on_disk, file.contents);
    }

    let report = check_output(dir.path(), &output.files, "proto").unwrap();
    assert!(!report.has_drift());
    assert_eq!(report.unchanged, 4);

    // A different input leaves stale files behind
    let smaller = split(include_str!("fixtures/simple_reference.proto"));
    let report = check_output(dir.path(), &smaller.files, "proto").unwrap();
    assert_eq!(report.stale, vec!["C.proto", "D.proto"]);
    assert_eq!(report.changed.len(), 2);
}
