//! Schema Scanning
//!
//! Turns raw schema text into a [`SchemaModel`]: the top-level records and
//! enumerations, each with its verbatim body text, in declaration order.
//!
//! Only the structure needed for splitting is recognized. Nested definitions
//! stay inside their enclosing body, and services or extensions are skipped.

pub mod lexer;
pub mod references;

pub use lexer::{LexError, Lexer, Span, SpannedToken, Token};
pub use references::{extract_references, resolve_type_token, scan_references, RefKind, Reference};

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{Result, SplitError};
use lexer::line_of;

/// Type name, unique within the input namespace
pub type TypeName = String;

/// Kind of a top-level definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefKind {
    Record,
    Enum,
}

impl DefKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "message" => Some(DefKind::Record),
            "enum" => Some(DefKind::Enum),
            _ => None,
        }
    }
}

/// A single top-level type definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: TypeName,
    pub kind: DefKind,
    /// Verbatim source from the keyword through the closing brace
    pub body: String,
    /// 1-based line of the keyword
    pub line: usize,
}

impl TypeDef {
    pub fn is_enum(&self) -> bool {
        self.kind == DefKind::Enum
    }
}

/// A top-level braced block that was not extracted as a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlock {
    pub keyword: String,
    pub name: Option<String>,
    pub line: usize,
}

/// Immutable model of one schema file
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    syntax: Option<String>,
    package: Option<String>,
    defs: Vec<TypeDef>,
    index: HashMap<TypeName, usize>,
    skipped: Vec<SkippedBlock>,
}

impl SchemaModel {
    fn push(&mut self, def: TypeDef) -> Result<()> {
        if let Some(&existing) = self.index.get(&def.name) {
            return Err(SplitError::DuplicateType {
                name: def.name,
                first_line: self.defs[existing].line,
                line: def.line,
            });
        }
        self.index.insert(def.name.clone(), self.defs.len());
        self.defs.push(def);
        Ok(())
    }

    /// Declared syntax version (`proto2`, `proto3`), if any
    pub fn syntax(&self) -> Option<&str> {
        self.syntax.as_deref()
    }

    /// Declared package, if any
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// All definitions in declaration order
    pub fn defs(&self) -> &[TypeDef] {
        &self.defs
    }

    pub fn records(&self) -> impl Iterator<Item = &TypeDef> {
        self.defs.iter().filter(|d| d.kind == DefKind::Record)
    }

    pub fn enums(&self) -> impl Iterator<Item = &TypeDef> {
        self.defs.iter().filter(|d| d.kind == DefKind::Enum)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.index.get(name).map(|&i| &self.defs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declaration position of a type
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &TypeName> {
        self.defs.iter().map(|d| &d.name)
    }

    /// Lookup set of every known type name
    pub fn known_types(&self) -> std::collections::HashSet<&str> {
        self.index.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Top-level blocks that were skipped (services, extensions)
    pub fn skipped(&self) -> &[SkippedBlock] {
        &self.skipped
    }
}

/// Extract the top-level records and enumerations from schema text.
pub fn extract_model(source: &str) -> Result<SchemaModel> {
    let tokens = Lexer::tokenize(source).map_err(|e| SplitError::Structural {
        line: line_of(source, e.offset()),
        message: e.to_string(),
    })?;

    let mut model = SchemaModel::default();
    let mut pos = 0;

    while pos < tokens.len() {
        let current = &tokens[pos];
        match &current.token {
            Token::Ident(keyword) => {
                let keyword = keyword.as_str();
                if keyword == "syntax" || keyword == "package" {
                    let (value, next) = statement_value(&tokens, pos + 1);
                    if keyword == "syntax" {
                        model.syntax = value;
                    } else {
                        model.package = value;
                    }
                    pos = next;
                    continue;
                }

                // Find what this statement opens: a block or a `;`
                let Some(open) = tokens[pos..]
                    .iter()
                    .position(|t| matches!(t.token, Token::LBrace | Token::Semicolon | Token::RBrace))
                    .map(|off| pos + off)
                else {
                    break;
                };

                if tokens[open].token != Token::LBrace {
                    // Plain statement (import, option) or stray brace handled below
                    pos = if tokens[open].token == Token::Semicolon { open + 1 } else { open };
                    continue;
                }

                let close = matching_brace(&tokens, open).ok_or_else(|| SplitError::Structural {
                    line: line_of(source, current.span.start),
                    message: format!("unbalanced braces in `{}` block", keyword),
                })?;

                let name = tokens
                    .get(pos + 1)
                    .filter(|_| pos + 1 < open)
                    .and_then(|t| t.token.ident())
                    .map(str::to_string);
                let line = line_of(source, current.span.start);

                match (DefKind::from_keyword(keyword), name) {
                    (Some(kind), Some(name)) if open == pos + 2 => {
                        let body = source[current.span.start..tokens[close].span.end].to_string();
                        model.push(TypeDef { name, kind, body, line })?;
                    }
                    (_, name) => {
                        tracing::debug!(keyword, ?name, line, "skipping top-level block");
                        model.skipped.push(SkippedBlock {
                            keyword: keyword.to_string(),
                            name,
                            line,
                        });
                    }
                }
                pos = close + 1;
            }
            Token::RBrace => {
                return Err(SplitError::Structural {
                    line: line_of(source, current.span.start),
                    message: "unexpected `}` at top level".to_string(),
                });
            }
            Token::LBrace => {
                let close = matching_brace(&tokens, pos).ok_or_else(|| SplitError::Structural {
                    line: line_of(source, current.span.start),
                    message: "unbalanced braces".to_string(),
                })?;
                pos = close + 1;
            }
            _ => pos += 1,
        }
    }

    Ok(model)
}

/// Index of the `}` matching the `{` at `open`.
fn matching_brace(tokens: &[SpannedToken], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        match t.token {
            Token::LBrace => depth += 1,
            Token::RBrace => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Value of `syntax = "proto3";` or `package a.b;`, and the index after the `;`.
fn statement_value(tokens: &[SpannedToken], start: usize) -> (Option<String>, usize) {
    let mut value = None;
    let mut pos = start;
    while pos < tokens.len() {
        match &tokens[pos].token {
            Token::Semicolon => return (value, pos + 1),
            Token::Str(s) | Token::Ident(s) if value.is_none() => value = Some(s.clone()),
            Token::LBrace | Token::RBrace => return (value, pos),
            _ => {}
        }
        pos += 1;
    }
    (value, pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"syntax = "proto3";
package demo.v1;

import "google/protobuf/timestamp.proto";

// A shape
message Shape {
  Color color = 1;
  message Point { int32 x = 1; }
  repeated Point points = 2;
}

enum Color {
  RED = 0;
  GREEN = 1;
}

service Painter {
  rpc Paint (Shape) returns (Shape);
}
"#;

    #[test]
    fn test_extracts_records_and_enums() {
        let model = extract_model(SAMPLE).unwrap();
        assert_eq!(model.syntax(), Some("proto3"));
        assert_eq!(model.package(), Some("demo.v1"));
        let names: Vec<_> = model.names().cloned().collect();
        assert_eq!(names, vec!["Shape", "Color"]);
        assert_eq!(model.records().count(), 1);
        assert_eq!(model.enums().count(), 1);
    }

    #[test]
    fn test_body_is_verbatim() {
        let model = extract_model(SAMPLE).unwrap();
        let shape = model.get("Shape").unwrap();
        assert!(shape.body.starts_with("message Shape {"));
        assert!(shape.body.ends_with("repeated Point points = 2;\n}"));
        assert!(shape.body.contains("message Point { int32 x = 1; }"));
        assert_eq!(shape.line, 7);
        assert!(!model.contains("Point"));
    }

    #[test]
    fn test_service_is_skipped() {
        let model = extract_model(SAMPLE).unwrap();
        assert_eq!(model.skipped().len(), 1);
        assert_eq!(model.skipped()[0].keyword, "service");
        assert_eq!(model.skipped()[0].name.as_deref(), Some("Painter"));
    }

    #[test]
    fn test_braces_in_comments_and_strings_are_ignored() {
        let src = "message A {\n  // }\n  string s = 1 [default = \"}\"];\n}\nenum B { X = 0; }";
        let model = extract_model(src).unwrap();
        assert_eq!(model.len(), 2);
        assert!(model.get("A").unwrap().body.ends_with("];\n}"));
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = extract_model("message A {\n  int32 x = 1;\n").unwrap_err();
        match err {
            SplitError::Structural { line, .. } => assert_eq!(line, 1),
            other => panic!("Expected Structural, got {:?}", other),
        }
    }

    #[test]
    fn test_stray_close_brace() {
        let err = extract_model("message A {}\n}\n").unwrap_err();
        assert!(matches!(err, SplitError::Structural { line: 2, .. }));
    }

    #[test]
    fn test_duplicate_names_share_namespace() {
        let err = extract_model("message A {}\nenum A { X = 0; }").unwrap_err();
        match err {
            SplitError::DuplicateType { name, first_line, line } => {
                assert_eq!(name, "A");
                assert_eq!(first_line, 1);
                assert_eq!(line, 2);
            }
            other => panic!("Expected DuplicateType, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        let model = extract_model("").unwrap();
        assert!(model.is_empty());
        assert_eq!(model.syntax(), None);
    }
}
