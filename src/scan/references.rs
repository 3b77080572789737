//! Reference extraction
//!
//! Finds the type names a definition body refers to. Four shapes are
//! recognized over the token stream:
//!
//! - plain fields: `[modifier] Type name = N`
//! - fields inside a `oneof name { ... }` block
//! - map value types: `map<K, V>`
//! - call signatures: `rpc Name (Req) returns (Resp)`

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use super::lexer::{Lexer, SpannedToken, Token};
use super::TypeName;

/// Where in a body a reference was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// Plain field type
    Field,
    /// Field inside a union block
    OneOf,
    /// Value type of a map field
    MapValue,
    /// Request or response type of a call declaration
    Call,
}

/// A candidate type token found in a body, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The type token as written (`Foo`, `Outer.Inner`, `.pkg.Foo`)
    pub type_name: String,
    pub kind: RefKind,
    /// Byte offset within the scanned body
    pub offset: usize,
}

/// Whether a token looks like a message or enum type rather than a scalar.
fn is_type_token(token: &str) -> bool {
    let trimmed = token.trim_start_matches('.');
    let starts_upper = trimmed.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false);
    let last_upper = trimmed
        .rsplit('.')
        .next()
        .and_then(|seg| seg.chars().next())
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false);
    starts_upper || (trimmed.contains('.') && last_upper)
}

/// Scan a body for every candidate type reference, unfiltered.
///
/// Candidates are returned in source order and may repeat.
pub fn scan_references(body: &str) -> Vec<Reference> {
    let tokens: Vec<SpannedToken> = Lexer::new(body).map_while(|t| t.ok()).collect();
    let mut refs = Vec::new();
    // Brace depths at which an open oneof block closes
    let mut oneof_depths: Vec<usize> = Vec::new();
    let mut depth = 0usize;

    let ident_at = |i: usize| tokens.get(i).and_then(|t| t.token.ident());
    let is_at = |i: usize, expected: &Token| tokens.get(i).map(|t| &t.token == expected).unwrap_or(false);

    let push = |refs: &mut Vec<Reference>, i: usize, kind: RefKind| {
        if let Some(name) = ident_at(i) {
            if is_type_token(name) {
                refs.push(Reference {
                    type_name: name.to_string(),
                    kind,
                    offset: tokens[i].span.start,
                });
            }
        }
    };

    for i in 0..tokens.len() {
        match &tokens[i].token {
            Token::LBrace => {
                depth += 1;
                // `oneof name {`
                if i >= 2 && tokens[i - 2].token.is_ident("oneof") && ident_at(i - 1).is_some() {
                    oneof_depths.push(depth);
                }
            }
            Token::RBrace => {
                if oneof_depths.last() == Some(&depth) {
                    oneof_depths.pop();
                }
                depth = depth.saturating_sub(1);
            }
            Token::Ident(word) if word == "map" && is_at(i + 1, &Token::LAngle) => {
                // map < K , V >
                if ident_at(i + 2).is_some() && is_at(i + 3, &Token::Comma) && is_at(i + 5, &Token::RAngle) {
                    push(&mut refs, i + 4, RefKind::MapValue);
                }
            }
            Token::Ident(word) if word == "rpc" => {
                // rpc Name ( [stream] Req ) returns ( [stream] Resp )
                let mut j = i + 2;
                if !is_at(j, &Token::LParen) {
                    continue;
                }
                j += 1;
                if ident_at(j) == Some("stream") {
                    j += 1;
                }
                push(&mut refs, j, RefKind::Call);
                j += 1;
                if !is_at(j, &Token::RParen) || ident_at(j + 1) != Some("returns") || !is_at(j + 2, &Token::LParen) {
                    continue;
                }
                j += 3;
                if ident_at(j) == Some("stream") {
                    j += 1;
                }
                push(&mut refs, j, RefKind::Call);
            }
            Token::Ident(_) => {
                // Type name =
                if ident_at(i + 1).is_some() && is_at(i + 2, &Token::Equals) {
                    let kind = if oneof_depths.is_empty() { RefKind::Field } else { RefKind::OneOf };
                    push(&mut refs, i, kind);
                }
            }
            _ => {}
        }
    }

    refs
}

/// Resolve a type token against the known local types.
///
/// A leading `.` and then a leading `<package>.` are stripped first, so
/// `shop.v1.Foo` and `.shop.v1.Foo` name the local `Foo` under
/// `package shop.v1;`. An exact match wins. Otherwise a dotted token
/// resolves to its leading segment when that names a known type, since
/// `Outer.Inner` is defined in the body of `Outer`. Anything else is
/// external.
pub fn resolve_type_token<'k>(
    token: &str,
    known: &HashSet<&'k str>,
    package: Option<&str>,
) -> Option<&'k str> {
    let trimmed = token.trim_start_matches('.');
    let local = package
        .and_then(|pkg| trimmed.strip_prefix(pkg))
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(trimmed);

    if let Some(&name) = known.get(local) {
        return Some(name);
    }
    let (head, _) = local.split_once('.')?;
    known.get(head).copied()
}

/// Set of known type names referenced by a body.
pub fn extract_references(
    body: &str,
    known: &HashSet<&str>,
    package: Option<&str>,
) -> BTreeSet<TypeName> {
    scan_references(body)
        .iter()
        .filter_map(|r| resolve_type_token(&r.type_name, known, package))
        .map(str::to_string)
        .collect()
}
