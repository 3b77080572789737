//! Tokenizer for the schema subset the splitter understands.
//!
//! Comments are stripped during lexing and string literals are a single
//! token, so neither can ever be mistaken for a field declaration.

use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

/// A region of the source text, in byte offsets.
#[derive(Clone, Debug, PartialEq, Eq, Copy)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A token along with its position in the source text.
#[derive(Clone, Debug, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Identifier or keyword, possibly dotted (`pkg.Type`, `.pkg.Type`)
    Ident(String),
    Number(String),
    Str(String),

    LBrace,
    RBrace,
    LAngle,
    RAngle,
    LParen,
    RParen,
    LBracket,
    RBracket,

    Equals,
    Comma,
    Semicolon,

    Other(char),
}

impl Token {
    /// Returns the identifier text if this is an identifier token.
    pub fn ident(&self) -> Option<&str> {
        match self {
            Token::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_ident(&self, expected: &str) -> bool {
        self.ident() == Some(expected)
    }
}

/// Errors that can occur during lexical analysis.
#[derive(Error, Debug, PartialEq)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString(usize),
    #[error("unterminated block comment")]
    UnterminatedComment(usize),
}

impl LexError {
    /// Byte offset where the offending construct starts.
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedString(offset) | LexError::UnterminatedComment(offset) => *offset,
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
}

/// A lexical analyzer that converts schema text into a stream of tokens.
pub struct Lexer<'a> {
    source: &'a str,
    input: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            input: source.char_indices().peekable(),
        }
    }

    /// Collects all tokens, stopping at the first error.
    pub fn tokenize(source: &'a str) -> Result<Vec<SpannedToken>, LexError> {
        Lexer::new(source).collect()
    }

    fn offset(&mut self) -> usize {
        self.input
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len())
    }

    fn peek_char(&mut self) -> Option<char> {
        self.input.peek().map(|(_, ch)| *ch)
    }

    fn peek_second(&self) -> Option<char> {
        let mut lookahead = self.input.clone();
        lookahead.next();
        lookahead.next().map(|(_, ch)| ch)
    }

    /// Skips whitespace and comments. Returns an error for an unterminated
    /// block comment.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.input.next();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    for (_, ch) in self.input.by_ref() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let start = self.offset();
                    self.input.next();
                    self.input.next();
                    let mut prev = '\0';
                    let mut closed = false;
                    for (_, ch) in self.input.by_ref() {
                        if prev == '*' && ch == '/' {
                            closed = true;
                            break;
                        }
                        prev = ch;
                    }
                    if !closed {
                        return Err(LexError::UnterminatedComment(start));
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Result<Token, LexError> {
        let mut value = String::new();
        loop {
            let (_, ch) = self
                .input
                .next()
                .ok_or(LexError::UnterminatedString(start))?;
            match ch {
                '\\' => {
                    let (_, escaped) = self
                        .input
                        .next()
                        .ok_or(LexError::UnterminatedString(start))?;
                    value.push('\\');
                    value.push(escaped);
                }
                '\n' => return Err(LexError::UnterminatedString(start)),
                ch if ch == quote => return Ok(Token::Str(value)),
                ch => value.push(ch),
            }
        }
    }

    fn lex_while(&mut self, first: char, pred: fn(char) -> bool) -> String {
        let mut text = String::from(first);
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            text.push(ch);
            self.input.next();
        }
        text
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<SpannedToken, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(err) = self.skip_trivia() {
            // Drain so iteration ends after reporting the error.
            self.input.by_ref().for_each(drop);
            return Some(Err(err));
        }

        let (start, ch) = self.input.next()?;

        let token = match ch {
            '{' => Ok(Token::LBrace),
            '}' => Ok(Token::RBrace),
            '<' => Ok(Token::LAngle),
            '>' => Ok(Token::RAngle),
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            '[' => Ok(Token::LBracket),
            ']' => Ok(Token::RBracket),
            '=' => Ok(Token::Equals),
            ',' => Ok(Token::Comma),
            ';' => Ok(Token::Semicolon),
            '"' | '\'' => self.lex_string(start, ch),
            '.' if self.peek_char().map(is_ident_start).unwrap_or(false) => {
                Ok(Token::Ident(self.lex_while(ch, is_ident_continue)))
            }
            ch if is_ident_start(ch) => Ok(Token::Ident(self.lex_while(ch, is_ident_continue))),
            ch if ch.is_ascii_digit() => Ok(Token::Number(
                self.lex_while(ch, |c| c.is_ascii_alphanumeric() || c == '.'),
            )),
            ch => Ok(Token::Other(ch)),
        };

        if token.is_err() {
            self.input.by_ref().for_each(drop);
        }

        let end = self.offset();
        Some(token.map(|token| SpannedToken {
            token,
            span: Span { start, end },
        }))
    }
}

/// 1-based line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_field_line() {
        assert_eq!(
            tokens("repeated Foo items = 1;"),
            vec![
                Token::Ident("repeated".into()),
                Token::Ident("Foo".into()),
                Token::Ident("items".into()),
                Token::Equals,
                Token::Number("1".into()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let input = "// Foo bar = 1;\n/* Baz qux = 2; */ Real name = 3;";
        assert_eq!(
            tokens(input),
            vec![
                Token::Ident("Real".into()),
                Token::Ident("name".into()),
                Token::Equals,
                Token::Number("3".into()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_string_is_single_token() {
        assert_eq!(
            tokens(r#"option note = "Foo bar = 1";"#),
            vec![
                Token::Ident("option".into()),
                Token::Ident("note".into()),
                Token::Equals,
                Token::Str("Foo bar = 1".into()),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            tokens(".google.protobuf.Timestamp Outer.Inner"),
            vec![
                Token::Ident(".google.protobuf.Timestamp".into()),
                Token::Ident("Outer.Inner".into()),
            ]
        );
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let input = "é message";
        let toks = Lexer::tokenize(input).unwrap();
        assert_eq!(toks[0].token, Token::Other('é'));
        assert_eq!(toks[1].span, Span { start: 3, end: 10 });
        assert_eq!(&input[toks[1].span.start..toks[1].span.end], "message");
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::tokenize("name = \"oops").unwrap_err();
        assert_eq!(err, LexError::UnterminatedString(7));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = Lexer::tokenize("message A { /* never closed").unwrap_err();
        assert_eq!(err, LexError::UnterminatedComment(12));
    }

    #[test]
    fn test_line_of() {
        let src = "a\nb\nc";
        assert_eq!(line_of(src, 0), 1);
        assert_eq!(line_of(src, 2), 2);
        assert_eq!(line_of(src, 4), 3);
    }
}
