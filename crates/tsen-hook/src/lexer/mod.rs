// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical analysis for JavaScript and TypeScript source text.
//!
//! The scanner is lossless in the sense the transforms need: every token
//! keeps its byte span, and whether a line break precedes it, so a pass can
//! edit the original text around tokens without reprinting anything.
//!
//! ## Structure
//!
//! - `scanner.rs` - Main `Scanner` struct that produces tokens
//! - `token.rs` - `Token` and `TokenKind` definitions
//!
//! ## Usage
//!
//! ```rust
//! use tsen_hook::lexer::{Scanner, TokenKind};
//!
//! let mut scanner = Scanner::new("let x: number = 42;");
//!
//! loop {
//!     let token = scanner.next_token();
//!     if matches!(token.kind, TokenKind::Eof) {
//!         break;
//!     }
//!     println!("{:?}", token.kind);
//! }
//! ```

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{is_reserved, Span, Token, TokenKind, EXPRESSION_KEYWORDS, RESERVED_WORDS};

use crate::error::{HookError, Result};

/// Tokenize a whole source text. The returned vector ends with an `Eof`
/// token.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = scanner.next_token();
        match token.kind {
            TokenKind::Invalid => {
                let what = match source[token.span.start..].chars().next() {
                    Some('"' | '\'') => "Unterminated string literal",
                    Some('`') => "Unterminated template literal",
                    Some('/') => "Unterminated regular expression or comment",
                    _ => "Invalid or unexpected token",
                };
                return Err(HookError::syntax(source, token.span.start, what));
            }
            TokenKind::Eof => {
                tokens.push(token);
                return Ok(tokens);
            }
            _ => tokens.push(token),
        }
    }
}

/// Tokens of one source text plus a bracket matching table.
pub struct TokenStream<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    matching: Vec<Option<usize>>,
}

impl<'a> TokenStream<'a> {
    /// Tokenize `source` and match its brackets.
    pub fn new(source: &'a str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut matching = vec![None; tokens.len()];
        let mut stack: Vec<usize> = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            if token.kind.is_open() {
                stack.push(i);
            } else if token.kind.is_close() {
                let Some(open) = stack.pop() else {
                    return Err(HookError::syntax(
                        source,
                        token.span.start,
                        format!("Unexpected token '{}'", token.text(source)),
                    ));
                };
                if !brackets_pair(tokens[open].kind, token.kind) {
                    return Err(HookError::syntax(
                        source,
                        token.span.start,
                        format!("Unexpected token '{}'", token.text(source)),
                    ));
                }
                matching[open] = Some(i);
                matching[i] = Some(open);
            }
        }

        if let Some(open) = stack.pop() {
            let token = tokens[open];
            return Err(HookError::syntax(
                source,
                token.span.start,
                format!("Unclosed '{}'", token.text(source)),
            ));
        }

        Ok(Self {
            source,
            tokens,
            matching,
        })
    }

    /// The source text.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Number of tokens, not counting the trailing `Eof`.
    pub fn len(&self) -> usize {
        self.tokens.len() - 1
    }

    /// Returns true if there are no tokens besides `Eof`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Token at `i`; `Eof` past the end.
    pub fn token(&self, i: usize) -> Token {
        self.tokens
            .get(i)
            .copied()
            .unwrap_or(self.tokens[self.tokens.len() - 1])
    }

    /// Kind of the token at `i`.
    pub fn kind(&self, i: usize) -> TokenKind {
        self.token(i).kind
    }

    /// Text of the token at `i`.
    pub fn text(&self, i: usize) -> &'a str {
        self.token(i).text(self.source)
    }

    /// Span of the token at `i`.
    pub fn span(&self, i: usize) -> Span {
        self.token(i).span
    }

    /// Start offset of the token at `i`.
    pub fn start(&self, i: usize) -> usize {
        self.span(i).start
    }

    /// End offset of the token at `i`.
    pub fn end(&self, i: usize) -> usize {
        self.span(i).end
    }

    /// Whether the token at `i` has the given kind.
    pub fn is(&self, i: usize, kind: TokenKind) -> bool {
        self.kind(i) == kind
    }

    /// Whether the token at `i` is the identifier or keyword `word`.
    pub fn is_word(&self, i: usize, word: &str) -> bool {
        self.is(i, TokenKind::Identifier) && self.text(i) == word
    }

    /// Whether the token at `i` is an operator with this exact text.
    pub fn is_op(&self, i: usize, op: &str) -> bool {
        self.is(i, TokenKind::Operator) && self.text(i) == op
    }

    /// Whether the token at `i` is an identifier that is not reserved.
    pub fn is_name(&self, i: usize) -> bool {
        self.is(i, TokenKind::Identifier) && !is_reserved(self.text(i))
    }

    /// Whether a line break precedes the token at `i`.
    pub fn newline_before(&self, i: usize) -> bool {
        self.token(i).newline_before
    }

    /// Index of the bracket matching the one at `i`.
    pub fn matching(&self, i: usize) -> Option<usize> {
        self.matching.get(i).copied().flatten()
    }

    /// Index just past the bracketed group opened at `i`, or `i + 1` for any
    /// other token.
    pub fn skip_group(&self, i: usize) -> usize {
        if self.kind(i).is_open() {
            self.matching(i).map_or(i + 1, |close| close + 1)
        } else {
            i + 1
        }
    }

    /// Whether the token at `i` can end an operand, so that a following
    /// `as`, `!` or `<` applies to a value.
    pub fn ends_operand(&self, i: usize) -> bool {
        let kind = self.kind(i);
        match kind {
            TokenKind::Identifier => !is_reserved(self.text(i)),
            TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => true,
            _ => kind.is_literal(),
        }
    }

    /// Whether the token at `k` continues the expression on the previous
    /// line instead of starting a new statement.
    pub fn continues_line(&self, k: usize) -> bool {
        matches!(
            self.kind(k),
            TokenKind::Dot
                | TokenKind::QuestionDot
                | TokenKind::Operator
                | TokenKind::Equal
                | TokenKind::Question
                | TokenKind::Colon
                | TokenKind::Comma
                | TokenKind::Arrow
                | TokenKind::LeftParen
                | TokenKind::LeftBracket
                | TokenKind::Template
                | TokenKind::Star
                | TokenKind::LessThan
                | TokenKind::GreaterThan
        )
    }

    /// Whether automatic semicolon insertion ends a statement before `k`.
    pub fn is_line_boundary(&self, k: usize) -> bool {
        k > 0 && self.newline_before(k) && self.ends_operand(k - 1) && !self.continues_line(k)
    }

    /// End of the statement containing `j`, past its `;` if it has one.
    /// Stops at a closing bracket of the enclosing group, at a line break
    /// that ends the statement, and at `end`.
    pub fn statement_end(&self, j: usize, end: usize) -> usize {
        let mut k = j;
        while k < end {
            let kind = self.kind(k);
            if kind == TokenKind::Semicolon {
                return k + 1;
            }
            if kind.is_close() || kind == TokenKind::Eof || self.is_line_boundary(k) {
                return k;
            }
            k = self.skip_group(k);
        }
        end.min(k)
    }
}

fn brackets_pair(open: TokenKind, close: TokenKind) -> bool {
    matches!(
        (open, close),
        (TokenKind::LeftBrace, TokenKind::RightBrace)
            | (TokenKind::LeftParen, TokenKind::RightParen)
            | (TokenKind::LeftBracket, TokenKind::RightBracket)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_ends_with_eof() {
        let tokens = tokenize("a + b").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_reports_position() {
        let err = tokenize("let a = 1;\nlet b = 'oops").unwrap_err();
        assert_eq!(
            err.to_string(),
            "SyntaxError: Unterminated string literal (2:9)"
        );
    }

    #[test]
    fn test_matching_brackets() {
        let stream = TokenStream::new("f(a, [b], {c})").unwrap();
        assert_eq!(stream.matching(1), Some(11));
        assert_eq!(stream.matching(4), Some(6));
        assert_eq!(stream.skip_group(8), 11);
        assert_eq!(stream.skip_group(0), 1);
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert!(TokenStream::new("f(a]").is_err());
        assert!(TokenStream::new("{").is_err());
        assert!(TokenStream::new(")").is_err());
    }

    #[test]
    fn test_statement_end() {
        let stream = TokenStream::new("a = b\n.c(d)\ne();\nf").unwrap();
        assert_eq!(stream.statement_end(0, stream.len()), 8);
        assert_eq!(stream.statement_end(3, stream.len()), 8);
        assert_eq!(stream.statement_end(8, stream.len()), 8);
        assert_eq!(stream.statement_end(9, stream.len()), 12);
        assert_eq!(stream.statement_end(13, stream.len()), 13);
    }

    #[test]
    fn test_past_end_is_eof() {
        let stream = TokenStream::new("x").unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.kind(5), TokenKind::Eof);
        assert!(stream.is_word(0, "x"));
    }
}
