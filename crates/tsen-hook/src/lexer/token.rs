// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Token definitions for the source scanner.

/// A span in the source code, as byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A token produced by the scanner.
///
/// Tokens do not own their text; use [`Token::text`] with the source they
/// were scanned from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
    /// Whether a line terminator precedes this token
    pub newline_before: bool,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span, newline_before: bool) -> Self {
        Self {
            kind,
            span,
            newline_before,
        }
    }

    /// The source text of this token.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

/// The different kinds of tokens.
///
/// Keywords are scanned as [`TokenKind::Identifier`]; most TypeScript
/// keywords are contextual, so callers compare text instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    /// Identifier or keyword
    Identifier,
    /// Private identifier (#name)
    PrivateName,
    /// String literal, quotes included
    String,
    /// Whole template literal, substitutions included
    Template,
    /// Numeric or BigInt literal
    Number,
    /// Regular expression literal
    RegExp,
    /// `#!` line at the start of the file
    Hashbang,

    // Punctuation
    /// {
    LeftBrace,
    /// }
    RightBrace,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// ;
    Semicolon,
    /// ,
    Comma,
    /// :
    Colon,
    /// .
    Dot,
    /// ...
    Ellipsis,
    /// ?
    Question,
    /// ?.
    QuestionDot,
    /// <
    LessThan,
    /// > (never combined, so `>>` closes two generic lists)
    GreaterThan,
    /// =
    Equal,
    /// =>
    Arrow,
    /// !
    Bang,
    /// *
    Star,
    /// @
    At,
    /// Any other operator
    Operator,

    /// Unterminated literal or comment, or an unknown character
    Invalid,
    /// End of input
    Eof,
}

impl TokenKind {
    /// Opening bracket kinds.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            TokenKind::LeftBrace | TokenKind::LeftParen | TokenKind::LeftBracket
        )
    }

    /// Closing bracket kinds.
    pub fn is_close(self) -> bool {
        matches!(
            self,
            TokenKind::RightBrace | TokenKind::RightParen | TokenKind::RightBracket
        )
    }

    /// Literal kinds that end an operand.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::String
                | TokenKind::Template
                | TokenKind::Number
                | TokenKind::RegExp
                | TokenKind::PrivateName
        )
    }
}

/// Keywords after which an expression (and so a regex literal) may start.
pub const EXPRESSION_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
    "extends",
];

/// Reserved words that never end an operand.
pub const RESERVED_WORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "let",
    "new",
    "return",
    "switch",
    "throw",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
    "await",
];

/// Returns true if `word` is a reserved word.
pub fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}
