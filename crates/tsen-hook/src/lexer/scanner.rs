// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The scanner that produces tokens from source text.

use super::token::EXPRESSION_KEYWORDS;
use super::{Span, Token, TokenKind};

/// Multi-character punctuators, longest first. `>` is deliberately absent.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "**=", "<<=", "&&=", "||=", "??=", "...", "=>", "==", "!=", "<=", "++", "--",
    "&&", "||", "??", "?.", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<",
];

/// A scanner that tokenizes JavaScript and TypeScript source code.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    newline_before: bool,
    broken_comment: bool,
    regex_allowed: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            newline_before: false,
            broken_comment: false,
            regex_allowed: true,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if self.current_pos == 0 && self.source.starts_with("#!") {
            while let Some(ch) = self.peek() {
                if is_line_terminator(ch) {
                    break;
                }
                self.advance();
            }
            return Token::new(TokenKind::Hashbang, Span::new(0, self.current_pos), false);
        }

        self.newline_before = false;
        let comment_start = self.current_pos;
        self.skip_whitespace_and_comments();
        let newline_before = self.newline_before;

        if self.broken_comment {
            self.broken_comment = false;
            return Token::new(
                TokenKind::Invalid,
                Span::new(comment_start, self.current_pos),
                newline_before,
            );
        }

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start), newline_before);
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '@' => TokenKind::At,
            '>' => TokenKind::GreaterThan,

            '"' | '\'' => self.scan_string(ch),
            '`' => self.scan_template(),

            '0'..='9' => self.scan_number(ch),
            '.' if matches!(self.peek(), Some('0'..='9')) => self.scan_number(ch),

            '/' if self.regex_allowed => self.scan_regex(),

            '#' => self.scan_private_name(),

            _ if is_id_start(ch) => self.scan_identifier(),

            _ => self.scan_punctuator(start, ch),
        };

        let span = Span::new(start, self.current_pos);
        self.regex_allowed = regex_may_follow(kind, &self.source[span.start..span.end]);
        Token::new(kind, span, newline_before)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if is_line_terminator(ch) => {
                    self.newline_before = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if is_line_terminator(ch) {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        let mut closed = false;
                        while let Some((_, ch)) = self.advance() {
                            if is_line_terminator(ch) {
                                self.newline_before = true;
                            }
                            if prev == '*' && ch == '/' {
                                closed = true;
                                break;
                            }
                            prev = ch;
                        }
                        if !closed {
                            self.broken_comment = true;
                            return;
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        loop {
            match self.advance() {
                None => return TokenKind::Invalid,
                Some((_, ch)) if ch == quote => return TokenKind::String,
                Some((_, '\\')) => {
                    // Escapes, including escaped line continuations
                    if let Some((_, '\r')) = self.advance() {
                        if self.peek() == Some('\n') {
                            self.advance();
                        }
                    }
                }
                Some((_, '\n' | '\r')) => return TokenKind::Invalid,
                Some(_) => {}
            }
        }
    }

    fn scan_template(&mut self) -> TokenKind {
        loop {
            match self.advance() {
                None => return TokenKind::Invalid,
                Some((_, '`')) => return TokenKind::Template,
                Some((_, '\\')) => {
                    self.advance();
                }
                Some((_, '$')) if self.peek() == Some('{') => {
                    self.advance();
                    if !self.scan_substitution() {
                        return TokenKind::Invalid;
                    }
                }
                Some(_) => {}
            }
        }
    }

    /// Consume tokens up to the `}` closing a `${` substitution.
    fn scan_substitution(&mut self) -> bool {
        self.regex_allowed = true;
        let mut depth = 0usize;
        loop {
            let token = self.next_token();
            match token.kind {
                TokenKind::Eof | TokenKind::Invalid => return false,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace if depth == 0 => return true,
                TokenKind::RightBrace => depth -= 1,
                _ => {}
            }
        }
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        let hex = first == '0' && matches!(self.peek(), Some('x' | 'X'));
        let mut seen_dot = first == '.';
        let mut prev = first;

        while let Some(ch) = self.peek() {
            let accept = if ch == '.' {
                !hex && !seen_dot && !matches!(prev, 'e' | 'E')
            } else if ch == '+' || ch == '-' {
                !hex && matches!(prev, 'e' | 'E')
            } else {
                ch.is_ascii_alphanumeric() || ch == '_'
            };
            if !accept {
                break;
            }
            if ch == '.' {
                seen_dot = true;
            }
            prev = ch;
            self.advance();
        }

        TokenKind::Number
    }

    fn scan_regex(&mut self) -> TokenKind {
        let mut in_class = false;
        loop {
            match self.advance() {
                None => return TokenKind::Invalid,
                Some((_, ch)) if is_line_terminator(ch) => return TokenKind::Invalid,
                Some((_, '\\')) => match self.advance() {
                    None => return TokenKind::Invalid,
                    Some((_, ch)) if is_line_terminator(ch) => return TokenKind::Invalid,
                    Some(_) => {}
                },
                Some((_, '[')) => in_class = true,
                Some((_, ']')) => in_class = false,
                Some((_, '/')) if !in_class => break,
                Some(_) => {}
            }
        }

        // Flags
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::RegExp
    }

    fn scan_identifier(&mut self) -> TokenKind {
        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Identifier
    }

    fn scan_private_name(&mut self) -> TokenKind {
        match self.peek() {
            Some(ch) if is_id_start(ch) => {
                self.scan_identifier();
                TokenKind::PrivateName
            }
            _ => TokenKind::Invalid,
        }
    }

    fn scan_punctuator(&mut self, start: usize, first: char) -> TokenKind {
        let rest = &self.source[start..];
        let matched = PUNCTUATORS.iter().find(|p| {
            rest.starts_with(**p)
                && !(**p == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()))
        });

        if let Some(op) = matched {
            // The first character is already consumed.
            for _ in 1..op.len() {
                self.advance();
            }
            return match *op {
                "..." => TokenKind::Ellipsis,
                "=>" => TokenKind::Arrow,
                "?." => TokenKind::QuestionDot,
                _ => TokenKind::Operator,
            };
        }

        match first {
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            '<' => TokenKind::LessThan,
            '=' => TokenKind::Equal,
            '!' => TokenKind::Bang,
            '*' => TokenKind::Star,
            '+' | '-' | '/' | '%' | '&' | '|' | '^' | '~' => TokenKind::Operator,
            _ => TokenKind::Invalid,
        }
    }
}

/// Whether a `/` after a token of this kind starts a regular expression.
fn regex_may_follow(kind: TokenKind, text: &str) -> bool {
    match kind {
        TokenKind::Identifier => EXPRESSION_KEYWORDS.contains(&text),
        TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => false,
        TokenKind::Operator => text != "++" && text != "--",
        _ if kind.is_literal() => false,
        _ => true,
    }
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_'
        || ch == '$'
        || ch == '\u{200c}'
        || ch == '\u{200d}'
        || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}
