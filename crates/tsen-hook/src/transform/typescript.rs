// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! TypeScript type erasure.
//!
//! Works on tokens and edits the original text in place, so everything that
//! is not TypeScript syntax comes out byte for byte as it went in, and every
//! line stays on its line.
//!
//! ## Erased
//!
//! ```typescript
//! interface User { name: string }          // removed
//! type ID = string | number;               // removed
//! declare const VERSION: string;           // removed
//! import type { A } from './a';            // removed
//! let x: number = 42;                      // let x = 42;
//! function id<T>(x: T): T { return x; }    // function id(x) { return x; }
//! const s = value as string;               // const s = value;
//! user!.name                               // user.name
//! ```
//!
//! ## Rewritten
//!
//! - `enum` declarations become an object filled by an IIFE, with a reverse
//!   mapping for numeric members
//! - constructor parameter properties (`constructor(private x: number)`)
//!   become `this.x = x;` at the start of the body (after `super(...)`)
//! - `import x = require('m')` becomes `const x = require('m')`
//! - `export = x` becomes `module.exports = x`
//!
//! Value namespaces are rejected. Decorators are left untouched.

use super::patch::Patcher;
use crate::error::{HookError, Result};
use crate::lexer::{TokenKind, TokenStream, EXPRESSION_KEYWORDS};

/// Modifiers that only exist in TypeScript.
const TS_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

/// Class member modifiers, TypeScript and JavaScript.
const MEMBER_MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "readonly",
    "override",
    "declare",
    "abstract",
    "static",
    "async",
    "get",
    "set",
    "accessor",
];

/// Keywords whose parenthesized head is not an expression.
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "with"];

/// Strip TypeScript syntax from `source`.
pub fn strip_types(source: &str) -> Result<String> {
    let tokens = TokenStream::new(source)?;
    let mut eraser = TypeEraser {
        t: &tokens,
        patch: Patcher::new(source),
    };
    eraser.process(0, tokens.len())?;
    Ok(eraser.patch.finish())
}

struct TypeEraser<'s, 'a> {
    t: &'s TokenStream<'a>,
    patch: Patcher<'a>,
}

enum AutoValue {
    Number(f64),
    Expr(String),
    None,
}

impl<'s, 'a> TypeEraser<'s, 'a> {
    fn process(&mut self, start: usize, end: usize) -> Result<()> {
        let mut i = start;
        while i < end {
            i = self.step(i, end)?.max(i + 1);
        }
        Ok(())
    }

    fn step(&mut self, i: usize, end: usize) -> Result<usize> {
        if self.at_statement_start(i) {
            if let Some(next) = self.statement(i, end)? {
                return Ok(next);
            }
        }

        match self.t.kind(i) {
            TokenKind::Identifier => self.identifier(i, end),
            TokenKind::LessThan => Ok(self.angle(i)),
            TokenKind::Bang => {
                // Non-null assertion: `x!`
                if i > 0 && self.ends_value(i - 1) && self.t.end(i - 1) == self.t.start(i) {
                    self.remove_tokens(i, i + 1);
                }
                Ok(i + 1)
            }
            TokenKind::LeftParen => self.paren(i),
            _ => Ok(i + 1),
        }
    }

    fn identifier(&mut self, i: usize, end: usize) -> Result<usize> {
        let t = self.t;
        match t.text(i) {
            "let" | "const" | "var" if self.starts_binding(i + 1) => self.declarations(i + 1, end),
            "function" => self.function(i, end),
            "class" => self.class(i, end),
            "as" | "satisfies"
                if i > 0 && self.ends_value(i - 1) && !t.newline_before(i) =>
            {
                let stop = self.skip_type(i + 1);
                if stop > i + 1 {
                    self.remove_after(i - 1, stop);
                }
                Ok(stop)
            }
            _ => Ok(i + 1),
        }
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn statement(&mut self, i: usize, end: usize) -> Result<Option<usize>> {
        let t = self.t;
        if !t.is(i, TokenKind::Identifier) {
            return Ok(None);
        }
        let same_line = !t.newline_before(i + 1);

        let next = match t.text(i) {
            "interface" if t.is_name(i + 1) && same_line => {
                let stop = self.interface_end(i + 1);
                self.remove_tokens(i, stop);
                Some(stop)
            }
            "type" if same_line && self.is_type_alias(i + 1) => {
                let stop = self.type_alias_end(i + 1);
                self.remove_tokens(i, stop);
                Some(stop)
            }
            "declare" if t.is(i + 1, TokenKind::Identifier) && same_line => {
                let stop = self.t.statement_end(i + 1, end);
                self.remove_tokens(i, stop);
                Some(stop)
            }
            "abstract" if t.is_word(i + 1, "class") && same_line => {
                self.remove_tokens(i, i + 1);
                Some(i + 1)
            }
            "enum" if t.is_name(i + 1) && t.is(i + 2, TokenKind::LeftBrace) => {
                Some(self.enum_declaration(i, i, end)?)
            }
            "const" if t.is_word(i + 1, "enum") && t.is_name(i + 2) => {
                Some(self.enum_declaration(i, i + 1, end)?)
            }
            "namespace" | "module"
                if t.is_name(i + 1)
                    && same_line
                    && matches!(t.kind(i + 2), TokenKind::LeftBrace | TokenKind::Dot) =>
            {
                return Err(HookError::unsupported(
                    t.source(),
                    t.start(i),
                    "namespaces are not supported; use modules",
                ));
            }
            "import" => self.import_statement(i, end),
            "export" => self.export_statement(i, end)?,
            _ => None,
        };
        Ok(next)
    }

    fn import_statement(&mut self, i: usize, end: usize) -> Option<usize> {
        let t = self.t;
        let j = i + 1;
        if matches!(t.kind(j), TokenKind::LeftParen | TokenKind::Dot) {
            return None;
        }

        if t.is_word(j, "type") && self.is_type_only_clause(j + 1) {
            let stop = self.t.statement_end(j, end);
            self.remove_tokens(i, stop);
            return Some(stop);
        }

        // import x = require('m')
        if t.is_name(j) && t.is(j + 1, TokenKind::Equal) {
            self.patch.replace(t.start(i)..t.end(i), "const");
            return Some(j);
        }

        let mut k = j;
        let mut has_binding = false;
        if t.is(k, TokenKind::String) {
            return Some(self.t.statement_end(k, end));
        }
        if t.is_name(k) && !t.is_word(k, "from") {
            has_binding = true;
            k += 1;
            if t.is(k, TokenKind::Comma) {
                k += 1;
            }
        }
        if t.is(k, TokenKind::Star) {
            has_binding = true;
            k += 3;
        }
        let mut removed = 0;
        let mut kept = 0;
        if t.is(k, TokenKind::LeftBrace) {
            let close = t.matching(k).unwrap_or(k);
            (removed, kept) = self.strip_type_specifiers(k, close);
            k = close + 1;
        }

        let stop = self.t.statement_end(k, end);
        if removed > 0 && kept == 0 && !has_binding {
            self.remove_tokens(i, stop);
        }
        Some(stop)
    }

    fn export_statement(&mut self, i: usize, end: usize) -> Result<Option<usize>> {
        let t = self.t;
        let j = i + 1;

        let next = match t.kind(j) {
            TokenKind::Equal => {
                self.patch.replace(t.start(i)..t.end(j), "module.exports =");
                Some(j + 1)
            }
            TokenKind::LeftBrace => {
                let close = t.matching(j).unwrap_or(j);
                let (removed, kept) = self.strip_type_specifiers(j, close);
                let stop = self.t.statement_end(close + 1, end);
                if removed > 0 && kept == 0 {
                    self.remove_tokens(i, stop);
                }
                Some(stop)
            }
            TokenKind::Identifier => match t.text(j) {
                "type" if matches!(t.kind(j + 1), TokenKind::LeftBrace | TokenKind::Star) => {
                    let stop = self.t.statement_end(j + 1, end);
                    self.remove_tokens(i, stop);
                    Some(stop)
                }
                "type" if self.is_type_alias(j + 1) => {
                    let stop = self.type_alias_end(j + 1);
                    self.remove_tokens(i, stop);
                    Some(stop)
                }
                "interface" if t.is_name(j + 1) => {
                    let stop = self.interface_end(j + 1);
                    self.remove_tokens(i, stop);
                    Some(stop)
                }
                "declare" => {
                    let stop = self.t.statement_end(j + 1, end);
                    self.remove_tokens(i, stop);
                    Some(stop)
                }
                "enum" if t.is_name(j + 1) => Some(self.enum_declaration(j, j, end)?),
                "const" if t.is_word(j + 1, "enum") => {
                    Some(self.enum_declaration(j, j + 1, end)?)
                }
                "abstract" if t.is_word(j + 1, "class") => {
                    self.remove_tokens(j, j + 1);
                    Some(j + 1)
                }
                "namespace" | "module" if t.is_name(j + 1) => {
                    return Err(HookError::unsupported(
                        t.source(),
                        t.start(j),
                        "namespaces are not supported; use modules",
                    ));
                }
                "default" if t.is_word(j + 1, "interface") => {
                    let stop = self.interface_end(j + 2);
                    self.remove_tokens(i, stop);
                    Some(stop)
                }
                "default" if t.is_word(j + 1, "abstract") && t.is_word(j + 2, "class") => {
                    self.remove_tokens(j + 1, j + 2);
                    Some(j + 2)
                }
                _ => None,
            },
            _ => None,
        };
        Ok(next)
    }

    /// `import type X`, `import type { .. }`, `import type * as ns`, but not a
    /// default import named `type`.
    fn is_type_only_clause(&self, k: usize) -> bool {
        let t = self.t;
        match t.kind(k) {
            TokenKind::LeftBrace | TokenKind::Star => true,
            TokenKind::Identifier if t.text(k) == "from" => !t.is(k + 1, TokenKind::String),
            TokenKind::Identifier => true,
            _ => false,
        }
    }

    /// Remove `type X` entries of a specifier list. Returns how many were
    /// removed and how many were kept.
    fn strip_type_specifiers(&mut self, open: usize, close: usize) -> (usize, usize) {
        let t = self.t;
        let mut removed = 0;
        let mut kept = 0;
        let mut a = open + 1;

        while a < close {
            let mut b = a;
            while b < close && !t.is(b, TokenKind::Comma) {
                b = t.skip_group(b);
            }
            let len = b - a;
            let renamed_type = len == 3 && t.is_word(a + 1, "as");
            if t.is_word(a, "type") && len >= 2 && !renamed_type {
                let stop = if t.is(b, TokenKind::Comma) { b + 1 } else { b };
                self.remove_tokens(a, stop);
                removed += 1;
            } else if len > 0 {
                kept += 1;
            }
            a = b + 1;
        }

        (removed, kept)
    }

    fn is_type_alias(&self, j: usize) -> bool {
        let t = self.t;
        if !t.is_name(j) {
            return false;
        }
        let mut k = j + 1;
        if t.is(k, TokenKind::LessThan) {
            match self.angle_end(k) {
                Some(e) => k = e,
                None => return false,
            }
        }
        t.is(k, TokenKind::Equal)
    }

    fn type_alias_end(&self, j: usize) -> usize {
        let t = self.t;
        let mut k = j + 1;
        if t.is(k, TokenKind::LessThan) {
            k = self.angle_end(k).unwrap_or(k);
        }
        let stop = self.skip_type(k + 1);
        if t.is(stop, TokenKind::Semicolon) {
            stop + 1
        } else {
            stop
        }
    }

    fn interface_end(&self, j: usize) -> usize {
        let t = self.t;
        let mut k = j + 1;
        if t.is(k, TokenKind::LessThan) {
            k = self.angle_end(k).unwrap_or(k + 1);
        }
        if t.is_word(k, "extends") {
            loop {
                k = self.skip_type(k + 1);
                if !t.is(k, TokenKind::Comma) {
                    break;
                }
            }
        }
        if t.is(k, TokenKind::LeftBrace) {
            t.skip_group(k)
        } else {
            k
        }
    }

    fn enum_declaration(&mut self, start: usize, keyword: usize, end: usize) -> Result<usize> {
        let t = self.t;
        let name = t.text(keyword + 1);
        let open = keyword + 2;
        let Some(close) = t.matching(open).filter(|_| t.is(open, TokenKind::LeftBrace)) else {
            return Ok(self.t.statement_end(keyword, end));
        };

        let mut out = format!("var {name} = {name} || {{}}; (function ({name}) {{");
        let mut auto = AutoValue::Number(0.0);
        let mut k = open + 1;

        while k < close {
            let key = match t.kind(k) {
                TokenKind::Identifier => format!("\"{}\"", t.text(k)),
                TokenKind::String => t.text(k).to_string(),
                _ => {
                    return Err(HookError::unsupported(
                        t.source(),
                        t.start(k),
                        "computed enum member names are not supported",
                    ));
                }
            };
            k += 1;

            if t.is(k, TokenKind::Equal) {
                let a = k + 1;
                let mut b = a;
                while b < close && !t.is(b, TokenKind::Comma) {
                    b = t.skip_group(b);
                }
                if b == a {
                    return Err(HookError::syntax(t.source(), t.start(k), "Expected enum initializer"));
                }
                let expr = &t.source()[t.start(a)..t.end(b - 1)];

                if b == a + 1 && t.is(a, TokenKind::String) {
                    out.push_str(&format!(" {name}[{key}] = {expr};"));
                    auto = AutoValue::None;
                } else {
                    out.push_str(&format!(" {name}[{name}[{key}] = {expr}] = {key};"));
                    auto = match expr.replace('_', "").parse::<f64>() {
                        Ok(n) if b == a + 1 && t.is(a, TokenKind::Number) => AutoValue::Number(n + 1.0),
                        _ => AutoValue::Expr(format!("{name}[{key}] + 1")),
                    };
                }
                k = b;
            } else {
                let value = match &auto {
                    AutoValue::Number(n) => format_number(*n),
                    AutoValue::Expr(e) => e.clone(),
                    AutoValue::None => {
                        return Err(HookError::syntax(
                            t.source(),
                            t.start(k - 1),
                            "Enum member must have initializer",
                        ));
                    }
                };
                out.push_str(&format!(" {name}[{name}[{key}] = {value}] = {key};"));
                auto = match auto {
                    AutoValue::Number(n) => AutoValue::Number(n + 1.0),
                    _ => AutoValue::Expr(format!("{name}[{key}] + 1")),
                };
            }

            if t.is(k, TokenKind::Comma) {
                k += 1;
            }
        }

        out.push_str(&format!(" }})({name});"));
        self.patch.replace(t.start(start)..t.end(close), out);
        Ok(close + 1)
    }

    // ---------------------------------------------------------------------
    // Declarations and functions
    // ---------------------------------------------------------------------

    fn starts_binding(&self, j: usize) -> bool {
        let t = self.t;
        t.is_name(j) || matches!(t.kind(j), TokenKind::LeftBrace | TokenKind::LeftBracket)
    }

    /// Variable declarators starting at the first binding.
    fn declarations(&mut self, j: usize, end: usize) -> Result<usize> {
        let t = self.t;
        let mut i = j;
        loop {
            match t.kind(i) {
                TokenKind::Identifier => i += 1,
                TokenKind::LeftBrace | TokenKind::LeftBracket => {
                    let close = t.matching(i).unwrap_or(i);
                    self.process(i + 1, close)?;
                    i = close + 1;
                }
                _ => return Ok(i),
            }

            // Definite assignment: `let x!: T`
            if t.is(i, TokenKind::Bang) && t.is(i + 1, TokenKind::Colon) {
                self.remove_tokens(i, i + 1);
                i += 1;
            }
            if t.is(i, TokenKind::Colon) {
                let stop = self.skip_type(i + 1);
                self.remove_tokens(i, stop);
                i = stop;
            }
            if t.is(i, TokenKind::Equal) {
                let stop = self.expression_end(i + 1, end, true);
                self.process(i + 1, stop)?;
                i = stop;
            }
            if t.is(i, TokenKind::Comma) {
                i += 1;
                continue;
            }
            return Ok(i);
        }
    }

    fn function(&mut self, i: usize, end: usize) -> Result<usize> {
        let t = self.t;
        let mut j = i + 1;
        if t.is(j, TokenKind::Star) {
            j += 1;
        }
        if t.is(j, TokenKind::Identifier) {
            j += 1;
        }
        if t.is(j, TokenKind::LessThan) {
            if let Some(stop) = self.angle_end(j) {
                self.remove_tokens(j, stop);
                j = stop;
            }
        }
        if !t.is(j, TokenKind::LeftParen) {
            return Ok(i + 1);
        }

        let close = t.matching(j).unwrap_or(j);
        self.params(j, false)?;
        let k = self.return_type(close + 1);
        if t.is(k, TokenKind::LeftBrace) {
            return Ok(k);
        }

        // Overload signature
        let start = self.declaration_start(i);
        let stop = self.t.statement_end(k, end);
        self.remove_tokens(start, stop);
        Ok(stop)
    }

    /// Walk back over `export`, `default`, `declare` and `async`.
    fn declaration_start(&self, i: usize) -> usize {
        let t = self.t;
        let mut start = i;
        while start > 0
            && matches!(t.text(start - 1), "export" | "default" | "declare" | "async")
            && t.is(start - 1, TokenKind::Identifier)
        {
            start -= 1;
        }
        start
    }

    /// Remove `: T` after a parameter list. Returns the index after it.
    fn return_type(&mut self, k: usize) -> usize {
        if self.t.is(k, TokenKind::Colon) {
            let stop = self.skip_type(k + 1);
            self.remove_tokens(k, stop);
            stop
        } else {
            k
        }
    }

    /// Erase types in a parameter list. Returns the names of constructor
    /// parameter properties.
    fn params(&mut self, open: usize, constructor: bool) -> Result<Vec<String>> {
        let t = self.t;
        let Some(close) = t.matching(open) else {
            return Ok(Vec::new());
        };
        let mut properties = Vec::new();
        let mut i = open + 1;

        while i < close {
            let param_start = i;

            if t.is_word(i, "this") && t.is(i + 1, TokenKind::Colon) {
                let stop = self.skip_type(i + 2);
                let stop = if t.is(stop, TokenKind::Comma) { stop + 1 } else { stop };
                self.remove_tokens(i, stop);
                i = stop;
                continue;
            }

            let mut property = false;
            while t.is(i, TokenKind::Identifier)
                && TS_MODIFIERS.contains(&t.text(i))
                && matches!(
                    t.kind(i + 1),
                    TokenKind::Identifier | TokenKind::LeftBrace | TokenKind::LeftBracket
                )
            {
                self.remove_tokens(i, i + 1);
                property = true;
                i += 1;
            }

            if t.is(i, TokenKind::Ellipsis) {
                i += 1;
            }
            let mut name = None;
            match t.kind(i) {
                TokenKind::Identifier => {
                    name = Some(t.text(i));
                    i += 1;
                }
                TokenKind::LeftBrace | TokenKind::LeftBracket => {
                    let group_close = t.matching(i).unwrap_or(i);
                    self.process(i + 1, group_close)?;
                    i = group_close + 1;
                }
                _ => {}
            }

            if t.is(i, TokenKind::Question) {
                self.remove_tokens(i, i + 1);
                i += 1;
            }
            if t.is(i, TokenKind::Colon) {
                let stop = self.skip_type(i + 1);
                self.remove_tokens(i, stop);
                i = stop;
            }
            if t.is(i, TokenKind::Equal) {
                let stop = self.until_comma(i + 1, close);
                self.process(i + 1, stop)?;
                i = stop;
            }

            if property && constructor {
                if let Some(name) = name {
                    properties.push(name.to_string());
                }
            }

            if i < close && !t.is(i, TokenKind::Comma) {
                let stop = self.until_comma(i, close);
                self.process(i, stop)?;
                i = stop;
            }
            if t.is(i, TokenKind::Comma) {
                i += 1;
            }
            if i == param_start {
                i += 1;
            }
        }

        Ok(properties)
    }

    fn paren(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        let Some(close) = t.matching(i) else {
            return Ok(i + 1);
        };

        // Arrow function: `(a: T): R =>`
        let arrow = if t.is(close + 1, TokenKind::Arrow) {
            Some(close + 1)
        } else if t.is(close + 1, TokenKind::Colon) {
            let stop = self.skip_type(close + 2);
            t.is(stop, TokenKind::Arrow).then_some(stop)
        } else {
            None
        };
        if arrow.is_some() {
            self.params(i, false)?;
            return Ok(self.return_type(close + 1));
        }

        // Object literal method or catch clause: `name(a: T): R {`
        if i > 0 && self.is_method_name(i - 1) {
            let body = if t.is(close + 1, TokenKind::Colon) {
                self.skip_type(close + 2)
            } else {
                close + 1
            };
            let method = t.is(body, TokenKind::LeftBrace)
                && (body != close + 1 || !t.newline_before(body));
            if method {
                self.params(i, false)?;
                return Ok(self.return_type(close + 1));
            }
        }

        Ok(i + 1)
    }

    fn is_method_name(&self, j: usize) -> bool {
        let t = self.t;
        match t.kind(j) {
            TokenKind::Identifier => t.text(j) == "catch" || t.is_name(j),
            TokenKind::String | TokenKind::Number | TokenKind::PrivateName => true,
            TokenKind::RightBracket => true,
            _ => false,
        }
    }

    // ---------------------------------------------------------------------
    // Classes
    // ---------------------------------------------------------------------

    fn class(&mut self, i: usize, end: usize) -> Result<usize> {
        let t = self.t;
        let mut j = i + 1;
        if t.is_name(j) && !t.is_word(j, "implements") {
            j += 1;
        }
        if t.is(j, TokenKind::LessThan) {
            if let Some(stop) = self.angle_end(j) {
                self.remove_tokens(j, stop);
                j = stop;
            }
        }

        // Heritage clauses
        while j < end && !t.is(j, TokenKind::LeftBrace) {
            if t.is_word(j, "implements") {
                let mut body = j + 1;
                while body < end && !t.is(body, TokenKind::LeftBrace) {
                    body = t.skip_group(body);
                }
                self.remove_after(j - 1, body);
                j = body;
                break;
            }
            if t.is(j, TokenKind::LessThan) && j > 0 && self.ends_value(j - 1) {
                if let Some(stop) = self.angle_end(j) {
                    self.remove_tokens(j, stop);
                    j = stop;
                    continue;
                }
            }
            if t.is(j, TokenKind::LeftParen) {
                let close = t.matching(j).unwrap_or(j);
                self.process(j + 1, close)?;
                j = close + 1;
                continue;
            }
            j = t.skip_group(j);
        }

        let Some(close) = t.matching(j).filter(|_| t.is(j, TokenKind::LeftBrace)) else {
            return Ok(j);
        };
        self.class_body(j, close)?;
        Ok(close + 1)
    }

    fn class_body(&mut self, open: usize, close: usize) -> Result<()> {
        let mut i = open + 1;
        while i < close {
            if self.t.is(i, TokenKind::Semicolon) {
                i += 1;
                continue;
            }
            i = self.member(i, close)?.max(i + 1);
        }
        Ok(())
    }

    fn member(&mut self, start: usize, close: usize) -> Result<usize> {
        let t = self.t;
        let mut j = start;

        // Decorators pass through untouched.
        while t.is(j, TokenKind::At) {
            j += 1;
            while matches!(t.kind(j), TokenKind::Identifier | TokenKind::Dot) {
                j += 1;
            }
            if t.is(j, TokenKind::LeftParen) {
                j = t.skip_group(j);
            }
        }

        let mut drop_member = false;
        while t.is(j, TokenKind::Identifier)
            && MEMBER_MODIFIERS.contains(&t.text(j))
            && self.modifier_applies(j)
        {
            match t.text(j) {
                "declare" | "abstract" => drop_member = true,
                word if TS_MODIFIERS.contains(&word) => self.remove_tokens(j, j + 1),
                _ => {}
            }
            j += 1;
        }

        if t.is(j, TokenKind::Star) {
            j += 1;
        }

        // Static initialization block
        if t.is_word(j, "static") && t.is(j + 1, TokenKind::LeftBrace) {
            let block_close = t.matching(j + 1).unwrap_or(j + 1);
            self.process(j + 2, block_close)?;
            return Ok(block_close + 1);
        }

        let name = j;
        match t.kind(j) {
            TokenKind::Identifier
            | TokenKind::String
            | TokenKind::Number
            | TokenKind::PrivateName => j += 1,
            TokenKind::LeftBracket => {
                let group_close = t.matching(j).unwrap_or(j);
                // Index signature: `[key: string]: T`
                if t.is(j + 1, TokenKind::Identifier) && t.is(j + 2, TokenKind::Colon) {
                    drop_member = true;
                } else {
                    self.process(j + 1, group_close)?;
                }
                j = group_close + 1;
            }
            _ => return self.step(j, close),
        }
        let constructor = t.is_word(name, "constructor");

        if matches!(t.kind(j), TokenKind::Question | TokenKind::Bang) {
            self.remove_tokens(j, j + 1);
            j += 1;
        }
        if t.is(j, TokenKind::LessThan) {
            if let Some(stop) = self.angle_end(j) {
                self.remove_tokens(j, stop);
                j = stop;
            }
        }

        // Method
        if t.is(j, TokenKind::LeftParen) {
            let params_close = t.matching(j).unwrap_or(j);
            let properties = self.params(j, constructor)?;
            let k = self.return_type(params_close + 1);

            if t.is(k, TokenKind::LeftBrace) {
                let body_close = t.matching(k).unwrap_or(k);
                if drop_member {
                    self.remove_tokens(start, body_close + 1);
                } else {
                    if !properties.is_empty() {
                        self.inject_properties(k, body_close, &properties);
                    }
                    self.process(k + 1, body_close)?;
                }
                return Ok(body_close + 1);
            }

            // Overload or abstract signature
            let stop = self.member_end(k, close);
            self.remove_tokens(start, stop);
            return Ok(stop);
        }

        // Property
        if t.is(j, TokenKind::Colon) {
            let stop = self.skip_type(j + 1);
            self.remove_tokens(j, stop);
            j = stop;
        }
        if t.is(j, TokenKind::Equal) {
            let stop = self.expression_end(j + 1, close, false);
            if drop_member {
                self.remove_tokens(start, stop);
            } else {
                self.process(j + 1, stop)?;
            }
            return Ok(if t.is(stop, TokenKind::Semicolon) { stop + 1 } else { stop });
        }

        let stop = self.member_end(j, close);
        if drop_member {
            self.remove_tokens(start, stop);
        }
        Ok(stop)
    }

    /// A modifier keyword is a modifier only when a member name follows it.
    fn modifier_applies(&self, j: usize) -> bool {
        let t = self.t;
        !t.newline_before(j + 1)
            && matches!(
                t.kind(j + 1),
                TokenKind::Identifier
                    | TokenKind::String
                    | TokenKind::Number
                    | TokenKind::PrivateName
                    | TokenKind::LeftBracket
                    | TokenKind::Star
            )
    }

    /// Insert `this.x = x;` for constructor parameter properties, after a
    /// top-level `super(...)` call if there is one.
    fn inject_properties(&mut self, open: usize, close: usize, names: &[String]) {
        let t = self.t;
        let assignments: String = names
            .iter()
            .map(|name| format!(" this.{name} = {name};"))
            .collect();

        let mut k = open + 1;
        while k < close {
            if t.is_word(k, "super") && t.is(k + 1, TokenKind::LeftParen) {
                let call_close = t.matching(k + 1).unwrap_or(k + 1);
                if t.is(call_close + 1, TokenKind::Semicolon) {
                    self.patch.insert(t.end(call_close + 1), assignments);
                } else {
                    self.patch.insert(t.end(call_close), format!(";{assignments}"));
                }
                return;
            }
            k = t.skip_group(k);
        }

        self.patch.insert(t.end(open), assignments);
    }

    fn member_end(&self, j: usize, close: usize) -> usize {
        let t = self.t;
        let mut k = j;
        while k < close {
            if t.is(k, TokenKind::Semicolon) {
                return k + 1;
            }
            if t.newline_before(k) {
                return k;
            }
            k = t.skip_group(k);
        }
        close
    }

    // ---------------------------------------------------------------------
    // Type syntax
    // ---------------------------------------------------------------------

    /// `<` in expression position: type arguments of a call, or a generic
    /// arrow / old-style assertion at the start of an expression.
    fn angle(&mut self, i: usize) -> usize {
        let t = self.t;
        let Some(stop) = self.angle_end(i) else {
            return i + 1;
        };

        if i > 0 && self.ends_value(i - 1) {
            let call = t.is_name(i - 1)
                && matches!(t.kind(stop), TokenKind::LeftParen | TokenKind::Template);
            if !call {
                return i + 1;
            }
        }

        self.remove_tokens(i, stop);
        stop
    }

    /// Index after the `>` matching the `<` at `i`, if everything between
    /// looks like type syntax.
    fn angle_end(&self, i: usize) -> Option<usize> {
        let t = self.t;
        let mut depth = 0usize;
        let mut k = i;
        loop {
            match t.kind(k) {
                TokenKind::LessThan => depth += 1,
                TokenKind::GreaterThan => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(k + 1);
                    }
                }
                TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                    k = t.skip_group(k);
                    continue;
                }
                TokenKind::Identifier
                | TokenKind::String
                | TokenKind::Number
                | TokenKind::Template
                | TokenKind::Dot
                | TokenKind::Comma
                | TokenKind::Question
                | TokenKind::Colon
                | TokenKind::Arrow
                | TokenKind::Ellipsis
                | TokenKind::Equal => {}
                TokenKind::Operator if matches!(t.text(k), "|" | "&" | "-") => {}
                _ => return None,
            }
            k += 1;
        }
    }

    /// Index after the type starting at `i` (or `i` if there is none).
    fn skip_type(&self, i: usize) -> usize {
        let t = self.t;
        let mut j = i;
        if self.is_union_op(j) {
            j += 1;
        }

        loop {
            let next = self.skip_type_operand(j);
            if next == j {
                return if j == i { i } else { j - 1 };
            }
            j = next;
            if self.is_union_op(j) {
                j += 1;
                continue;
            }
            break;
        }

        // Conditional type: `A extends B ? C : D`
        if t.is_word(j, "extends") && !t.newline_before(j) {
            let check = self.skip_type(j + 1);
            if t.is(check, TokenKind::Question) {
                let truthy = self.skip_type(check + 1);
                if t.is(truthy, TokenKind::Colon) {
                    return self.skip_type(truthy + 1);
                }
            }
        }
        j
    }

    fn skip_type_operand(&self, j: usize) -> usize {
        let t = self.t;
        let mut k = j;

        while t.is(k, TokenKind::Identifier) {
            let prefix = match t.text(k) {
                "keyof" | "unique" | "readonly" | "typeof" | "new" => {
                    !matches!(t.kind(k + 1), TokenKind::Comma | TokenKind::RightParen | TokenKind::Semicolon)
                        && !t.is(k + 1, TokenKind::Eof)
                        && !self.ends_type_context(k + 1)
                }
                "asserts" => t.is(k + 1, TokenKind::Identifier) && !t.newline_before(k + 1),
                "abstract" => t.is_word(k + 1, "new"),
                "infer" => t.is(k + 1, TokenKind::Identifier),
                _ => false,
            };
            if !prefix {
                break;
            }
            k += 1;
        }

        match t.kind(k) {
            TokenKind::Identifier => {
                let head = t.text(k);
                k += 1;
                if head == "import" && t.is(k, TokenKind::LeftParen) {
                    k = t.skip_group(k);
                }
                while t.is(k, TokenKind::Dot) && t.is(k + 1, TokenKind::Identifier) {
                    k += 2;
                }
                if t.is(k, TokenKind::LessThan) && !t.newline_before(k) {
                    if let Some(stop) = self.angle_end(k) {
                        k = stop;
                    }
                }
                // Type predicate: `x is T`
                if t.is_word(k, "is") && !t.newline_before(k) {
                    return self.skip_type(k + 1);
                }
            }
            TokenKind::String | TokenKind::Number | TokenKind::Template => k += 1,
            TokenKind::Operator if t.text(k) == "-" && t.is(k + 1, TokenKind::Number) => k += 2,
            TokenKind::LeftParen => {
                k = t.skip_group(k);
                if t.is(k, TokenKind::Arrow) {
                    return self.skip_type(k + 1);
                }
            }
            TokenKind::LessThan => {
                let Some(stop) = self.angle_end(k) else {
                    return j;
                };
                k = stop;
                if t.is(k, TokenKind::LeftParen) {
                    k = t.skip_group(k);
                    if t.is(k, TokenKind::Arrow) {
                        return self.skip_type(k + 1);
                    }
                }
            }
            TokenKind::LeftBracket | TokenKind::LeftBrace => k = t.skip_group(k),
            _ => return j,
        }

        // Array types and indexed access
        while t.is(k, TokenKind::LeftBracket) && !t.newline_before(k) {
            k = t.skip_group(k);
        }
        k
    }

    fn ends_type_context(&self, k: usize) -> bool {
        matches!(
            self.t.kind(k),
            TokenKind::Equal | TokenKind::RightBrace | TokenKind::RightBracket | TokenKind::GreaterThan
        )
    }

    fn is_union_op(&self, j: usize) -> bool {
        self.t.is_op(j, "|") || self.t.is_op(j, "&")
    }

    // ---------------------------------------------------------------------
    // Boundaries
    // ---------------------------------------------------------------------

    fn at_statement_start(&self, i: usize) -> bool {
        let t = self.t;
        if i == 0 {
            return true;
        }
        match t.kind(i - 1) {
            TokenKind::Semicolon
            | TokenKind::LeftBrace
            | TokenKind::RightBrace
            | TokenKind::Hashbang => true,
            _ => t.newline_before(i) && !self.continues_expression(i - 1),
        }
    }

    /// Whether the token at `k` expects more expression after it.
    fn continues_expression(&self, k: usize) -> bool {
        let t = self.t;
        match t.kind(k) {
            TokenKind::Identifier => EXPRESSION_KEYWORDS.contains(&t.text(k)),
            TokenKind::Operator
            | TokenKind::Equal
            | TokenKind::Comma
            | TokenKind::Dot
            | TokenKind::QuestionDot
            | TokenKind::LeftParen
            | TokenKind::LeftBracket
            | TokenKind::Colon
            | TokenKind::Question
            | TokenKind::Arrow
            | TokenKind::LessThan
            | TokenKind::GreaterThan
            | TokenKind::Star
            | TokenKind::Bang
            | TokenKind::Ellipsis
            | TokenKind::At => true,
            _ => false,
        }
    }

    /// An operand end that a postfix `!` or `as` may follow.
    fn ends_value(&self, k: usize) -> bool {
        let t = self.t;
        if !t.ends_operand(k) {
            return false;
        }
        if t.is(k, TokenKind::RightParen) {
            if let Some(open) = t.matching(k) {
                if open > 0 && CONTROL_KEYWORDS.contains(&t.text(open - 1)) {
                    return false;
                }
            }
        }
        true
    }

    /// End of an expression at the current nesting level.
    fn expression_end(&self, j: usize, end: usize, stop_at_comma: bool) -> usize {
        let t = self.t;
        let mut k = j;
        while k < end {
            let kind = t.kind(k);
            if kind == TokenKind::Semicolon
                || kind.is_close()
                || kind == TokenKind::Eof
                || (stop_at_comma && kind == TokenKind::Comma)
                || (k > j && self.t.is_line_boundary(k))
            {
                return k;
            }
            k = t.skip_group(k);
        }
        end.min(k)
    }

    fn until_comma(&self, j: usize, close: usize) -> usize {
        let t = self.t;
        let mut k = j;
        while k < close && !t.is(k, TokenKind::Comma) {
            k = t.skip_group(k);
        }
        k.min(close)
    }

    fn remove_tokens(&mut self, from: usize, to: usize) {
        if to > from {
            let t = self.t;
            self.patch.remove(t.start(from)..t.end(to - 1));
        }
    }

    /// Remove the tokens before `to` that follow `prev`, along with the
    /// whitespace in front of them.
    fn remove_after(&mut self, prev: usize, to: usize) {
        if to > prev + 1 {
            let t = self.t;
            self.patch.remove(t.end(prev)..t.end(to - 1));
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
