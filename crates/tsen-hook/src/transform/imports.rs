// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ES module syntax to CommonJS.
//!
//! | Input                               | Output                                             |
//! |-------------------------------------|----------------------------------------------------|
//! | `import 'm'`                        | `require('m');`                                    |
//! | `import a, { b, c as d } from 'm'`  | `const __tsenImport0 = __tsenInterop(require('m'));` |
//! | `import { b } from 'm'`             | `const __tsenImport0 = require('m');`              |
//! | `import * as ns from 'm'`           | `const ns = __tsenInterop(require('m'));`          |
//! | `export const a = 1`                | `const a = exports.a = 1`                          |
//! | `export function f() {}`            | `function f() {}` (`exports.f = f;` hoisted)       |
//! | `export class C {}`                 | `class C {} exports.C = C;`                        |
//! | `export default expr`               | `exports.default = expr`                           |
//! | `export { a, b as c }`              | `exports.a = a; exports.c = b;`                    |
//! | `export { a } from 'm'`             | block copying `a` from `require('m')`              |
//! | `export * from 'm'`                 | `__tsenExportStar(require('m'));`                  |
//! | `import('m')`                       | `Promise.resolve().then(() => require('m'))`       |
//!
//! Imported bindings stay live: every reference to `b` above is rewritten to
//! `__tsenImport0.b`, and a call `b()` to `(0, __tsenImport0.b)()`, so
//! circular imports see the other module's exports once they exist. A name
//! that is also declared somewhere in the file, or used inside a template
//! literal, is instead copied once into a `const` after the `require`.
//!
//! Exports are assigned once, when the declaration runs; later reassignments
//! of an exported `let` are not reflected.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use super::patch::Patcher;
use crate::error::{HookError, Result};
use crate::lexer::{TokenKind, TokenStream, EXPRESSION_KEYWORDS};

const USE_STRICT: &str = "\"use strict\";";
const ES_MODULE_MARKER: &str = "Object.defineProperty(exports, \"__esModule\", { value: true });";
const INTEROP_HELPER: &str = "function __tsenInterop(m) { return m && m.__esModule ? m : Object.assign({ default: m }, m); }";
const EXPORT_STAR_HELPER: &str = "function __tsenExportStar(m) { Object.keys(m).forEach(function (k) { if (k !== \"default\" && k !== \"__esModule\" && !Object.prototype.hasOwnProperty.call(exports, k)) exports[k] = m[k]; }); }";
const REEXPORT_BINDING: &str = "__tsenReexport";
const IMPORT_BINDING: &str = "__tsenImport";

/// Convert module syntax in `source` to CommonJS.
pub fn to_commonjs(source: &str, preserve_dynamic_import: bool) -> Result<String> {
    let tokens = TokenStream::new(source)?;
    let mut converter = ModuleConverter {
        t: &tokens,
        patch: Patcher::new(source),
        preserve_dynamic_import,
        has_exports: false,
        uses_interop: false,
        uses_export_star: false,
        hoisted: Vec::new(),
        bindings: HashMap::new(),
        replaced: Vec::new(),
        modules: 0,
    };
    converter.run()?;
    Ok(converter.finish())
}

struct ModuleConverter<'s, 'a> {
    t: &'s TokenStream<'a>,
    patch: Patcher<'a>,
    preserve_dynamic_import: bool,
    has_exports: bool,
    uses_interop: bool,
    uses_export_star: bool,
    hoisted: Vec<String>,
    /// Live imported names and the member expression that reads them
    bindings: HashMap<&'a str, String>,
    /// Token ranges replaced as a whole
    replaced: Vec<Range<usize>>,
    modules: usize,
}

/// A parsed `import` declaration.
struct ImportDecl<'a> {
    start: usize,
    stop: usize,
    module: usize,
    default: Option<&'a str>,
    namespace: Option<&'a str>,
    named: Vec<Specifier<'a>>,
}

/// One `name` or `name as alias` entry of a specifier list.
struct Specifier<'a> {
    imported: &'a str,
    local: &'a str,
}

impl<'s, 'a> ModuleConverter<'s, 'a> {
    fn run(&mut self) -> Result<()> {
        let imports = self.import_declarations()?;
        let shadowed = self.shadowed_names(&imports);
        for decl in &imports {
            self.emit_import(decl, &shadowed);
        }

        let t = self.t;
        let end = t.len();
        let mut depth = 0usize;
        let mut i = 0;
        let mut next_import = imports.iter().peekable();

        while i < end {
            if let Some(decl) = next_import.next_if(|d| d.start == i) {
                i = decl.stop;
                continue;
            }
            let kind = t.kind(i);
            if kind.is_open() {
                depth += 1;
            } else if kind.is_close() {
                depth = depth.saturating_sub(1);
            } else if kind == TokenKind::Identifier && !after_dot(t, i) {
                match t.text(i) {
                    "import" if t.is(i + 1, TokenKind::LeftParen) => {
                        if !self.preserve_dynamic_import {
                            self.dynamic_import(i);
                        }
                    }
                    "export" if depth == 0 => {
                        self.has_exports = true;
                        i = self.export_declaration(i, end)?;
                        continue;
                    }
                    _ => {}
                }
            }
            i += 1;
        }

        self.rewrite_references();
        Ok(())
    }

    /// Top-level `import` declarations, in source order.
    fn import_declarations(&self) -> Result<Vec<ImportDecl<'a>>> {
        let t = self.t;
        let end = t.len();
        let mut depth = 0usize;
        let mut imports = Vec::new();
        let mut i = 0;

        while i < end {
            let kind = t.kind(i);
            if kind.is_open() {
                depth += 1;
            } else if kind.is_close() {
                depth = depth.saturating_sub(1);
            } else if depth == 0
                && t.is_word(i, "import")
                && !after_dot(t, i)
                && !matches!(t.kind(i + 1), TokenKind::LeftParen | TokenKind::Dot)
            {
                let decl = self.import_declaration(i, end)?;
                i = decl.stop;
                imports.push(decl);
                continue;
            }
            i += 1;
        }
        Ok(imports)
    }

    fn finish(self) -> String {
        let t = self.t;
        let source = t.source();

        let mut prelude = vec![USE_STRICT.to_string()];
        if self.has_exports {
            prelude.push(ES_MODULE_MARKER.to_string());
        }
        if self.uses_interop {
            prelude.push(INTEROP_HELPER.to_string());
        }
        if self.uses_export_star {
            prelude.push(EXPORT_STAR_HELPER.to_string());
        }
        prelude.extend(self.hoisted);
        let mut prelude = prelude.join(" ");

        // The prelude goes on the first line, or on the line after a hashbang.
        let mut patch = self.patch;
        if t.is(0, TokenKind::Hashbang) {
            match source[t.end(0)..].find('\n') {
                Some(nl) => patch.insert(t.end(0) + nl + 1, format!("{prelude} ")),
                None => patch.insert(source.len(), format!("\n{prelude}")),
            }
        } else {
            prelude.push(' ');
            patch.insert(0, prelude);
        }
        patch.finish()
    }

    /// `import(x)` becomes `Promise.resolve().then(() => require(x))`.
    fn dynamic_import(&mut self, i: usize) {
        let t = self.t;
        let Some(close) = t.matching(i + 1) else {
            return;
        };
        self.patch.replace(
            t.start(i)..t.end(i),
            "Promise.resolve().then(() => require",
        );
        self.patch.insert(t.end(close), ")");
    }

    fn import_declaration(&self, i: usize, end: usize) -> Result<ImportDecl<'a>> {
        let t = self.t;
        let mut k = i + 1;
        let mut default = None;
        let mut namespace = None;
        let mut named = Vec::new();

        let module = if t.is(k, TokenKind::String) {
            k
        } else {
            if t.is(k, TokenKind::Identifier)
                && !(t.text(k) == "from" && t.is(k + 1, TokenKind::String))
            {
                default = Some(t.text(k));
                k += 1;
                if t.is(k, TokenKind::Comma) {
                    k += 1;
                }
            }
            if t.is(k, TokenKind::Star) {
                if !t.is_word(k + 1, "as") || !t.is(k + 2, TokenKind::Identifier) {
                    return Err(self.unexpected(k + 1));
                }
                namespace = Some(t.text(k + 2));
                k += 3;
            }
            if t.is(k, TokenKind::LeftBrace) {
                let close = t.matching(k).unwrap_or(k);
                named = self.specifiers(k, close)?;
                k = close + 1;
            }
            if !t.is_word(k, "from") {
                return Err(self.unexpected(k));
            }
            if !t.is(k + 1, TokenKind::String) {
                return Err(self.unexpected(k + 1));
            }
            k + 1
        };

        Ok(ImportDecl {
            start: i,
            stop: t.statement_end(module + 1, end),
            module,
            default,
            namespace,
            named,
        })
    }

    /// Bind the required module once and record how each imported name is
    /// read from it.
    fn emit_import(&mut self, decl: &ImportDecl<'a>, shadowed: &HashSet<&'a str>) {
        let t = self.t;
        let required = format!("require({})", t.text(decl.module));

        let mut reads = Vec::new();
        let mut code = if let Some(ns) = decl.namespace {
            self.uses_interop = true;
            if let Some(default) = decl.default {
                reads.push((default, format!("{ns}.default")));
            }
            format!("const {ns} = __tsenInterop({required});")
        } else if decl.default.is_none() && decl.named.is_empty() {
            format!("{required};")
        } else {
            let module = format!("{IMPORT_BINDING}{}", self.modules);
            self.modules += 1;
            if let Some(default) = decl.default {
                reads.push((default, format!("{module}.default")));
            }
            for s in &decl.named {
                reads.push((s.local, format!("{module}{}", member(s.imported))));
            }

            let needs_interop =
                decl.default.is_some() || decl.named.iter().any(|s| s.imported == "default");
            let init = if needs_interop {
                self.uses_interop = true;
                format!("__tsenInterop({required})")
            } else {
                required
            };
            format!("const {module} = {init};")
        };

        for (local, read) in reads {
            if shadowed.contains(local) {
                code.push_str(&format!(" const {local} = {read};"));
            } else {
                self.bindings.insert(local, read);
            }
        }
        self.replace_tokens(decl.start, decl.stop, code);
    }

    fn export_declaration(&mut self, i: usize, end: usize) -> Result<usize> {
        let t = self.t;
        let j = i + 1;

        match t.kind(j) {
            TokenKind::LeftBrace => {
                let close = t.matching(j).unwrap_or(j);
                let specifiers = self.specifiers(j, close)?;
                let from = close + 1;

                if t.is_word(from, "from") && t.is(from + 1, TokenKind::String) {
                    let stop = t.statement_end(from + 2, end);
                    self.uses_interop = true;
                    let mut code = format!(
                        "{{ const {REEXPORT_BINDING} = __tsenInterop(require({})); ",
                        t.text(from + 1)
                    );
                    for s in &specifiers {
                        code.push_str(&format!(
                            "exports{} = {REEXPORT_BINDING}{}; ",
                            member(s.local),
                            member(s.imported)
                        ));
                    }
                    code.push('}');
                    self.replace_tokens(i, stop, code);
                    return Ok(stop);
                }

                let stop = t.statement_end(from, end);
                let code = specifiers
                    .iter()
                    .map(|s| format!("exports{} = {};", member(s.local), self.read(s.imported)))
                    .collect::<Vec<_>>()
                    .join(" ");
                self.replace_tokens(i, stop, code);
                Ok(stop)
            }
            TokenKind::Star => {
                let mut k = j + 1;
                let mut alias = None;
                if t.is_word(k, "as") {
                    alias = Some(t.text(k + 1));
                    k += 2;
                }
                if !t.is_word(k, "from") || !t.is(k + 1, TokenKind::String) {
                    return Err(self.unexpected(k));
                }
                let required = format!("require({})", t.text(k + 1));
                let stop = t.statement_end(k + 2, end);
                let code = match alias {
                    Some(alias) => {
                        self.uses_interop = true;
                        format!("exports{} = __tsenInterop({required});", member(alias))
                    }
                    None => {
                        self.uses_export_star = true;
                        format!("__tsenExportStar({required});")
                    }
                };
                self.replace_tokens(i, stop, code);
                Ok(stop)
            }
            TokenKind::Identifier => match t.text(j) {
                "default" => self.export_default(i),
                "function" | "async" => {
                    let name = self.function_name(j).ok_or_else(|| self.unexpected(j + 1))?;
                    self.hoisted.push(format!("exports.{name} = {name};"));
                    self.remove_keyword(i);
                    Ok(j)
                }
                "class" => {
                    if !t.is_name(j + 1) {
                        return Err(self.unexpected(j + 1));
                    }
                    let name = t.text(j + 1);
                    let close = self.class_body_end(j);
                    self.patch
                        .insert(t.end(close), format!(" exports.{name} = {name};"));
                    self.remove_keyword(i);
                    Ok(j)
                }
                "const" | "let" | "var" => {
                    self.export_variables(j + 1, end)?;
                    self.remove_keyword(i);
                    Ok(j)
                }
                _ => Err(self.unexpected(j)),
            },
            _ => Err(self.unexpected(j)),
        }
    }

    fn export_default(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        let j = i + 2;

        let named = match t.text(j) {
            "function" | "async" if t.is(j, TokenKind::Identifier) => {
                self.function_name(j).map(|name| (name, false))
            }
            "class" if t.is(j, TokenKind::Identifier) && t.is_name(j + 1) => {
                Some((t.text(j + 1), true))
            }
            _ => None,
        };

        match named {
            Some((name, false)) => {
                self.hoisted.push(format!("exports.default = {name};"));
                self.patch.remove(t.start(i)..t.start(j));
            }
            Some((name, true)) => {
                let close = self.class_body_end(j);
                self.patch
                    .insert(t.end(close), format!(" exports.default = {name};"));
                self.patch.remove(t.start(i)..t.start(j));
            }
            None => {
                self.patch
                    .replace(t.start(i)..t.end(i + 1), "exports.default =");
            }
        }
        Ok(j)
    }

    /// Insert `exports.x =` into each declarator of `export const ...`.
    fn export_variables(&mut self, first: usize, end: usize) -> Result<()> {
        let t = self.t;
        let mut k = first;
        loop {
            if !t.is_name(k) {
                return Err(HookError::unsupported(
                    t.source(),
                    t.start(k),
                    "destructuring in export declarations is not supported",
                ));
            }
            let name = t.text(k);
            k += 1;

            if t.is(k, TokenKind::Equal) {
                self.patch.insert(t.end(k), format!(" exports.{name} ="));
                k = self.initializer_end(k + 1, end);
            } else {
                self.patch
                    .insert(t.end(k - 1), format!(" = exports.{name} = void 0"));
            }

            if !t.is(k, TokenKind::Comma) {
                return Ok(());
            }
            k += 1;
        }
    }

    fn initializer_end(&self, j: usize, end: usize) -> usize {
        let t = self.t;
        let mut k = j;
        while k < end {
            let kind = t.kind(k);
            if matches!(kind, TokenKind::Semicolon | TokenKind::Comma)
                || kind.is_close()
                || (k > j && t.is_line_boundary(k))
            {
                return k;
            }
            k = t.skip_group(k);
        }
        end
    }

    /// Name of `function f`, `function* f` or `async function f`.
    fn function_name(&self, j: usize) -> Option<&'a str> {
        let t = self.t;
        let mut k = j;
        if t.is_word(k, "async") {
            k += 1;
        }
        if !t.is_word(k, "function") {
            return None;
        }
        k += 1;
        if t.is(k, TokenKind::Star) {
            k += 1;
        }
        t.is_name(k).then(|| t.text(k))
    }

    /// Index of the `{` opening the body of the class at `class`.
    fn class_body_start(&self, class: usize) -> usize {
        let t = self.t;
        let mut k = class + 1;
        while k < t.len() && !t.is(k, TokenKind::LeftBrace) {
            k = t.skip_group(k);
        }
        k
    }

    /// Index of the `}` closing the body of the class at `class`.
    fn class_body_end(&self, class: usize) -> usize {
        let open = self.class_body_start(class);
        self.t.matching(open).unwrap_or(open)
    }

    fn specifiers(&self, open: usize, close: usize) -> Result<Vec<Specifier<'a>>> {
        let t = self.t;
        let mut specifiers = Vec::new();
        let mut k = open + 1;

        while k < close {
            if !matches!(t.kind(k), TokenKind::Identifier | TokenKind::String) {
                return Err(self.unexpected(k));
            }
            let imported = t.text(k);
            let mut local = imported;
            k += 1;
            if t.is_word(k, "as") {
                if !matches!(t.kind(k + 1), TokenKind::Identifier | TokenKind::String) {
                    return Err(self.unexpected(k + 1));
                }
                local = t.text(k + 1);
                k += 2;
            }
            specifiers.push(Specifier { imported, local });

            if t.is(k, TokenKind::Comma) {
                k += 1;
            } else if k < close {
                return Err(self.unexpected(k));
            }
        }

        Ok(specifiers)
    }

    /// Remove `export` and the whitespace after it.
    fn remove_keyword(&mut self, i: usize) {
        let t = self.t;
        self.patch.remove(t.start(i)..t.start(i + 1));
    }

    fn replace_tokens(&mut self, from: usize, to: usize, code: String) {
        let t = self.t;
        let end = if to > from { t.end(to - 1) } else { t.end(from) };
        self.patch.replace(t.start(from)..end, code);
        self.replaced.push(from..to.max(from + 1));
    }

    /// Expression reading the local name `name`.
    fn read(&self, name: &str) -> String {
        self.bindings
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Imported names that must be copied instead of read live: names also
    /// declared in the file, where rewriting the declaration would break it,
    /// and names used inside template literals, which are single tokens.
    fn shadowed_names(&self, imports: &[ImportDecl<'a>]) -> HashSet<&'a str> {
        let t = self.t;
        let end = t.len();
        let imported: HashSet<&'a str> = imports
            .iter()
            .flat_map(|d| d.default.into_iter().chain(d.named.iter().map(|s| s.local)))
            .collect();
        let mut shadowed = HashSet::new();
        if imported.is_empty() {
            return shadowed;
        }
        let mark_group = |shadowed: &mut HashSet<&'a str>, open: usize| {
            let close = t.matching(open).unwrap_or(open);
            for m in open..close {
                if t.is(m, TokenKind::Identifier) && imported.contains(t.text(m)) {
                    shadowed.insert(t.text(m));
                }
            }
        };

        for k in 0..end {
            match t.kind(k) {
                TokenKind::Template => {
                    let text = t.text(k);
                    shadowed.extend(imported.iter().copied().filter(|name| contains_word(text, name)));
                }
                TokenKind::LeftParen if is_parameter_list(t, k) => mark_group(&mut shadowed, k),
                TokenKind::Identifier if !after_dot(t, k) => {
                    let text = t.text(k);
                    if matches!(text, "let" | "const" | "var") {
                        // Every declarator of the statement.
                        let mut j = k + 1;
                        loop {
                            if t.kind(j).is_open() {
                                mark_group(&mut shadowed, j);
                                j = t.skip_group(j);
                            } else if t.is(j, TokenKind::Identifier) {
                                if imported.contains(t.text(j)) {
                                    shadowed.insert(t.text(j));
                                }
                                j += 1;
                            } else {
                                break;
                            }
                            if t.is(j, TokenKind::Equal) {
                                j = self.initializer_end(j + 1, end);
                            }
                            if !t.is(j, TokenKind::Comma) {
                                break;
                            }
                            j += 1;
                        }
                    } else if imported.contains(text) {
                        let declared = k > 0
                            && (t.is_word(k - 1, "function")
                                || t.is_word(k - 1, "class")
                                || (t.is(k - 1, TokenKind::Star) && k > 1 && t.is_word(k - 2, "function")));
                        if declared || t.is(k + 1, TokenKind::Arrow) {
                            shadowed.insert(text);
                        }
                    }
                }
                _ => {}
            }
        }
        shadowed
    }

    /// Rewrite references to live imported names into member reads.
    fn rewrite_references(&mut self) {
        if self.bindings.is_empty() {
            return;
        }
        let t = self.t;
        let enclosing = enclosing_groups(t);
        let class_bodies: HashSet<usize> = (0..t.len())
            .filter(|&k| {
                t.is_word(k, "class")
                    && !after_dot(t, k)
                    && (t.is_name(k + 1) || t.is(k + 1, TokenKind::LeftBrace) || t.is_word(k + 1, "extends"))
            })
            .map(|k| self.class_body_start(k))
            .collect();
        self.replaced.sort_by_key(|r| r.start);

        for k in 0..t.len() {
            if !t.is(k, TokenKind::Identifier) || after_dot(t, k) || self.is_replaced(k) {
                continue;
            }
            let name = t.text(k);
            let Some(read) = self.bindings.get(name).cloned() else {
                continue;
            };
            let prev = if k > 0 { t.kind(k - 1) } else { TokenKind::Eof };
            let starts_entry = matches!(prev, TokenKind::LeftBrace | TokenKind::Comma);

            match enclosing[k] {
                Some(open) if class_bodies.contains(&open) => {
                    if !expects_operand(t, k) {
                        continue;
                    }
                }
                Some(open) if t.is(open, TokenKind::LeftBrace) => {
                    if (starts_entry && t.is(k + 1, TokenKind::Colon)) || is_method_name(t, k) {
                        continue;
                    }
                    if starts_entry && matches!(t.kind(k + 1), TokenKind::Comma | TokenKind::RightBrace) {
                        self.patch.replace(t.start(k)..t.end(k), format!("{name}: {read}"));
                        continue;
                    }
                }
                _ => {}
            }

            let call = matches!(t.kind(k + 1), TokenKind::LeftParen | TokenKind::Template)
                && !(k > 0 && t.is_word(k - 1, "new"));
            let code = if call { format!("(0, {read})") } else { read };
            self.patch.replace(t.start(k)..t.end(k), code);
        }
    }

    fn is_replaced(&self, k: usize) -> bool {
        let idx = self.replaced.partition_point(|r| r.start <= k);
        idx > 0 && self.replaced[idx - 1].contains(&k)
    }

    fn unexpected(&self, k: usize) -> HookError {
        let t = self.t;
        let message = match t.kind(k) {
            TokenKind::Eof => "Unexpected end of input".to_string(),
            _ => format!("Unexpected token '{}'", t.text(k)),
        };
        HookError::syntax(t.source(), t.start(k), message)
    }
}

fn after_dot(t: &TokenStream<'_>, i: usize) -> bool {
    i > 0 && matches!(t.kind(i - 1), TokenKind::Dot | TokenKind::QuestionDot)
}

/// Innermost open bracket around each token.
fn enclosing_groups(t: &TokenStream<'_>) -> Vec<Option<usize>> {
    let mut stack = Vec::new();
    let mut enclosing = Vec::with_capacity(t.len());
    for k in 0..t.len() {
        let kind = t.kind(k);
        if kind.is_close() {
            stack.pop();
        }
        enclosing.push(stack.last().copied());
        if kind.is_open() {
            stack.push(k);
        }
    }
    enclosing
}

/// Whether the parenthesized group at `open` declares parameters: an arrow
/// function, a function or method, or a `catch` clause.
fn is_parameter_list(t: &TokenStream<'_>, open: usize) -> bool {
    let Some(close) = t.matching(open) else {
        return false;
    };
    if t.is(close + 1, TokenKind::Arrow) {
        return true;
    }
    t.is(close + 1, TokenKind::LeftBrace)
        && !(open > 0
            && t.is(open - 1, TokenKind::Identifier)
            && matches!(t.text(open - 1), "if" | "while" | "for" | "switch" | "with"))
}

/// Whether the token before `k` leaves an operand expected, so `k` is part of
/// an expression rather than a class member name.
fn expects_operand(t: &TokenStream<'_>, k: usize) -> bool {
    if k == 0 {
        return false;
    }
    match t.kind(k - 1) {
        TokenKind::Equal
        | TokenKind::Operator
        | TokenKind::Question
        | TokenKind::Colon
        | TokenKind::Comma
        | TokenKind::Arrow
        | TokenKind::LessThan
        | TokenKind::GreaterThan
        | TokenKind::Bang
        | TokenKind::Ellipsis
        | TokenKind::At => true,
        TokenKind::Identifier => EXPRESSION_KEYWORDS.contains(&t.text(k - 1)),
        _ => false,
    }
}

/// `name() {` or `get name() {` inside an object literal.
fn is_method_name(t: &TokenStream<'_>, k: usize) -> bool {
    if k == 0 || !t.is(k + 1, TokenKind::LeftParen) {
        return false;
    }
    let prefix = matches!(
        t.kind(k - 1),
        TokenKind::LeftBrace | TokenKind::Comma | TokenKind::Star
    ) || (t.is(k - 1, TokenKind::Identifier)
        && matches!(t.text(k - 1), "get" | "set" | "async"));
    prefix
        && t
            .matching(k + 1)
            .is_some_and(|close| t.is(close + 1, TokenKind::LeftBrace))
}

/// Whether `word` occurs in `text` as a whole identifier.
fn contains_word(text: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    text.match_indices(word).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + word.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Property access for an export name, which may be a string literal.
fn member(name: &str) -> String {
    if name.starts_with('"') || name.starts_with('\'') {
        format!("[{name}]")
    } else {
        format!(".{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRELUDE: &str = "\"use strict\"; ";

    fn cjs(src: &str) -> String {
        to_commonjs(src, false).unwrap()
    }

    fn body(out: &str) -> &str {
        out.split_once('\n').map_or(out, |(_, rest)| rest)
    }

    #[test]
    fn test_plain_script_only_gets_use_strict() {
        assert_eq!(cjs("console.log(1);"), format!("{PRELUDE}console.log(1);"));
    }

    #[test]
    fn test_side_effect_import() {
        assert_eq!(cjs("\nimport './setup.js';"), format!("{PRELUDE}\nrequire('./setup.js');"));
    }

    #[test]
    fn test_named_imports() {
        let out = cjs("\nimport { a, b as c } from \"m\";\nuse(a, c);");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = require(\"m\");\nuse(__tsenImport0.a, __tsenImport0.b);"
        );
        assert!(!out.contains("__tsenInterop"));
    }

    #[test]
    fn test_default_import_uses_interop() {
        let out = cjs("\nimport fs, { readFile } from 'fs'\nfs.x; readFile(p);");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = __tsenInterop(require('fs'));\n__tsenImport0.default.x; (0, __tsenImport0.readFile)(p);"
        );
        assert!(out.starts_with("\"use strict\"; function __tsenInterop(m)"));
    }

    #[test]
    fn test_each_module_gets_its_own_binding() {
        let out = cjs("\nimport { a } from './a';\nimport b from './b';\nb(a);");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = require('./a');\nconst __tsenImport1 = __tsenInterop(require('./b'));\n(0, __tsenImport1.default)(__tsenImport0.a);"
        );
    }

    #[test]
    fn test_namespace_import() {
        let out = cjs("\nimport def, * as ns from 'm';\nns.f(def);");
        assert_eq!(
            body(&out),
            "const ns = __tsenInterop(require('m'));\nns.f(ns.default);"
        );
    }

    #[test]
    fn test_multiline_import_keeps_lines() {
        let out = cjs("import {\n  a,\n  b,\n} from 'm' with { type: 'json' };\nrun(a);");
        assert_eq!(out.lines().count(), 5);
        assert!(out.ends_with("const __tsenImport0 = require('m');\n\n\n\nrun(__tsenImport0.a);"));
    }

    #[test]
    fn test_imports_are_read_when_used() {
        // b.js requires a.js before a.js has defined `A`; the class body
        // only reads it once `new B()` runs.
        let out = cjs("\nimport { A } from './a';\nexport class B { make() { return new A(); } }");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = require('./a');\nclass B { make() { return new __tsenImport0.A(); } } exports.B = B;"
        );
    }

    #[test]
    fn test_object_keys_and_members_keep_names() {
        let out = cjs("\nimport { a, b } from 'm';\nconst o = { a: b, b, a() {} };\no.a; x?.b;");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = require('m');\nconst o = { a: __tsenImport0.b, b: __tsenImport0.b, a() {} };\no.a; x?.b;"
        );
    }

    #[test]
    fn test_class_members_keep_names() {
        let out = cjs("\nimport { a, b } from 'm';\nclass C { a = b; b() { return a; } }");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = require('m');\nclass C { a = __tsenImport0.b; b() { return __tsenImport0.a; } }"
        );
    }

    #[test]
    fn test_redeclared_names_are_copied() {
        let out = cjs("\nimport { a, b, c } from 'm';\nfunction f(a) { let [b] = a; return b; }\nc();");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = require('m'); const a = __tsenImport0.a; const b = __tsenImport0.b;\nfunction f(a) { let [b] = a; return b; }\n(0, __tsenImport0.c)();"
        );
    }

    #[test]
    fn test_template_use_is_copied() {
        let out = cjs("\nimport { name } from 'm';\nlog(`hi ${name}`);");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = require('m'); const name = __tsenImport0.name;\nlog(`hi ${name}`);"
        );
    }

    #[test]
    fn test_reexported_import_reads_binding() {
        let out = cjs("\nimport { a as b } from 'm';\nexport { b };");
        assert_eq!(
            body(&out),
            "const __tsenImport0 = require('m');\nexports.b = __tsenImport0.a;"
        );
    }

    #[test]
    fn test_export_variables() {
        let out = cjs("\nexport const a = 1, b = f(2, 3);\nexport let c;");
        assert_eq!(
            body(&out),
            "const a = exports.a = 1, b = exports.b = f(2, 3);\nlet c = exports.c = void 0;"
        );
        assert!(out.contains("Object.defineProperty(exports, \"__esModule\", { value: true });"));
    }

    #[test]
    fn test_export_destructuring_rejected() {
        let err = to_commonjs("export const { a } = o;", false).unwrap_err();
        assert!(matches!(err, HookError::Unsupported { .. }));
    }

    #[test]
    fn test_export_function_is_hoisted() {
        let out = cjs("\nexport async function load() {}");
        assert!(out.starts_with("\"use strict\"; Object.defineProperty"));
        assert!(out.contains("exports.load = load;"));
        assert_eq!(body(&out), "async function load() {}");
    }

    #[test]
    fn test_export_class() {
        let out = cjs("\nexport class A extends B {\n  m() {}\n}");
        assert_eq!(body(&out), "class A extends B {\n  m() {}\n} exports.A = A;");
    }

    #[test]
    fn test_export_default() {
        assert_eq!(body(&cjs("\nexport default { a: 1 };")), "exports.default = { a: 1 };");
        assert_eq!(body(&cjs("\nexport default class Foo {}")), "class Foo {} exports.default = Foo;");
        let out = cjs("\nexport default function main() {}");
        assert_eq!(body(&out), "function main() {}");
        assert!(out.contains("exports.default = main;"));
        assert_eq!(
            body(&cjs("\nexport default function () {}")),
            "exports.default = function () {}"
        );
    }

    #[test]
    fn test_export_list() {
        assert_eq!(
            body(&cjs("\nexport { a, b as c, d as default };")),
            "exports.a = a; exports.c = b; exports.default = d;"
        );
    }

    #[test]
    fn test_reexports() {
        let out = cjs("\nexport { a, default as b } from './m';");
        assert_eq!(
            body(&out),
            "{ const __tsenReexport = __tsenInterop(require('./m')); exports.a = __tsenReexport.a; exports.b = __tsenReexport.default; }"
        );
        let out = cjs("\nexport * from './all';\nexport * as ns from './ns';");
        assert_eq!(
            body(&out),
            "__tsenExportStar(require('./all'));\nexports.ns = __tsenInterop(require('./ns'));"
        );
        assert!(out.contains("function __tsenExportStar(m)"));
    }

    #[test]
    fn test_dynamic_import() {
        assert_eq!(
            body(&cjs("\nconst m = await import('./m.js');")),
            "const m = await Promise.resolve().then(() => require('./m.js'));"
        );
        assert_eq!(
            body(&to_commonjs("\nconst m = import(name);", true).unwrap()),
            "const m = import(name);"
        );
    }

    #[test]
    fn test_member_named_import_untouched() {
        assert_eq!(body(&cjs("\nloader.import('./x');")), "loader.import('./x');");
        assert_eq!(body(&cjs("\nmod.export = 1;")), "mod.export = 1;");
    }

    #[test]
    fn test_import_meta_untouched() {
        assert_eq!(body(&cjs("\nconst u = import.meta.url;")), "const u = import.meta.url;");
    }

    #[test]
    fn test_nested_export_word_untouched() {
        let src = "\nconst o = { export: 1, import: 2 };";
        assert_eq!(body(&cjs(src)), "const o = { export: 1, import: 2 };");
    }

    #[test]
    fn test_hashbang_keeps_first_line() {
        let out = cjs("#!/usr/bin/env node\nimport 'x';");
        assert_eq!(out, "#!/usr/bin/env node\n\"use strict\"; require('x');");
    }

    #[test]
    fn test_malformed_import_is_syntax_error() {
        let err = to_commonjs("import { a } 'm';", false).unwrap_err();
        assert!(matches!(err, HookError::Syntax { .. }));
    }
}
