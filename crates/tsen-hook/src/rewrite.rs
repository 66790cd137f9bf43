// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dynamic import rewriting.
//!
//! The host loader cannot resolve `import()` of TypeScript files, so the one
//! statically analyzable shape, a bare quoted relative path ending in the
//! target suffix, is turned into a synchronous `require` wrapped in an already
//! resolved promise:
//!
//! ```text
//! import('./dynamic.ts')  →  Promise.resolve(require('./dynamic.ts'))
//! ```
//!
//! Everything else is left alone and falls through to the host's own
//! `import()` resolution, which rejects for these files:
//!
//! - template literals, with or without interpolation (`` import(`./x.ts`) ``)
//! - concatenation (`import('./dyn' + 'amic.ts')`)
//! - bare specifiers (`import('pkg')`) and any other expression
//! - `import (` with whitespace before the parenthesis
//!
//! Escaped quote characters inside the literal are not understood: the literal
//! ends at the first matching quote, so `import('./it\'s.ts')` does not match.

use std::borrow::Cow;
use std::ops::Range;

/// Suffix rewritten by [`rewrite`].
pub const DEFAULT_SUFFIX: &str = ".ts";

const IMPORT_CALL: &str = "import(";
const REPLACEMENT_PREFIX: &str = "Promise.resolve(require";

/// A located `import('<relative path>')` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMatch {
    /// Byte range of the whole call, `import` through the closing `)`
    pub span: Range<usize>,
    /// Byte range of the quoted literal, quotes included
    pub literal: Range<usize>,
    /// Quote character used by the literal
    pub quote: char,
}

impl ImportMatch {
    /// The path between the quotes.
    pub fn path<'a>(&self, source: &'a str) -> &'a str {
        &source[self.literal.start + 1..self.literal.end - 1]
    }
}

/// Rewrites `import()` calls of relative files with a given suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicImportRewriter {
    suffix: String,
}

impl DynamicImportRewriter {
    /// Create a rewriter for paths ending in `suffix` (e.g. `.ts`).
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// The suffix this rewriter matches.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Find every rewritable call, left to right, non-overlapping.
    pub fn find_matches(&self, source: &str) -> Vec<ImportMatch> {
        let mut matches = Vec::new();
        let mut from = 0;

        while let Some(found) = source[from..].find(IMPORT_CALL) {
            let start = from + found;
            match self.match_at(source, start) {
                Some(m) => {
                    from = m.span.end;
                    matches.push(m);
                }
                None => from = start + 1,
            }
        }

        matches
    }

    /// Rewrite all matches. Returns the input unchanged (borrowed) when there
    /// is nothing to rewrite.
    pub fn rewrite<'a>(&self, source: &'a str) -> Cow<'a, str> {
        let matches = self.find_matches(source);
        if matches.is_empty() {
            return Cow::Borrowed(source);
        }

        let extra = matches.len() * (REPLACEMENT_PREFIX.len() + 1);
        let mut out = String::with_capacity(source.len() + extra);
        let mut last = 0;

        for m in &matches {
            out.push_str(&source[last..m.span.start]);
            out.push_str(REPLACEMENT_PREFIX);
            // Keep `(<literal>)` verbatim.
            out.push_str(&source[m.literal.start - 1..m.span.end]);
            out.push(')');
            last = m.span.end;
        }
        out.push_str(&source[last..]);

        Cow::Owned(out)
    }

    fn match_at(&self, source: &str, start: usize) -> Option<ImportMatch> {
        let bytes = source.as_bytes();

        if start > 0 && is_word_byte(bytes[start - 1]) {
            return None;
        }

        let literal_start = start + IMPORT_CALL.len();
        let quote = match bytes.get(literal_start) {
            Some(b'\'') => '\'',
            Some(b'"') => '"',
            _ => return None,
        };

        let content_start = literal_start + 1;
        let content_len = source[content_start..].find(quote)?;
        let content = &source[content_start..content_start + content_len];
        let literal_end = content_start + content_len + 1;

        if bytes.get(literal_end) != Some(&b')') {
            return None;
        }
        if !is_relative(content) || !content.ends_with(self.suffix.as_str()) {
            return None;
        }

        Some(ImportMatch {
            span: start..literal_end + 1,
            literal: literal_start..literal_end,
            quote,
        })
    }
}

impl Default for DynamicImportRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX)
    }
}

/// Rewrite `import('./x.ts')` calls using the default `.ts` suffix.
pub fn rewrite(source: &str) -> Cow<'_, str> {
    DynamicImportRewriter::default().rewrite(source)
}

fn is_relative(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../")
}

/// ASCII word characters, the same set a `\b` boundary uses.
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_quotes() {
        assert_eq!(
            rewrite("import('./dynamic.ts')"),
            "Promise.resolve(require('./dynamic.ts'))"
        );
    }

    #[test]
    fn test_double_quotes() {
        assert_eq!(
            rewrite(r#"import("../lib/util.ts")"#),
            r#"Promise.resolve(require("../lib/util.ts"))"#
        );
    }

    #[test]
    fn test_no_match_is_borrowed() {
        let src = "const x = require('./x.ts');";
        assert!(matches!(rewrite(src), Cow::Borrowed(_)));
    }

    #[test]
    fn test_word_boundary() {
        assert_eq!(rewrite("reimport('./a.ts')"), "reimport('./a.ts')");
        assert_eq!(rewrite("_import('./a.ts')"), "_import('./a.ts')");
        assert_eq!(
            rewrite("x.import('./a.ts')"),
            "x.Promise.resolve(require('./a.ts'))"
        );
    }

    #[test]
    fn test_mixed_quotes_do_not_match() {
        assert_eq!(rewrite(r#"import('./a.ts")"#), r#"import('./a.ts")"#);
    }

    #[test]
    fn test_other_quote_allowed_inside() {
        assert_eq!(
            rewrite(r#"import('./a"b.ts')"#),
            r#"Promise.resolve(require('./a"b.ts'))"#
        );
    }

    #[test]
    fn test_escaped_quote_not_handled() {
        let src = r"import('./it\'s.ts')";
        assert_eq!(rewrite(src), src);
    }

    #[test]
    fn test_requires_relative_prefix() {
        assert_eq!(rewrite("import('pkg/x.ts')"), "import('pkg/x.ts')");
        assert_eq!(rewrite("import('/abs/x.ts')"), "import('/abs/x.ts')");
        assert_eq!(rewrite("import('.x.ts')"), "import('.x.ts')");
    }

    #[test]
    fn test_requires_suffix() {
        assert_eq!(rewrite("import('./x.js')"), "import('./x.js')");
        assert_eq!(rewrite("import('./x.tsx')"), "import('./x.tsx')");
    }

    #[test]
    fn test_custom_suffix() {
        let rewriter = DynamicImportRewriter::new(".mts");
        assert_eq!(
            rewriter.rewrite("import('./x.mts')"),
            "Promise.resolve(require('./x.mts'))"
        );
        assert_eq!(rewriter.rewrite("import('./x.ts')"), "import('./x.ts')");
    }

    #[test]
    fn test_whitespace_not_tolerated() {
        assert_eq!(rewrite("import ('./x.ts')"), "import ('./x.ts')");
        assert_eq!(rewrite("import( './x.ts' )"), "import( './x.ts' )");
    }

    #[test]
    fn test_find_matches_reports_spans() {
        let src = "a; import(\"./b.ts\"); import('./c.ts')";
        let rewriter = DynamicImportRewriter::default();
        let found = rewriter.find_matches(src);
        assert_eq!(found.len(), 2);
        assert_eq!(&src[found[0].span.clone()], "import(\"./b.ts\")");
        assert_eq!(found[0].quote, '"');
        assert_eq!(found[0].path(src), "./b.ts");
        assert_eq!(found[1].path(src), "./c.ts");
        assert_eq!(found[1].quote, '\'');
    }

    #[test]
    fn test_unicode_around_match() {
        assert_eq!(
            rewrite("// é\nimport('./ü.ts')"),
            "// é\nPromise.resolve(require('./ü.ts'))"
        );
    }
}
