// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Span edits over an immutable source text.
//!
//! Edits never change the number of lines: a replaced range keeps its line
//! breaks (appended after the replacement), so line N of the output always
//! comes from line N of the input.

use std::cmp::Reverse;
use std::ops::Range;

#[derive(Debug, Clone)]
struct Edit {
    range: Range<usize>,
    text: String,
    order: usize,
}

/// Collects edits and applies them in one pass.
#[derive(Debug)]
pub struct Patcher<'a> {
    source: &'a str,
    edits: Vec<Edit>,
}

impl<'a> Patcher<'a> {
    /// Create an empty patch over `source`.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Replace `range` with `text`.
    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        let order = self.edits.len();
        self.edits.push(Edit {
            range,
            text: text.into(),
            order,
        });
    }

    /// Remove `range`, keeping its line breaks.
    pub fn remove(&mut self, range: Range<usize>) {
        if !range.is_empty() {
            self.replace(range, "");
        }
    }

    /// Insert `text` at `pos`.
    pub fn insert(&mut self, pos: usize, text: impl Into<String>) {
        self.replace(pos..pos, text);
    }

    /// Whether any edit was recorded.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply all edits.
    ///
    /// Edits are applied by start offset. Insertions come before a removal
    /// starting at the same offset, the widest removal at an offset wins, and
    /// any edit starting inside an applied range is dropped.
    pub fn finish(mut self) -> String {
        self.edits.sort_by_key(|e| {
            (
                e.range.start,
                !e.range.is_empty(),
                Reverse(e.range.end),
                e.order,
            )
        });

        let mut out = String::with_capacity(self.source.len());
        let mut last = 0;

        for edit in &self.edits {
            let range = &edit.range;
            if range.start < last {
                continue;
            }
            out.push_str(&self.source[last..range.start]);
            out.push_str(&edit.text);

            let lost = self.source[range.clone()].matches('\n').count();
            let kept = edit.text.matches('\n').count();
            for _ in kept..lost {
                out.push('\n');
            }
            last = range.end;
        }

        out.push_str(&self.source[last..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_insert() {
        let mut patch = Patcher::new("let x: number = 1;");
        patch.remove(5..13);
        patch.insert(0, "/*a*/");
        assert_eq!(patch.finish(), "/*a*/let x = 1;");
    }

    #[test]
    fn test_removal_keeps_lines() {
        let mut patch = Patcher::new("a\ninterface X {\n  y: 1\n}\nb");
        patch.remove(2..24);
        assert_eq!(patch.finish(), "a\n\n\n\nb");
    }

    #[test]
    fn test_wider_edit_wins() {
        let mut patch = Patcher::new("private abstract foo(): void;");
        patch.remove(0..8);
        patch.remove(0..29);
        patch.remove(20..26);
        assert_eq!(patch.finish(), "");
    }

    #[test]
    fn test_adjacent_edits() {
        let mut patch = Patcher::new("abc");
        patch.replace(0..1, "A");
        patch.replace(1..2, "B");
        patch.insert(3, "!");
        assert_eq!(patch.finish(), "ABc!");
    }

    #[test]
    fn test_insertions_keep_order() {
        let mut patch = Patcher::new("x");
        patch.insert(1, "1");
        patch.insert(1, "2");
        assert_eq!(patch.finish(), "x12");
    }
}
