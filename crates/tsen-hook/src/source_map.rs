// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source maps for transformed files.
//!
//! Every transform keeps line N of its output on line N of its input, so the
//! map is one segment per line pointing at column 0 of the same source line.
//! It is attached inline as a data URL:
//!
//! ```text
//! //# sourceMappingURL=data:application/json,%7B%22version%22%3A3...
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const VLQ_SHIFT: u32 = 5;
const VLQ_CONTINUATION: i64 = 1 << VLQ_SHIFT;
const VLQ_MASK: i64 = VLQ_CONTINUATION - 1;

/// Prefix of the inline source map comment.
pub const COMMENT_PREFIX: &str = "//# sourceMappingURL=data:application/json,";

/// A version 3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    /// Always 3
    pub version: u32,
    /// Name of the generated file
    pub file: String,
    /// Original sources
    pub sources: Vec<String>,
    /// Symbol names (unused)
    pub names: Vec<String>,
    /// Base64 VLQ encoded mappings
    pub mappings: String,
}

impl SourceMap {
    /// Map each of `line_count` generated lines to the same line of `file`.
    pub fn line_identity(file: impl Into<String>, line_count: usize) -> Self {
        let file = file.into();
        let mut mappings = String::with_capacity(line_count * 5);

        for line in 0..line_count {
            if line > 0 {
                mappings.push(';');
            }
            // generated column, source index, source line delta, source column
            encode_vlq(0, &mut mappings);
            encode_vlq(0, &mut mappings);
            encode_vlq(i64::from(line > 0), &mut mappings);
            encode_vlq(0, &mut mappings);
        }

        Self {
            version: 3,
            sources: vec![file.clone()],
            file,
            names: Vec::new(),
            mappings,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render the `//# sourceMappingURL=` comment with the map inlined.
    pub fn to_comment(&self) -> Result<String> {
        let json = self.to_json()?;
        Ok(format!("{COMMENT_PREFIX}{}", urlencoding::encode(&json)))
    }

    /// Parse a map back out of an inline comment.
    pub fn from_comment(comment: &str) -> Option<Self> {
        let encoded = comment.trim().strip_prefix(COMMENT_PREFIX)?;
        let json = urlencoding::decode(encoded).ok()?;
        serde_json::from_str(&json).ok()
    }

    /// Original (0-based) line of a generated (0-based) line, from the first
    /// segment on that line.
    pub fn original_line(&self, generated: usize) -> Option<usize> {
        let mut source_line = 0i64;
        for (line, segments) in self.mappings.split(';').enumerate() {
            let mut found = None;
            for segment in segments.split(',').filter(|s| !s.is_empty()) {
                let fields = decode_vlq(segment)?;
                if let Some(delta) = fields.get(2) {
                    source_line = source_line.checked_add(*delta)?;
                    found.get_or_insert(source_line);
                }
            }
            if line == generated {
                return found.and_then(|l| usize::try_from(l).ok());
            }
        }
        None
    }
}

/// Append the Base64 VLQ encoding of `value` to `out`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = vlq & VLQ_MASK;
        vlq >>= VLQ_SHIFT;
        if vlq > 0 {
            digit |= VLQ_CONTINUATION;
        }
        out.push(BASE64[digit as usize] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Decode one segment of Base64 VLQ values.
pub fn decode_vlq(segment: &str) -> Option<Vec<i64>> {
    let mut values = Vec::new();
    let mut value = 0i64;
    let mut shift = 0u32;

    for byte in segment.bytes() {
        let digit = BASE64.iter().position(|&b| b == byte)? as i64;
        let bits = digit & VLQ_MASK;
        // Reject values wider than 63 bits.
        let chunk = bits.checked_shl(shift).filter(|chunk| chunk >> shift == bits)?;
        value |= chunk;
        if digit & VLQ_CONTINUATION != 0 {
            shift += VLQ_SHIFT;
            continue;
        }
        let negative = value & 1 == 1;
        value >>= 1;
        values.push(if negative { -value } else { value });
        value = 0;
        shift = 0;
    }

    (shift == 0).then_some(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    #[test]
    fn test_encode_vlq() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-1000), "x+B");
    }

    #[test]
    fn test_decode_vlq() {
        assert_eq!(decode_vlq("AACA"), Some(vec![0, 0, 1, 0]));
        assert_eq!(decode_vlq("x+B"), Some(vec![-1000]));
        assert_eq!(decode_vlq("g"), None);
        assert_eq!(decode_vlq("!"), None);
    }

    #[test]
    fn test_decode_vlq_rejects_overflow() {
        let widest = vlq(i64::MAX >> 1);
        assert_eq!(decode_vlq(&widest), Some(vec![i64::MAX >> 1]));
        assert_eq!(decode_vlq(&("g".repeat(12) + "Q")), None);
        assert_eq!(decode_vlq(&("g".repeat(14) + "A")), None);
        assert_eq!(decode_vlq(&"g".repeat(40)), None);
    }

    #[test]
    fn test_original_line_rejects_overflow() {
        let mut map = SourceMap::line_identity("a.ts", 1);
        map.mappings = "gggggggggggggggA".to_string();
        assert_eq!(map.original_line(0), None);

        let step = format!("AA{}A", vlq(1 << 60));
        map.mappings = vec![step; 8].join(";");
        assert_eq!(map.original_line(0), usize::try_from(1i64 << 60).ok());
        assert_eq!(map.original_line(7), None);
    }

    #[test]
    fn test_line_identity() {
        let map = SourceMap::line_identity("/src/a.ts", 3);
        assert_eq!(map.mappings, "AAAA;AACA;AACA");
        assert_eq!(map.sources, vec!["/src/a.ts"]);
        assert_eq!(map.file, "/src/a.ts");
        assert_eq!(map.original_line(2), Some(2));
        assert_eq!(map.original_line(3), None);
    }

    #[test]
    fn test_comment_is_url_encoded() {
        let map = SourceMap::line_identity("a b.ts", 1);
        let comment = map.to_comment().unwrap();
        assert!(comment.starts_with(COMMENT_PREFIX));
        assert!(!comment[COMMENT_PREFIX.len()..].contains(' '));
        assert!(comment.contains("%22version%22%3A3"));
        assert_eq!(SourceMap::from_comment(&comment), Some(map));
    }
}
