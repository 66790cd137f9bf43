// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for hooks and transforms

use std::path::PathBuf;
use thiserror::Error;

/// Result type for hook operations
pub type Result<T> = std::result::Result<T, HookError>;

/// Errors that can occur while loading, transforming or compiling a file
#[derive(Debug, Error)]
pub enum HookError {
    /// Source text could not be tokenized
    #[error("SyntaxError: {message} ({line}:{column})")]
    Syntax {
        /// Human readable description
        message: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
    },

    /// Valid syntax that the transpiler does not handle
    #[error("Unsupported syntax at {line}:{column}: {message}")]
    Unsupported {
        /// What was encountered
        message: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
    },

    /// A transform failed for a specific file
    #[error("Failed to transform '{path}': {source}")]
    Transform {
        /// File being transformed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Box<HookError>,
    },

    /// File system error
    #[error("File system error: {0}")]
    Fs(#[from] std::io::Error),

    /// Path error
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Bad ignore pattern in configuration
    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal error
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Generic error raised by a user hook
    #[error("{0}")]
    Generic(String),
}

impl HookError {
    /// Create a syntax error located at a byte offset in `source`
    pub fn syntax(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_col(source, offset);
        Self::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    /// Create an unsupported-syntax error located at a byte offset in `source`
    pub fn unsupported(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_col(source, offset);
        Self::Unsupported {
            message: message.into(),
            line,
            column,
        }
    }

    /// Attach the file path to a transform failure
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::Transform {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// 1-based line and column (in characters) of a byte offset.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |p| p + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let src = "let a;\nlet b;\n";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 4), (1, 5));
        assert_eq!(line_col(src, 7), (2, 1));
        assert_eq!(line_col(src, 100), (3, 1));
    }

    #[test]
    fn test_syntax_display() {
        let err = HookError::syntax("a\n'oops", 2, "Unterminated string");
        assert_eq!(err.to_string(), "SyntaxError: Unterminated string (2:1)");
    }
}
