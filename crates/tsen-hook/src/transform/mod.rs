// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Source-to-source transforms applied after import rewriting.
//!
//! Two passes are available:
//!
//! - [`Transform::TypeScript`] erases type syntax
//! - [`Transform::Imports`] turns ES module syntax into CommonJS
//!
//! Both edit the original text in place and never move code between lines,
//! which is what lets [`SourceMap::line_identity`] describe the result.

mod imports;
mod patch;
mod typescript;

pub use imports::to_commonjs;
pub use typescript::strip_types;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HookError, Result};
use crate::source_map::SourceMap;

/// A transform pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// ES module syntax to CommonJS
    Imports,
    /// TypeScript type erasure
    TypeScript,
}

impl Transform {
    /// Name used in configuration files and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Transform::Imports => "imports",
            Transform::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transform {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "imports" => Ok(Transform::Imports),
            "typescript" => Ok(Transform::TypeScript),
            other => Err(HookError::Generic(format!(
                "Unknown transform '{other}' (expected 'imports' or 'typescript')"
            ))),
        }
    }
}

/// Options for one transform run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Passes to run
    pub transforms: Vec<Transform>,
    /// Leave `import()` expressions alone in the imports pass
    pub preserve_dynamic_import: bool,
}

impl TransformOptions {
    /// Options running the given passes.
    pub fn new(transforms: impl IntoIterator<Item = Transform>) -> Self {
        Self {
            transforms: transforms.into_iter().collect(),
            preserve_dynamic_import: false,
        }
    }

    /// Set `preserve_dynamic_import`.
    pub fn with_preserve_dynamic_import(mut self, preserve: bool) -> Self {
        self.preserve_dynamic_import = preserve;
        self
    }

    /// Whether `transform` is enabled.
    pub fn has(&self, transform: Transform) -> bool {
        self.transforms.contains(&transform)
    }

    /// Whether any pass is enabled.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Result of a transform.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// Transformed code
    pub code: String,
    /// Map from the transformed code back to the input
    pub source_map: SourceMap,
}

/// Something that turns source text into runnable JavaScript.
pub trait Transformer: Send + Sync {
    /// Transform `code`, read from `file_path`.
    fn transform(
        &self,
        code: &str,
        file_path: &Path,
        options: &TransformOptions,
    ) -> Result<TransformOutput>;
}

/// The built-in transformer.
///
/// Runs the TypeScript pass before the imports pass regardless of the order
/// they are listed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct Transpiler;

impl Transpiler {
    /// Create a transpiler.
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for Transpiler {
    fn transform(
        &self,
        code: &str,
        file_path: &Path,
        options: &TransformOptions,
    ) -> Result<TransformOutput> {
        let mut out = code.to_string();

        if options.has(Transform::TypeScript) {
            out = strip_types(&out).map_err(|e| e.in_file(file_path))?;
        }
        if options.has(Transform::Imports) {
            out = to_commonjs(&out, options.preserve_dynamic_import)
                .map_err(|e| e.in_file(file_path))?;
        }

        let line_count = code.split('\n').count();
        debug!(
            path = %file_path.display(),
            transforms = ?options.transforms,
            lines = line_count,
            "transformed"
        );

        Ok(TransformOutput {
            code: out,
            source_map: SourceMap::line_identity(file_path.to_string_lossy(), line_count),
        })
    }
}
