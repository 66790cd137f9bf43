// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # tsen-hook
//!
//! Load-time hooks that make TypeScript files loadable by a CommonJS host.
//!
//! The core is a small text filter: `import('./x.ts')` (a quoted relative
//! path ending in `.ts`) becomes `Promise.resolve(require('./x.ts'))`, so the
//! host's synchronous loader, which already knows how to handle `.ts` files
//! through hooks, loads the module instead of its `import()` resolver, which
//! does not. Around that filter the crate provides:
//!
//! - A TypeScript type-stripping transform and an ESM to CommonJS transform,
//!   both line preserving
//! - Inline source maps for transformed files
//! - An extension-keyed hook registry, with an optional process-wide instance
//! - `tsen.toml` configuration
//! - Parallel ahead-of-time compilation of directory trees
//!
//! ## Quick Start
//!
//! ```rust
//! use std::path::Path;
//! use tsen_hook::{default_hooks, rewrite, HookRegistry};
//!
//! assert_eq!(
//!     rewrite("const m = await import('./dynamic.ts');"),
//!     "const m = await Promise.resolve(require('./dynamic.ts'));"
//! );
//!
//! let mut registry = HookRegistry::new();
//! default_hooks(&mut registry);
//! let js = registry.apply(Path::new("main.ts"), "export const n: number = 1;\n")?;
//! assert!(js.contains("const n = exports.n = 1;"));
//! # Ok::<(), tsen_hook::HookError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compile;
pub mod config;
pub mod error;
pub mod hook;
pub mod lexer;
pub mod rewrite;
pub mod source_map;
pub mod transform;

// Re-exports
pub use compile::{compile_dir, compile_file, BuildReport};
pub use config::Config;
pub use error::{HookError, Result};
pub use hook::{default_hooks, Hook, HookId, HookOptions, HookRegistry, TranspileHook};
pub use rewrite::{rewrite, DynamicImportRewriter};
pub use source_map::SourceMap;
pub use transform::{Transform, TransformOptions, TransformOutput, Transformer, Transpiler};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
