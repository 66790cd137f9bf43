// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Load-time hooks keyed by file extension.
//!
//! A hook receives the text of a file about to be loaded and returns the
//! text to load instead. Hooks live in a [`HookRegistry`]; several hooks may
//! match one file, in which case they run in registration order, each seeing
//! the previous one's output.
//!
//! There is also one process-wide registry, empty until [`install`] or
//! [`install_with`] is called:
//!
//! ```rust
//! use std::path::Path;
//!
//! tsen_hook::hook::install();
//! let out = tsen_hook::hook::with_global(|registry| {
//!     registry.apply(Path::new("main.js"), "import('./lazy.ts');")
//! })?;
//! assert_eq!(out, "Promise.resolve(require('./lazy.ts'));");
//! tsen_hook::hook::teardown();
//! # Ok::<(), tsen_hook::HookError>(())
//! ```

use std::fmt;
use std::path::{Component, Path};
use std::sync::{Arc, LazyLock};

use glob::Pattern;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{HookError, Result};
use crate::rewrite::DynamicImportRewriter;
use crate::transform::{Transform, TransformOptions, Transformer, Transpiler};

/// A source hook.
pub trait Hook: Send + Sync {
    /// Return the code to load for `path` in place of `code`.
    fn process(&self, code: &str, path: &Path) -> Result<String>;

    /// Short description for listings.
    fn describe(&self) -> String {
        "custom hook".to_string()
    }
}

impl<F> Hook for F
where
    F: Fn(&str, &Path) -> Result<String> + Send + Sync,
{
    fn process(&self, code: &str, path: &Path) -> Result<String> {
        self(code, path)
    }
}

/// Rewrites dynamic imports, then optionally transpiles.
///
/// With transforms configured the output ends with an inline source map
/// comment on its own line.
#[derive(Clone)]
pub struct TranspileHook {
    rewriter: DynamicImportRewriter,
    options: TransformOptions,
    transformer: Arc<dyn Transformer>,
}

impl TranspileHook {
    /// Rewrite dynamic imports and run the given transforms.
    pub fn new(options: TransformOptions) -> Self {
        Self {
            rewriter: DynamicImportRewriter::default(),
            options,
            transformer: Arc::new(Transpiler),
        }
    }

    /// Rewrite dynamic imports only.
    pub fn rewrite_only() -> Self {
        Self::new(TransformOptions::default())
    }

    /// Use a different rewriter (e.g. another suffix).
    pub fn with_rewriter(mut self, rewriter: DynamicImportRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    /// Use a different transformer.
    pub fn with_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformer = Arc::new(transformer);
        self
    }

    /// Transform options.
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }
}

impl fmt::Debug for TranspileHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranspileHook")
            .field("rewriter", &self.rewriter)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Hook for TranspileHook {
    fn process(&self, code: &str, path: &Path) -> Result<String> {
        let code = self.rewriter.rewrite(code);
        if self.options.is_empty() {
            return Ok(code.into_owned());
        }

        let output = self.transformer.transform(&code, path, &self.options)?;
        let comment = output.source_map.to_comment()?;
        Ok(format!("{}\n{}", output.code, comment))
    }

    fn describe(&self) -> String {
        let mut description = format!("rewrite import('*{}')", self.rewriter.suffix());
        if !self.options.is_empty() {
            let names: Vec<&str> = self.options.transforms.iter().map(|t| t.name()).collect();
            description.push_str(&format!(", transforms [{}]", names.join(", ")));
            if self.options.preserve_dynamic_import {
                description.push_str(", dynamic imports preserved");
            }
        }
        description
    }
}

/// Which files a hook applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct HookOptions {
    /// File extensions, with the leading dot
    pub extensions: Vec<String>,
    /// Skip files under a `node_modules` directory
    pub ignore_node_modules: bool,
    /// Skip files matching any of these patterns
    pub ignore: Vec<Pattern>,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            ignore_node_modules: true,
            ignore: Vec::new(),
        }
    }
}

impl HookOptions {
    /// Match files with any of `extensions`. A missing leading dot is added.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions.into_iter().map(|e| normalize_extension(e.as_ref())).collect(),
            ..Self::default()
        }
    }

    /// Set `ignore_node_modules`.
    pub fn with_ignore_node_modules(mut self, ignore: bool) -> Self {
        self.ignore_node_modules = ignore;
        self
    }

    /// Add an ignore glob.
    pub fn with_ignore(mut self, pattern: &str) -> Result<Self> {
        self.ignore.push(Pattern::new(pattern)?);
        Ok(self)
    }

    /// Whether a hook with these options applies to `path`.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !self.extensions.iter().any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str())) {
            return false;
        }
        if self.ignore_node_modules
            && path
                .components()
                .any(|c| matches!(c, Component::Normal(n) if n == "node_modules"))
        {
            return false;
        }
        !self.ignore.iter().any(|p| p.matches_path(path))
    }
}

fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

/// Identifies a registered hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
struct Entry {
    id: HookId,
    options: HookOptions,
    hook: Arc<dyn Hook>,
}

/// An ordered set of hooks. Clones share the hook functions.
#[derive(Default, Clone)]
pub struct HookRegistry {
    entries: Vec<Entry>,
    next_id: u64,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` for files matching `options`.
    pub fn add(&mut self, hook: impl Hook + 'static, options: HookOptions) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        debug!(?id, extensions = ?options.extensions, "hook added");
        self.entries.push(Entry {
            id,
            options,
            hook: Arc::new(hook),
        });
        id
    }

    /// Remove one hook. Returns false if it was already gone.
    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        if removed {
            debug!(?id, "hook removed");
        }
        removed
    }

    /// Whether any hook applies to `path`.
    pub fn matches(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.options.matches(path))
    }

    /// Run every hook that applies to `path`, in registration order.
    pub fn apply(&self, path: &Path, code: &str) -> Result<String> {
        let mut code = code.to_string();
        for entry in self.entries.iter().filter(|e| e.options.matches(path)) {
            trace!(id = ?entry.id, path = %path.display(), "running hook");
            code = entry.hook.process(&code, path).map_err(|e| match e {
                HookError::Transform { .. } => e,
                other => other.in_file(path),
            })?;
        }
        Ok(code)
    }

    /// Read `path` and run the hooks that apply to it. `None` when no hook
    /// applies.
    pub fn process_file(&self, path: &Path) -> Result<Option<String>> {
        if !self.matches(path) {
            return Ok(None);
        }
        let code = std::fs::read_to_string(path)?;
        self.apply(path, &code).map(Some)
    }

    /// Registered hooks with their options and description.
    pub fn entries(&self) -> impl Iterator<Item = (HookId, &HookOptions, String)> + '_ {
        self.entries
            .iter()
            .map(|e| (e.id, &e.options, e.hook.describe()))
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every hook.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.id, &e.options.extensions)))
            .finish()
    }
}

/// Register the default hooks: `.js` files get import rewriting only, `.ts`
/// files also get the `imports` and `typescript` transforms with dynamic
/// imports left to the rewriter.
pub fn default_hooks(registry: &mut HookRegistry) -> Vec<HookId> {
    let js = registry.add(TranspileHook::rewrite_only(), HookOptions::new([".js"]));
    let ts = registry.add(
        TranspileHook::new(
            TransformOptions::new([Transform::Imports, Transform::TypeScript])
                .with_preserve_dynamic_import(true),
        ),
        HookOptions::new([".ts"]),
    );
    vec![js, ts]
}

// ---------------------------------------------------------------------------
// Process-wide registry
// ---------------------------------------------------------------------------

#[derive(Default)]
struct GlobalHooks {
    registry: HookRegistry,
    installed: bool,
}

static GLOBAL: LazyLock<RwLock<GlobalHooks>> = LazyLock::new(|| RwLock::new(GlobalHooks::default()));

/// Install the default hooks into the process-wide registry. Does nothing if
/// already installed; returns whether this call installed them.
pub fn install() -> bool {
    let mut global = GLOBAL.write();
    if global.installed {
        return false;
    }
    default_hooks(&mut global.registry);
    global.installed = true;
    debug!("default hooks installed");
    true
}

/// Replace the process-wide registry with the hooks `config` describes.
pub fn install_with(config: &Config) -> Result<()> {
    let registry = config.build_registry()?;
    let mut global = GLOBAL.write();
    global.registry = registry;
    global.installed = true;
    debug!(hooks = global.registry.len(), "configured hooks installed");
    Ok(())
}

/// Remove every process-wide hook.
pub fn teardown() {
    let mut global = GLOBAL.write();
    global.registry.clear();
    global.installed = false;
}

/// Whether [`install`] or [`install_with`] ran since the last [`teardown`].
pub fn is_installed() -> bool {
    GLOBAL.read().installed
}

/// Add a hook to the process-wide registry.
pub fn add_hook(hook: impl Hook + 'static, options: HookOptions) -> RevertHandle {
    let id = GLOBAL.write().registry.add(hook, options);
    RevertHandle { id }
}

/// Run `f` with a snapshot of the process-wide registry.
///
/// The lock is released before `f` runs, so `f` may add or remove hooks;
/// those changes are not visible in the snapshot it was given.
pub fn with_global<R>(f: impl FnOnce(&HookRegistry) -> R) -> R {
    let registry = GLOBAL.read().registry.clone();
    f(&registry)
}

/// Removes a hook added with [`add_hook`].
#[derive(Debug)]
#[must_use = "dropping the handle keeps the hook installed"]
pub struct RevertHandle {
    id: HookId,
}

impl RevertHandle {
    /// The hook's id.
    pub fn id(&self) -> HookId {
        self.id
    }

    /// Remove the hook. Returns false if a teardown already removed it.
    pub fn revert(self) -> bool {
        GLOBAL.write().registry.remove(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(code: &str, _path: &Path) -> Result<String> {
        Ok(code.to_uppercase())
    }

    fn suffixed(suffix: &'static str) -> impl Hook {
        move |code: &str, _: &Path| -> Result<String> { Ok(format!("{code}{suffix}")) }
    }

    #[test]
    fn test_extension_matching() {
        let options = HookOptions::new(["ts", ".mts"]);
        assert_eq!(options.extensions, vec![".ts", ".mts"]);
        assert!(options.matches(Path::new("src/a.ts")));
        assert!(options.matches(Path::new("b.mts")));
        assert!(!options.matches(Path::new("a.js")));
        assert!(!options.matches(Path::new(".ts")));
        assert!(!options.matches(Path::new("a.tsx")));
    }

    #[test]
    fn test_node_modules_ignored_by_default() {
        let options = HookOptions::new([".js"]);
        assert!(!options.matches(Path::new("/p/node_modules/x/index.js")));
        let options = options.with_ignore_node_modules(false);
        assert!(options.matches(Path::new("/p/node_modules/x/index.js")));
    }

    #[test]
    fn test_ignore_patterns() {
        let options = HookOptions::new([".ts"]).with_ignore("**/*.d.ts").unwrap();
        assert!(!options.matches(Path::new("src/types.d.ts")));
        assert!(options.matches(Path::new("src/types.ts")));
        assert!(HookOptions::new([".ts"]).with_ignore("[").is_err());
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let mut registry = HookRegistry::new();
        registry.add(suffixed("a"), HookOptions::new([".js"]));
        registry.add(suffixed("b"), HookOptions::new([".js"]));
        registry.add(upper, HookOptions::new([".ts"]));
        assert_eq!(registry.apply(Path::new("x.js"), "-").unwrap(), "-ab");
        assert_eq!(registry.apply(Path::new("x.ts"), "ab").unwrap(), "AB");
        assert_eq!(registry.apply(Path::new("x.css"), "ab").unwrap(), "ab");
    }

    #[test]
    fn test_remove_single_hook() {
        let mut registry = HookRegistry::new();
        let a = registry.add(upper, HookOptions::new([".js"]));
        let b = registry.add(suffixed("!"), HookOptions::new([".js"]));
        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.apply(Path::new("x.js"), "a").unwrap(), "a!");
        assert!(registry.remove(b));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_hook_errors_name_the_file() {
        let mut registry = HookRegistry::new();
        registry.add(
            |_: &str, _: &Path| -> Result<String> { Err(HookError::Generic("boom".into())) },
            HookOptions::new([".js"]),
        );
        let err = registry.apply(Path::new("lib/x.js"), "").unwrap_err();
        assert_eq!(err.to_string(), "Failed to transform 'lib/x.js': boom");
    }

    #[test]
    fn test_rewrite_only_hook() {
        let hook = TranspileHook::rewrite_only();
        let out = hook
            .process("await import('./a.ts');", Path::new("m.js"))
            .unwrap();
        assert_eq!(out, "await Promise.resolve(require('./a.ts'));");
        assert_eq!(hook.describe(), "rewrite import('*.ts')");
    }

    #[test]
    fn test_transpile_hook_appends_source_map() {
        let hook = TranspileHook::new(TransformOptions::new([Transform::TypeScript]));
        let out = hook.process("let a: number = 1;\n", Path::new("/src/a.ts")).unwrap();
        let (code, comment) = out.rsplit_once('\n').unwrap();
        assert_eq!(code, "let a = 1;\n");
        let map = crate::source_map::SourceMap::from_comment(comment).unwrap();
        assert_eq!(map.file, "/src/a.ts");
        assert_eq!(map.sources, vec!["/src/a.ts"]);
    }

    #[test]
    fn test_default_hooks() {
        let mut registry = HookRegistry::new();
        assert_eq!(default_hooks(&mut registry).len(), 2);
        assert!(registry.matches(Path::new("a.js")));
        assert!(registry.matches(Path::new("a.ts")));
        assert!(!registry.matches(Path::new("node_modules/a.ts")));

        let out = registry
            .apply(Path::new("a.ts"), "const m = await import('./m.ts');\n")
            .unwrap();
        assert!(out.contains("Promise.resolve(require('./m.ts'))"));
        assert!(!out.contains("Promise.resolve().then"));
    }
}
