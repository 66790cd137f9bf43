// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `tsen.toml` configuration.
//!
//! ```toml
//! [rewrite]
//! suffix = ".ts"
//!
//! [[hooks]]
//! extension = ".js"
//!
//! [[hooks]]
//! extension = ".ts"
//! transforms = ["imports", "typescript"]
//! preserve_dynamic_import = true
//! ignore = ["**/*.d.ts"]
//! ```
//!
//! Without any `[[hooks]]` table the default hooks are used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;
use crate::hook::{default_hooks, HookOptions, HookRegistry, TranspileHook};
use crate::rewrite::{DynamicImportRewriter, DEFAULT_SUFFIX};
use crate::transform::{Transform, TransformOptions};

/// Name of the configuration file.
pub const CONFIG_FILE: &str = "tsen.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Dynamic import rewriting
    pub rewrite: RewriteConfig,

    /// Hooks to install; empty means the defaults
    pub hooks: Vec<HookConfig>,
}

/// `[rewrite]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Suffix of the relative paths whose `import()` is rewritten
    pub suffix: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

/// One `[[hooks]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    /// File extension the hook applies to
    pub extension: String,

    /// Transforms to run after rewriting
    #[serde(default)]
    pub transforms: Vec<Transform>,

    /// Leave `import()` to the rewriter
    #[serde(default)]
    pub preserve_dynamic_import: bool,

    /// Skip files under `node_modules`
    #[serde(default = "default_true")]
    pub ignore_node_modules: bool,

    /// Glob patterns of files to skip
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::parse(&text)?;
        debug!(path = %path.display(), hooks = config.hooks.len(), "loaded configuration");
        Ok(config)
    }

    /// Find `tsen.toml` in `dir` or its ancestors.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .map(|d| d.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load the nearest `tsen.toml` above `dir`, or the defaults.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Build a registry with the configured hooks.
    pub fn build_registry(&self) -> Result<HookRegistry> {
        let mut registry = HookRegistry::new();
        let rewriter = DynamicImportRewriter::new(self.rewrite.suffix.clone());

        if self.hooks.is_empty() {
            if self.rewrite.suffix == DEFAULT_SUFFIX {
                default_hooks(&mut registry);
                return Ok(registry);
            }
            return Self::defaults_with(&rewriter);
        }

        for hook in &self.hooks {
            let mut options = HookOptions::new([hook.extension.as_str()])
                .with_ignore_node_modules(hook.ignore_node_modules);
            for pattern in &hook.ignore {
                options = options.with_ignore(pattern)?;
            }
            let transform = TransformOptions::new(hook.transforms.iter().copied())
                .with_preserve_dynamic_import(hook.preserve_dynamic_import);
            registry.add(
                TranspileHook::new(transform).with_rewriter(rewriter.clone()),
                options,
            );
        }

        Ok(registry)
    }

    /// The default hook set with a custom rewriter.
    fn defaults_with(rewriter: &DynamicImportRewriter) -> Result<HookRegistry> {
        let defaults = Config {
            rewrite: RewriteConfig {
                suffix: rewriter.suffix().to_string(),
            },
            hooks: vec![
                HookConfig::new(".js"),
                HookConfig {
                    transforms: vec![Transform::Imports, Transform::TypeScript],
                    preserve_dynamic_import: true,
                    ..HookConfig::new(".ts")
                },
            ],
        };
        defaults.build_registry()
    }
}

impl HookConfig {
    /// A rewrite-only hook for `extension`.
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            transforms: Vec::new(),
            preserve_dynamic_import: false,
            ignore_node_modules: true,
            ignore: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rewrite.suffix, ".ts");
        assert_eq!(config.build_registry().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_hooks() {
        let config = Config::parse(
            r#"
[rewrite]
suffix = ".mts"

[[hooks]]
extension = ".mjs"

[[hooks]]
extension = "mts"
transforms = ["imports", "typescript"]
preserve_dynamic_import = true
ignore_node_modules = false
ignore = ["**/*.d.mts"]
"#,
        )
        .unwrap();

        assert_eq!(config.hooks.len(), 2);
        assert_eq!(config.hooks[0], HookConfig::new(".mjs"));
        assert_eq!(
            config.hooks[1].transforms,
            vec![Transform::Imports, Transform::TypeScript]
        );
        assert!(!config.hooks[1].ignore_node_modules);

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.matches(Path::new("node_modules/x/a.mts")));
        assert!(!registry.matches(Path::new("a.d.mts")));
        let out = registry
            .apply(Path::new("a.mjs"), "import('./b.mts')")
            .unwrap();
        assert_eq!(out, "Promise.resolve(require('./b.mts'))");
    }

    #[test]
    fn test_custom_suffix_keeps_default_hooks() {
        let config = Config::parse("[rewrite]\nsuffix = \".mts\"\n").unwrap();
        let registry = config.build_registry().unwrap();
        assert_eq!(registry.len(), 2);
        let out = registry.apply(Path::new("a.js"), "import('./b.mts')").unwrap();
        assert_eq!(out, "Promise.resolve(require('./b.mts'))");
    }

    #[test]
    fn test_rejects_unknown_keys_and_transforms() {
        assert!(Config::parse("[rewrite]\nsufix = \".ts\"").is_err());
        assert!(Config::parse("[[hooks]]\nextension = \".ts\"\ntransforms = [\"jsx\"]").is_err());
        assert!(Config::parse("[[hooks]]\ntransforms = []").is_err());
    }

    #[test]
    fn test_bad_ignore_pattern() {
        let config = Config::parse("[[hooks]]\nextension = \".ts\"\nignore = [\"[\"]").unwrap();
        assert!(config.build_registry().is_err());
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[[hooks]]\nextension = \".cjs\"\n",
        )
        .unwrap();

        assert_eq!(Config::find(&nested), Some(dir.path().join(CONFIG_FILE)));
        let config = Config::discover(&nested).unwrap();
        assert_eq!(config.hooks, vec![HookConfig::new(".cjs")]);
    }
}
