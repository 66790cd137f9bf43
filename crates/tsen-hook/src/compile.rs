// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Ahead-of-time compilation of files and directory trees.
//!
//! Files a hook applies to are written through the hooks; every other file
//! is copied as is. File names are kept, so relative `require('./x.ts')`
//! calls produced by the rewriter still resolve in the output tree.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, error, info, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::error::{HookError, Result};
use crate::hook::HookRegistry;

/// Summary of a directory build.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Files written through hooks
    pub transformed: usize,
    /// Files copied unchanged
    pub copied: usize,
}

impl BuildReport {
    /// Total number of files written.
    pub fn total(&self) -> usize {
        self.transformed + self.copied
    }
}

enum Outcome {
    Transformed,
    Copied,
}

/// Run the hooks for one file. `None` if no hook applies to it.
pub fn compile_file(registry: &HookRegistry, path: &Path) -> Result<Option<String>> {
    registry.process_file(path)
}

/// Compile every file under `src` into `out`, in parallel.
///
/// `node_modules` and hidden directories are skipped, as is `out` itself
/// when it lies inside `src`. The first failure is returned after all files
/// were attempted.
#[instrument(skip(registry))]
pub fn compile_dir(registry: &HookRegistry, src: &Path, out: &Path) -> Result<BuildReport> {
    if !src.is_dir() {
        return Err(HookError::InvalidPath(src.to_path_buf()));
    }
    std::fs::create_dir_all(out)?;
    let src = src.canonicalize()?;
    let out = out.canonicalize()?;

    let files = collect_files(&src, &out)?;
    info!("Compiling {} files from {}", files.len(), src.display());

    let results: Vec<(PathBuf, Result<Outcome>)> = files
        .par_iter()
        .map(|path| (path.clone(), compile_into(registry, &src, &out, path)))
        .collect();

    let mut report = BuildReport::default();
    let mut first_error = None;
    for (path, result) in results {
        match result {
            Ok(Outcome::Transformed) => report.transformed += 1,
            Ok(Outcome::Copied) => report.copied += 1,
            Err(e) => {
                error!("{}: {}", path.display(), e);
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    info!(
        transformed = report.transformed,
        copied = report.copied,
        "build finished"
    );
    Ok(report)
}

fn collect_files(src: &Path, out: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_skipped_dir(e) || e.path() == out));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name == "node_modules" || name.starts_with('.'))
}

fn compile_into(registry: &HookRegistry, src: &Path, out: &Path, path: &Path) -> Result<Outcome> {
    let relative = path
        .strip_prefix(src)
        .map_err(|_| HookError::InvalidPath(path.to_path_buf()))?;
    let dest = out.join(relative);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match registry.process_file(path)? {
        Some(code) => {
            debug!("compiled {}", relative.display());
            std::fs::write(&dest, code)?;
            Ok(Outcome::Transformed)
        }
        None => {
            std::fs::copy(path, &dest)?;
            Ok(Outcome::Copied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::default_hooks;
    use std::fs;

    fn registry() -> HookRegistry {
        let mut registry = HookRegistry::new();
        default_hooks(&mut registry);
        registry
    }

    #[test]
    fn test_compile_dir() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("lib")).unwrap();
        fs::create_dir_all(src.path().join("node_modules/dep")).unwrap();
        fs::create_dir_all(src.path().join(".git")).unwrap();
        fs::write(src.path().join("main.js"), "import('./lib/util.ts');\n").unwrap();
        fs::write(src.path().join("lib/util.ts"), "export const n: number = 1;\n").unwrap();
        fs::write(src.path().join("data.json"), "{}").unwrap();
        fs::write(src.path().join("node_modules/dep/index.js"), "x").unwrap();
        fs::write(src.path().join(".git/HEAD"), "x").unwrap();

        let report = compile_dir(&registry(), src.path(), out.path()).unwrap();
        assert_eq!(report, BuildReport { transformed: 2, copied: 1 });

        let main = fs::read_to_string(out.path().join("main.js")).unwrap();
        assert_eq!(main, "Promise.resolve(require('./lib/util.ts'));\n");
        let util = fs::read_to_string(out.path().join("lib/util.ts")).unwrap();
        assert!(util.contains("const n = exports.n = 1;"));
        assert!(util.contains("//# sourceMappingURL=data:application/json,"));
        assert!(out.path().join("data.json").exists());
        assert!(!out.path().join("node_modules").exists());
        assert!(!out.path().join(".git").exists());
    }

    #[test]
    fn test_compile_dir_reports_failure() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("ok.ts"), "let a = 1;").unwrap();
        fs::write(src.path().join("bad.ts"), "let s = 'open").unwrap();

        let err = compile_dir(&registry(), src.path(), out.path()).unwrap_err();
        assert!(err.to_string().contains("bad.ts"));
    }

    #[test]
    fn test_compile_dir_requires_directory() {
        let out = tempfile::tempdir().unwrap();
        let missing = out.path().join("missing");
        assert!(matches!(
            compile_dir(&registry(), &missing, out.path()),
            Err(HookError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_compile_file_without_hook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.css");
        fs::write(&path, "a {}").unwrap();
        assert_eq!(compile_file(&registry(), &path).unwrap(), None);
    }
}
