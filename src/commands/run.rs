// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `tsen run`: compile the entry's directory into a scratch directory and
//! execute it with node.
//!
//! Compiled files keep their names, so node is preloaded with a script that
//! loads every hooked extension with its plain JavaScript loader.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode, ExitStatus};
use tracing::{debug, warn};
use tsen_hook::{compile_dir, HookRegistry};

use crate::cli::{Cli, RunArgs};

pub fn run(args: &RunArgs, cli: &Cli) -> Result<ExitCode> {
    let entry = args
        .entry
        .canonicalize()
        .with_context(|| format!("cannot open {}", args.entry.display()))?;
    let root = entry
        .parent()
        .context("entry has no parent directory")?
        .to_path_buf();

    let config = super::load_config(cli, &root)?;
    let registry = config.build_registry()?;

    let scratch = tempfile::Builder::new().prefix("tsen-run-").tempdir()?;
    let report = compile_dir(&registry, &root, scratch.path())?;
    debug!(files = report.total(), dir = %scratch.path().display(), "compiled for run");

    link_node_modules(&root, scratch.path())?;

    let preload = tempfile::Builder::new()
        .prefix("tsen-preload-")
        .suffix(".js")
        .tempfile()?;
    std::fs::write(preload.path(), preload_script(&registry))?;

    let relative = entry.strip_prefix(&root)?;
    let status = Command::new(&args.node)
        .arg("--require")
        .arg(preload.path())
        .arg(scratch.path().join(relative))
        .args(&args.args)
        .status()
        .with_context(|| format!("failed to start {}", args.node))?;

    Ok(exit_code(status))
}

/// Register every hooked extension other than `.js` with node's `.js` loader.
fn preload_script(registry: &HookRegistry) -> String {
    let mut extensions: Vec<&str> = registry
        .entries()
        .flat_map(|(_, options, _)| options.extensions.iter().map(String::as_str))
        .filter(|ext| *ext != ".js")
        .collect();
    extensions.sort_unstable();
    extensions.dedup();

    let mut script = String::from("'use strict';\n");
    for ext in extensions {
        script.push_str(&format!(
            "require.extensions['{ext}'] = require.extensions['.js'];\n"
        ));
    }
    script
}

/// Link the nearest `node_modules` at or above `root` into `out`.
fn link_node_modules(root: &Path, out: &Path) -> Result<()> {
    let Some(modules) = find_node_modules(root) else {
        return Ok(());
    };
    let link = out.join("node_modules");
    debug!(target = %modules.display(), "linking node_modules");

    #[cfg(unix)]
    std::os::unix::fs::symlink(&modules, &link)
        .with_context(|| format!("failed to link {}", modules.display()))?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(&modules, &link)
        .with_context(|| format!("failed to link {}", modules.display()))?;
    #[cfg(not(any(unix, windows)))]
    warn!("cannot link {} on this platform", modules.display());

    Ok(())
}

fn find_node_modules(root: &Path) -> Option<PathBuf> {
    root.ancestors()
        .map(|dir| dir.join("node_modules"))
        .find(|candidate| candidate.is_dir())
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => {
            warn!("program terminated by a signal");
            ExitCode::FAILURE
        }
    }
}
