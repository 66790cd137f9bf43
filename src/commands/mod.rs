// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command implementations.

pub mod build;
pub mod hooks;
pub mod rewrite;
pub mod run;
pub mod transform;

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tsen_hook::Config;

use crate::cli::{Cli, Commands};

/// Run the selected command.
pub fn dispatch(cli: &Cli) -> Result<ExitCode> {
    match &cli.command {
        Commands::Rewrite(args) => rewrite::run(args, cli).map(|_| ExitCode::SUCCESS),
        Commands::Transform(args) => transform::run(args, cli).map(|_| ExitCode::SUCCESS),
        Commands::Build(args) => build::run(args, cli).map(|_| ExitCode::SUCCESS),
        Commands::Run(args) => run::run(args, cli),
        Commands::Hooks => hooks::run(cli).map(|_| ExitCode::SUCCESS),
    }
}

/// `--config` if given, else the nearest `tsen.toml` above `dir`.
pub fn load_config(cli: &Cli, dir: &Path) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let config = Config::discover(dir)?;
            debug!(dir = %dir.display(), "configuration resolved");
            Ok(config)
        }
    }
}

/// Read a file, or stdin for `-` or no argument. Returns the file path when
/// one was read.
pub fn read_input(file: Option<&Path>) -> Result<(String, Option<PathBuf>)> {
    match file {
        Some(path) if path != Path::new("-") => {
            let code = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok((code, Some(path.to_path_buf())))
        }
        _ => {
            if file.is_none() && atty::is(atty::Stream::Stdin) {
                bail!("no input: pass a file, or `-` to read stdin");
            }
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .context("failed to read stdin")?;
            Ok((code, None))
        }
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("cannot determine the current directory")
}
