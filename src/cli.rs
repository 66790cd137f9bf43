// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command line interface for tsen.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tsen - run and build TypeScript through load-time hooks
#[derive(Parser, Debug)]
#[command(name = "tsen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: nearest tsen.toml)
    #[arg(short, long, global = true, env = "TSEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rewrite dynamic `import()` of TypeScript files to `require()`
    Rewrite(RewriteArgs),

    /// Run the configured hooks over one file
    Transform(TransformArgs),

    /// Compile a directory tree
    Build(BuildArgs),

    /// Compile and execute an entry file with node
    Run(RunArgs),

    /// List the configured hooks
    Hooks,
}

#[derive(Args, Debug)]
pub struct RewriteArgs {
    /// Input file, `-` for stdin
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Input file, `-` for stdin
    pub file: Option<PathBuf>,

    /// Extension used to pick hooks for stdin input
    #[arg(long, default_value = "ts")]
    pub ext: String,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Source directory
    pub src: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "dist")]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Entry file
    pub entry: PathBuf,

    /// Node executable
    #[arg(long, env = "TSEN_NODE", default_value = "node")]
    pub node: String,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
