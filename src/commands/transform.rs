// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

use crate::cli::{Cli, TransformArgs};

pub fn run(args: &TransformArgs, cli: &Cli) -> Result<()> {
    let (code, file) = super::read_input(args.file.as_deref())?;
    let path = file.unwrap_or_else(|| {
        PathBuf::from(format!("stdin.{}", args.ext.trim_start_matches('.')))
    });
    let config = super::load_config(cli, &super::current_dir()?)?;
    let registry = config.build_registry()?;

    let output = if registry.matches(&path) {
        registry.apply(&path, &code)?
    } else {
        warn!("no hook applies to {}, output unchanged", path.display());
        code
    };

    match &args.output {
        Some(out) => std::fs::write(out, output)
            .with_context(|| format!("failed to write {}", out.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
