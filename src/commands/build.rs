// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

use anyhow::Result;
use owo_colors::OwoColorize;
use tsen_hook::compile_dir;

use crate::cli::{BuildArgs, Cli};

pub fn run(args: &BuildArgs, cli: &Cli) -> Result<()> {
    let config = super::load_config(cli, &args.src)?;
    let registry = config.build_registry()?;
    let report = compile_dir(&registry, &args.src, &args.out_dir)?;

    println!(
        "{} {} files into {} ({} transformed, {} copied)",
        "Built".green().bold(),
        report.total(),
        args.out_dir.display().cyan(),
        report.transformed,
        report.copied
    );
    Ok(())
}
