// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::Cli;

pub fn run(cli: &Cli) -> Result<()> {
    let config = super::load_config(cli, &super::current_dir()?)?;
    let registry = config.build_registry()?;

    for (id, options, description) in registry.entries() {
        print!(
            "{} {} {}",
            id.dimmed(),
            options.extensions.join(", ").cyan(),
            description
        );
        if !options.ignore_node_modules {
            print!(" (including node_modules)");
        }
        if !options.ignore.is_empty() {
            let patterns: Vec<&str> = options.ignore.iter().map(|p| p.as_str()).collect();
            print!(" ignoring {}", patterns.join(", "));
        }
        println!();
    }
    Ok(())
}
