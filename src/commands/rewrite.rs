// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

use anyhow::Result;
use std::io::Write;
use tsen_hook::DynamicImportRewriter;

use crate::cli::{Cli, RewriteArgs};

pub fn run(args: &RewriteArgs, cli: &Cli) -> Result<()> {
    let (code, _) = super::read_input(args.file.as_deref())?;
    let config = super::load_config(cli, &super::current_dir()?)?;
    let rewriter = DynamicImportRewriter::new(config.rewrite.suffix);

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rewriter.rewrite(&code).as_bytes())?;
    stdout.flush()?;
    Ok(())
}
