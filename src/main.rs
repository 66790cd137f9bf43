// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! tsen - run and build TypeScript through load-time hooks
//!
//! This is the main entry point for the tsen binary.
//!
//! ## Commands
//!
//! - `tsen rewrite`: the bare `import()` rewrite filter
//! - `tsen transform`: run the configured hooks over one file
//! - `tsen build`: compile a directory tree
//! - `tsen run`: compile an entry's directory and execute it with node
//! - `tsen hooks`: list the configured hooks

mod cli;
mod commands;

use clap::Parser;
use owo_colors::OwoColorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match commands::dispatch(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), error_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// The error and each cause not already spelled out by the message before it.
fn error_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        let cause = cause.to_string();
        if !message.contains(&cause) {
            message = format!("{message}: {cause}");
        }
    }
    message
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "tsen=debug,tsen_hook=debug"
    } else {
        "tsen=warn,tsen_hook=warn"
    };
    let filter = EnvFilter::try_from_env("TSEN_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::Path;
    use tsen_hook::HookError;

    #[test]
    fn test_error_message_names_each_cause_once() {
        let syntax = HookError::syntax("let s = 'open", 8, "Unterminated string literal");
        let error = Err::<(), _>(syntax.in_file(Path::new("bad.ts")))
            .context("failed to transform")
            .unwrap_err();

        let message = error_message(&error);
        assert_eq!(message.matches("SyntaxError").count(), 1, "{message}");
        assert!(message.starts_with("failed to transform: Failed to transform 'bad.ts'"));
    }

    #[test]
    fn test_error_message_keeps_io_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let error = Err::<(), _>(io).context("failed to read a.ts").unwrap_err();
        assert_eq!(error_message(&error), "failed to read a.ts: No such file");
    }
}
