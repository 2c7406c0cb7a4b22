// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fachory — print to-do checklists and documents through the local print
// spooler.
//
// Entry point. Initialises logging, parses the command line, opens the task
// database, and dispatches to the command handlers.

mod cli;
mod commands;
mod services;

use std::process::ExitCode;

use clap::Parser;

use cli::Cli;
use services::app_services::AppServices;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, dry_run = cli.dry_run, "fachory starting");

    let services = match AppServices::init(cli.data_dir.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "persistent storage failed, using in-memory fallback");
            match AppServices::fallback() {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "fallback storage failed");
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    tracing::debug!(data_dir = %services.data_dir().display(), "services ready");

    if commands::run(&cli, &services) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
