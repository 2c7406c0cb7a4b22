// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command handlers.  Each returns whether it succeeded; `main` turns that
// into the exit status.

use fachory_core::error::Result;
use fachory_core::types::DocumentFormat;
use fachory_print::{CupsSpooler, DestinationDescriptor, MemorySpooler, PrinterManager, Spooler};
use tracing::{error, info};

use crate::cli::{Cli, Command};
use crate::services::app_services::AppServices;

/// Run `cli.command` against `services`.
pub fn run(cli: &Cli, services: &AppServices) -> bool {
    if !cli.command.prints() {
        return match run_task_command(&cli.command, services) {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "task command failed");
                false
            }
        };
    }

    let config = services.config().clone();
    if cli.dry_run {
        let manager = PrinterManager::new(dry_run_spooler(&cli.printers), config);
        return run_print_command(&manager, &cli.command, services);
    }

    match CupsSpooler::from_config(&config) {
        Ok(spooler) => run_print_command(&PrinterManager::new(spooler, config), &cli.command, services),
        Err(e) => {
            error!(error = %e, "could not reach the print spooler");
            false
        }
    }
}

/// An in-memory spooler advertising one destination per name, the first
/// being the default.
pub fn dry_run_spooler(printers: &[String]) -> MemorySpooler {
    let spooler = MemorySpooler::new();
    for (i, name) in printers.iter().enumerate() {
        spooler.add_destination(DestinationDescriptor::new(name.as_str()).with_default(i == 0));
    }
    spooler
}

fn run_task_command(command: &Command, services: &AppServices) -> Result<bool> {
    match command {
        Command::Tasks => {
            for task in services.pending_tasks()? {
                println!("{}  {}  {}", task.id, task.created_at.format("%Y-%m-%d %H:%M"), task.name);
                if !task.description.is_empty() {
                    println!("    {}", task.description);
                }
            }
            Ok(true)
        }
        Command::Completed => {
            for done in services.completed_tasks()? {
                println!(
                    "{}  {}  {}",
                    done.task.id,
                    done.completed_at.format("%Y-%m-%d %H:%M"),
                    done.task.name
                );
                if let Some(comments) = done.comments.as_deref() {
                    println!("    {comments}");
                }
            }
            Ok(true)
        }
        Command::Add { name, description } => {
            let task = services.add_task(name, description)?;
            println!("{}", task.id);
            Ok(true)
        }
        Command::Done { id, comment } => {
            let done = services.mark_task_done(id, comment.as_deref())?;
            if !done {
                error!(task_id = %id, "no pending task with that id");
            }
            Ok(done)
        }
        _ => Ok(false),
    }
}

/// Run a printing command through `manager`.
pub fn run_print_command<S: Spooler>(
    manager: &PrinterManager<S>,
    command: &Command,
    services: &AppServices,
) -> bool {
    match command {
        Command::Printers => {
            print!("{}", printer_listing(manager));
            true
        }
        Command::PrintPdf { printer, path } => manager.print_pdf(printer, path),
        Command::PrintJpeg { printer, path } => manager.print_jpeg(printer, path),
        Command::PrintPng { printer, path } => manager.print_png(printer, path),
        Command::PrintRaw { printer, path } => manager.print_file(printer, path, DocumentFormat::Raw),
        Command::Print { printer, path } => manager.print_path(printer, path),
        Command::PrintText { printer, text } => manager.print_text(printer, text),
        Command::PrintTasks { printer } => match services.checklist() {
            Ok(checklist) if checklist.is_empty() => {
                info!("no pending tasks to print");
                true
            }
            Ok(checklist) => manager.print_text(printer, &checklist),
            Err(e) => {
                error!(error = %e, "could not load pending tasks");
                false
            }
        },
        _ => false,
    }
}

/// One destination per line, sorted, `*` before the default.
pub fn printer_listing<S: Spooler>(manager: &PrinterManager<S>) -> String {
    let default = manager.default_printer().map(|d| d.qualified_name());
    let mut names = manager.printers();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let marker = if default.as_deref() == Some(name.as_str()) { '*' } else { ' ' };
            format!("{marker} {name}\n")
        })
        .collect()
}
