// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line schema.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Print to-do checklists and documents through the local print spooler.
#[derive(Parser, Debug)]
#[command(name = "fachory", version, about)]
pub struct Cli {
    /// Route printing through an in-memory spooler instead of CUPS.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Destination offered by the in-memory spooler; repeatable, the first
    /// is the default.
    #[arg(long = "printer", global = true, value_name = "NAME")]
    pub printers: Vec<String>,

    /// Use this directory for configuration and the task database.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List print destinations; `*` marks the default.
    Printers,
    /// Print a PDF file.
    PrintPdf { printer: String, path: PathBuf },
    /// Print a JPEG image.
    PrintJpeg { printer: String, path: PathBuf },
    /// Print a PNG image.
    PrintPng { printer: String, path: PathBuf },
    /// Print a file, choosing the format from its extension.
    Print { printer: String, path: PathBuf },
    /// Send a file to the printer unprocessed.
    PrintRaw { printer: String, path: PathBuf },
    /// Print a line of text.
    PrintText { printer: String, text: String },
    /// List pending tasks.
    Tasks,
    /// List completed tasks.
    Completed,
    /// Add a pending task.
    Add {
        name: String,
        #[arg(long, short, default_value = "")]
        description: String,
    },
    /// Mark a pending task done.
    Done {
        id: String,
        #[arg(long, short)]
        comment: Option<String>,
    },
    /// Print the pending tasks as a checklist.
    PrintTasks { printer: String },
}

impl Command {
    /// Whether the command needs a print spooler.
    pub fn prints(&self) -> bool {
        matches!(
            self,
            Command::Printers
                | Command::PrintPdf { .. }
                | Command::PrintJpeg { .. }
                | Command::PrintPng { .. }
                | Command::Print { .. }
                | Command::PrintRaw { .. }
                | Command::PrintText { .. }
                | Command::PrintTasks { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_print_pdf() {
        let cli = Cli::try_parse_from(["fachory", "print-pdf", "terow", "./memes/cat.pdf"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::PrintPdf {
                printer: "terow".into(),
                path: PathBuf::from("./memes/cat.pdf"),
            }
        );
        assert!(!cli.dry_run);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "fachory", "print-tasks", "terow", "--dry-run", "--printer", "terow", "--printer", "desk1",
        ])
        .expect("parse");
        assert!(cli.dry_run);
        assert_eq!(cli.printers, vec!["terow", "desk1"]);
        assert!(cli.command.prints());
    }

    #[test]
    fn add_takes_an_optional_description() {
        let cli = Cli::try_parse_from(["fachory", "add", "Do chore", "-d", "dishes"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Add {
                name: "Do chore".into(),
                description: "dishes".into(),
            }
        );
        assert!(!cli.command.prints());
    }

    #[test]
    fn parses_print_with_inferred_format() {
        let cli = Cli::try_parse_from(["fachory", "print", "terow", "shopping.png"]).expect("parse");
        assert_eq!(
            cli.command,
            Command::Print {
                printer: "terow".into(),
                path: PathBuf::from("shopping.png"),
            }
        );
        assert!(cli.command.prints());
    }

    #[test]
    fn missing_printer_is_rejected() {
        assert!(Cli::try_parse_from(["fachory", "print-text"]).is_err());
    }
}
