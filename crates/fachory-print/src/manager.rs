// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer manager, the entry point of the print core.
//
// Owns a spooler and the destination registry it feeds.  A print request
// resolves the destination, builds the job options, creates a job, streams
// the document, and settles the job: cancelled when the document stream is
// rejected, finalized otherwise.  `submit*` methods return the typed error;
// `print_*` methods log it and return `false`.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use fachory_core::config::AppConfig;
use fachory_core::error::{FachoryError, Result};
use fachory_core::types::{Destination, DocumentFormat};

use crate::job::{JobOutcome, PrintJob};
use crate::options::OptionSet;
use crate::registry::DestinationRegistry;
use crate::spooler::{DestinationDescriptor, Spooler};
use crate::staging::StagingFile;
use crate::stream::DocumentStreamer;

/// Registry plus document submission over a single spooler.
pub struct PrinterManager<S: Spooler> {
    spooler: S,
    registry: DestinationRegistry<S::Info>,
    config: AppConfig,
}

impl<S: Spooler> PrinterManager<S> {
    /// Create a manager and populate the registry from the spooler.
    ///
    /// A failed initial enumeration is logged and leaves the registry empty;
    /// call [`refresh`](Self::refresh) to retry.
    pub fn new(spooler: S, config: AppConfig) -> Self {
        let mut manager = Self {
            spooler,
            registry: DestinationRegistry::new(),
            config,
        };
        if let Err(e) = manager.refresh() {
            error!(error = %e, "initial destination enumeration failed");
        }
        manager
    }

    /// Re-enumerate destinations; returns how many are registered.
    pub fn refresh(&mut self) -> Result<usize> {
        let timeout = Duration::from_millis(self.config.enumeration_timeout_ms);
        self.registry.enumerate(&self.spooler, timeout)
    }

    /// Register a destination outside of enumeration.
    pub fn add_printer(&mut self, descriptor: DestinationDescriptor) -> bool {
        self.registry.add(&self.spooler, descriptor)
    }

    /// Deregister a destination; unknown names are ignored.
    pub fn remove_printer(&mut self, descriptor: &DestinationDescriptor) -> bool {
        self.registry.remove(&self.spooler, descriptor)
    }

    /// Names of all known destinations.
    pub fn printers(&self) -> Vec<String> {
        self.registry.list()
    }

    pub fn destination(&self, name: &str) -> Option<&Destination> {
        self.registry.destination(name)
    }

    pub fn default_printer(&self) -> Option<&Destination> {
        self.registry.default_destination()
    }

    pub fn spooler(&self) -> &S {
        &self.spooler
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Print `data` on `printer` as one document.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub fn submit(
        &self,
        printer: &str,
        document_name: &str,
        data: &[u8],
        format: DocumentFormat,
    ) -> Result<()> {
        let destination = self.registry.query(printer)?;
        let options = OptionSet::for_destination(&self.config.print, destination.descriptor);

        let mut job = PrintJob::create(&self.spooler, destination, &self.config.job_name, &options);
        if !job.is_created() {
            return Err(FachoryError::JobCreationFailed {
                destination: printer.to_owned(),
                reason: self.spooler.last_error_message(),
            });
        }

        let streamer = DocumentStreamer::new(&self.spooler, destination);
        if self.config.raw_reset {
            // A failed reset is logged by the streamer; the payload still goes out.
            let _ = streamer.reset(job.id(), &options);
        }

        if let Err(e) = streamer.stream(job.id(), document_name, format, &options, data) {
            if matches!(e, FachoryError::DocumentStartFailed { .. }) {
                job.cancel();
            }
            let outcome = job.dispose();
            debug!(?outcome, "job settled after failed transfer");
            return Err(e);
        }

        match job.dispose() {
            JobOutcome::FinalizeFailed(reason) => Err(FachoryError::FinalizeFailed {
                destination: printer.to_owned(),
                reason,
            }),
            outcome => {
                debug!(?outcome, "job settled");
                Ok(())
            }
        }
    }

    /// Print the file at `path`.
    pub fn submit_file(&self, printer: &str, path: &Path, format: DocumentFormat) -> Result<()> {
        let data = std::fs::read(path).inspect_err(|e| {
            error!(path = %path.display(), error = %e, "could not open file for printing");
        })?;
        self.submit(printer, &path.display().to_string(), &data, format)
    }

    /// Print the file at `path`, inferring its format from the extension.
    pub fn submit_path(&self, printer: &str, path: &Path) -> Result<()> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(DocumentFormat::from_extension)
            .ok_or_else(|| FachoryError::UnsupportedFormat(path.display().to_string()))?;
        debug!(path = %path.display(), %format, "inferred document format");
        self.submit_file(printer, path, format)
    }

    /// Stage `text` in a temporary file and print it raw.  The staging file
    /// is gone when this returns.
    pub fn submit_text(&self, printer: &str, text: &str) -> Result<()> {
        let staged = StagingFile::create(text)?;
        self.submit_file(printer, staged.path(), DocumentFormat::Raw)
    }

    /// Print a file with the given format; `true` on success.
    pub fn print_file(&self, printer: &str, path: &Path, format: DocumentFormat) -> bool {
        report(
            self.submit_file(printer, path, format),
            printer,
            &path.display().to_string(),
        )
    }

    pub fn print_pdf(&self, printer: &str, path: &Path) -> bool {
        self.print_file(printer, path, DocumentFormat::Pdf)
    }

    pub fn print_jpeg(&self, printer: &str, path: &Path) -> bool {
        self.print_file(printer, path, DocumentFormat::Jpeg)
    }

    pub fn print_png(&self, printer: &str, path: &Path) -> bool {
        self.print_file(printer, path, DocumentFormat::Png)
    }

    /// Print a file whose format follows from its extension.
    pub fn print_path(&self, printer: &str, path: &Path) -> bool {
        report(
            self.submit_path(printer, path),
            printer,
            &path.display().to_string(),
        )
    }

    pub fn print_text(&self, printer: &str, text: &str) -> bool {
        report(self.submit_text(printer, text), printer, "text")
    }

    /// Print in-memory bytes; `true` on success.
    pub fn print_bytes(
        &self,
        printer: &str,
        document_name: &str,
        data: &[u8],
        format: DocumentFormat,
    ) -> bool {
        report(
            self.submit(printer, document_name, data, format),
            printer,
            document_name,
        )
    }
}

impl<S: Spooler> Drop for PrinterManager<S> {
    fn drop(&mut self) {
        self.registry.clear(&self.spooler);
    }
}

fn report(result: Result<()>, printer: &str, document: &str) -> bool {
    match result {
        Ok(()) => {
            info!(printer, document, "document printed");
            true
        }
        Err(e @ FachoryError::FinalizeFailed { .. }) => {
            warn!(printer, document, error = %e, "document sent but job did not complete");
            false
        }
        Err(e) => {
            error!(printer, document, error = %e, "failed to print");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemorySpooler, Operation, SpoolerCall};
    use crate::stream::RESET_SEQUENCE;

    fn manager_with(names: &[&str], config: AppConfig) -> PrinterManager<MemorySpooler> {
        let spooler = MemorySpooler::new();
        for name in names {
            spooler.add_destination(DestinationDescriptor::new(*name));
        }
        let manager = PrinterManager::new(spooler, config);
        manager.spooler().clear_calls();
        manager
    }

    fn count(manager: &PrinterManager<MemorySpooler>, f: fn(&SpoolerCall) -> bool) -> usize {
        manager.spooler().count(f)
    }

    fn is_create(c: &SpoolerCall) -> bool {
        matches!(c, SpoolerCall::CreateJob { .. })
    }
    fn is_start(c: &SpoolerCall) -> bool {
        matches!(c, SpoolerCall::StartDocument { .. })
    }
    fn is_write(c: &SpoolerCall) -> bool {
        matches!(c, SpoolerCall::Write { .. })
    }
    fn is_finish(c: &SpoolerCall) -> bool {
        matches!(c, SpoolerCall::FinishDocument { .. })
    }
    fn is_cancel(c: &SpoolerCall) -> bool {
        matches!(c, SpoolerCall::CancelJob { .. })
    }

    #[test]
    fn raw_print_on_known_destination_makes_one_call_of_each_kind() {
        let manager = manager_with(&["desk1"], AppConfig::default());

        assert!(manager.print_bytes("desk1", "payload", b"hello\n", DocumentFormat::Raw));

        assert_eq!(count(&manager, is_create), 1);
        assert_eq!(count(&manager, is_start), 1);
        assert_eq!(count(&manager, is_write), 1);
        assert_eq!(count(&manager, is_finish), 1);
        assert_eq!(count(&manager, is_cancel), 0);
        assert_eq!(manager.spooler().written(), b"hello\n");
    }

    #[test]
    fn unknown_destination_never_reaches_spooler() {
        let manager = manager_with(&["desk1"], AppConfig::default());

        assert!(!manager.print_bytes("ghost", "payload", b"hello", DocumentFormat::Raw));
        assert!(manager.spooler().calls().is_empty());
        assert!(matches!(
            manager.submit("ghost", "payload", b"hello", DocumentFormat::Raw),
            Err(FachoryError::DestinationNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn rejected_document_start_cancels_job() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        manager.spooler().fail(Operation::StartDocument);

        assert!(!manager.print_bytes("desk1", "payload", b"hello", DocumentFormat::Raw));
        assert_eq!(count(&manager, is_cancel), 1);
        assert_eq!(count(&manager, is_finish), 0);
        assert_eq!(count(&manager, is_write), 0);
    }

    #[test]
    fn failed_job_creation_reports_and_skips_settlement() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        manager.spooler().fail(Operation::CreateJob);

        let err = manager
            .submit("desk1", "payload", b"hello", DocumentFormat::Raw)
            .expect_err("creation fails");
        assert!(matches!(err, FachoryError::JobCreationFailed { .. }));
        assert_eq!(count(&manager, is_start), 0);
        assert_eq!(count(&manager, is_finish), 0);
        assert_eq!(count(&manager, is_cancel), 0);
    }

    #[test]
    fn failed_write_still_finalizes_job() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        manager.spooler().fail(Operation::Write);

        let err = manager
            .submit("desk1", "payload", b"hello", DocumentFormat::Raw)
            .expect_err("write fails");
        assert!(matches!(err, FachoryError::WriteFailed { .. }));
        assert_eq!(count(&manager, is_finish), 1);
        assert_eq!(count(&manager, is_cancel), 0);
    }

    #[test]
    fn finalize_failure_turns_print_into_failure() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        manager.spooler().fail(Operation::FinishDocument);

        assert!(matches!(
            manager.submit("desk1", "payload", b"hello", DocumentFormat::Raw),
            Err(FachoryError::FinalizeFailed { .. })
        ));
        assert!(!manager.print_bytes("desk1", "payload", b"hello", DocumentFormat::Raw));
    }

    #[test]
    fn raw_reset_precedes_payload() {
        let config = AppConfig {
            raw_reset: true,
            ..AppConfig::default()
        };
        let manager = manager_with(&["desk1"], config);

        assert!(manager.print_bytes("desk1", "payload", b"hello", DocumentFormat::Raw));

        let mut expected = RESET_SEQUENCE.to_vec();
        expected.extend_from_slice(b"hello");
        assert_eq!(manager.spooler().written(), expected);
        assert_eq!(count(&manager, is_start), 2);
        assert_eq!(count(&manager, is_finish), 2);
        assert_eq!(count(&manager, is_create), 1);
    }

    #[test]
    fn job_uses_configured_name_and_default_options() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        assert!(manager.print_bytes("desk1", "payload", b"x", DocumentFormat::Raw));

        let calls = manager.spooler().calls();
        let Some(SpoolerCall::CreateJob {
            job_name, options, ..
        }) = calls.first()
        else {
            panic!("first call should create the job, got {calls:?}");
        };
        assert_eq!(job_name, "fachory");
        assert_eq!(options.get("media"), Some("Roll80mm"));
        assert_eq!(options.get("sides"), Some("one-sided"));
        assert_eq!(options.get("orientation-requested"), Some("3"));
    }

    #[test]
    fn format_wrappers_report_success_as_true() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf = dir.path().join("cat.pdf");
        let jpeg = dir.path().join("cat.jpg");
        std::fs::write(&pdf, b"%PDF-1.7").expect("write pdf");
        std::fs::write(&jpeg, [0xFF, 0xD8, 0xFF]).expect("write jpeg");

        assert!(manager.print_pdf("desk1", &pdf));
        assert!(manager.print_jpeg("desk1", &jpeg));
        assert!(manager.print_text("desk1", "[ ] Do chore"));

        let formats: Vec<_> = manager
            .spooler()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                SpoolerCall::StartDocument { format, .. } => Some(format),
                _ => None,
            })
            .collect();
        assert_eq!(
            formats,
            vec![DocumentFormat::Pdf, DocumentFormat::Jpeg, DocumentFormat::Raw]
        );
    }

    #[test]
    fn format_wrappers_report_failure_as_false() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        let dir = tempfile::tempdir().expect("tempdir");

        assert!(!manager.print_pdf("desk1", &dir.path().join("missing.pdf")));
        assert!(!manager.print_jpeg("ghost", &dir.path().join("missing.jpg")));
        assert!(!manager.print_text("ghost", "[ ] Do chore"));
        assert!(manager.spooler().calls().is_empty());
    }

    fn staged_path(manager: &PrinterManager<MemorySpooler>) -> std::path::PathBuf {
        manager
            .spooler()
            .calls()
            .into_iter()
            .find_map(|c| match c {
                SpoolerCall::StartDocument { document_name, .. } => Some(document_name.into()),
                _ => None,
            })
            .expect("document was started")
    }

    #[test]
    fn text_is_staged_and_cleaned_up() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        let text = "\n[ ] Going to the Gym\n[ ] Eat fazenda";

        assert!(manager.print_text("desk1", text));
        assert_eq!(manager.spooler().written(), text.as_bytes());
        assert!(!staged_path(&manager).exists());
    }

    #[test]
    fn staging_file_removed_when_write_fails() {
        let manager = manager_with(&["desk1"], AppConfig::default());
        manager.spooler().fail(Operation::Write);

        assert!(!manager.print_text("desk1", "[ ] Do Work"));
        assert!(!staged_path(&manager).exists());
    }

    #[test]
    fn refresh_tracks_spooler_changes() {
        let mut manager = manager_with(&["desk1", "desk2"], AppConfig::default());
        manager.spooler().remove_destination("desk2");

        assert_eq!(manager.refresh().expect("refresh"), 1);
        assert_eq!(manager.printers(), vec!["desk1".to_owned()]);
        assert!(!manager.print_bytes("desk2", "payload", b"x", DocumentFormat::Raw));
    }

    #[test]
    fn manual_add_and_remove() {
        let mut manager = manager_with(&[], AppConfig::default());
        assert!(manager.printers().is_empty());

        assert!(manager.add_printer(DestinationDescriptor::new("label").with_default(true)));
        assert_eq!(manager.default_printer().map(|d| d.name.as_str()), Some("label"));
        assert!(manager.print_bytes("label", "payload", b"x", DocumentFormat::Raw));

        assert!(manager.remove_printer(&DestinationDescriptor::new("label")));
        assert!(manager.destination("label").is_none());
    }

    #[test]
    fn failed_initial_enumeration_leaves_registry_empty() {
        let spooler = MemorySpooler::new().with_destination(DestinationDescriptor::new("desk1"));
        spooler.fail(Operation::Enumerate);
        let mut manager = PrinterManager::new(spooler, AppConfig::default());
        assert!(manager.printers().is_empty());

        manager.spooler().succeed(Operation::Enumerate);
        assert_eq!(manager.refresh().expect("refresh"), 1);
    }

    #[test]
    fn unknown_extension_is_rejected_before_any_job() {
        let manager = manager_with(&["desk1"], AppConfig::default());

        let result = manager.submit_path("desk1", Path::new("notes.docx"));

        assert!(matches!(result, Err(FachoryError::UnsupportedFormat(_))));
        assert!(manager.spooler().calls().is_empty());
    }

    #[test]
    fn png_is_declared_to_the_spooler() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("Receipt.PNG");
        std::fs::write(&path, b"\x89PNG").expect("write image");
        let manager = manager_with(&["desk1"], AppConfig::default());

        assert!(manager.print_path("desk1", &path));
        assert!(manager.spooler().calls().iter().any(|c| matches!(
            c,
            SpoolerCall::StartDocument {
                format: DocumentFormat::Png,
                ..
            }
        )));
    }
}
