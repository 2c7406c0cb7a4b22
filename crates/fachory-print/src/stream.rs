// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document streamer.
//
// Opens a document inside an existing job with a declared format, writes the
// whole payload in one transfer, and leaves closing the stream to the job's
// disposal.  Raw-mode printers can first be sent the `ESC @` initialisation
// sequence as a separate, non-final document.

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use fachory_core::error::{FachoryError, Result};
use fachory_core::types::DocumentFormat;

use crate::options::OptionSet;
use crate::registry::ResolvedDestination;
use crate::spooler::Spooler;

/// `ESC @`: clears the printer's state on ESC/POS devices.
pub const RESET_SEQUENCE: &[u8] = b"\x1b\x40";

/// Name of the document carrying [`RESET_SEQUENCE`].
const RESET_DOCUMENT: &str = "init";

/// Streams documents to one destination.
pub struct DocumentStreamer<'a, S: Spooler> {
    spooler: &'a S,
    destination: ResolvedDestination<'a, S::Info>,
}

impl<'a, S: Spooler> DocumentStreamer<'a, S> {
    pub fn new(spooler: &'a S, destination: ResolvedDestination<'a, S::Info>) -> Self {
        Self {
            spooler,
            destination,
        }
    }

    /// Send the reset sequence as its own raw, non-final document.
    ///
    /// Failures are logged and returned; callers may carry on with the
    /// real payload.
    pub fn reset(&self, job_id: i32, options: &OptionSet) -> Result<()> {
        let dest = self.destination;
        self.spooler
            .start_document(
                dest.descriptor,
                dest.info,
                job_id,
                RESET_DOCUMENT,
                DocumentFormat::Raw,
                options,
                false,
            )
            .and_then(|()| self.spooler.write_document_data(RESET_SEQUENCE))
            .and_then(|()| self.spooler.finish_document(dest.descriptor, dest.info))
            .inspect_err(|e| {
                warn!(printer = %dest.name, job_id, error = %e, "printer reset failed");
            })
    }

    /// Open the final document of `job_id` and write `data` in one transfer.
    ///
    /// Maps a rejected stream start to `DocumentStartFailed` and a rejected
    /// write to `WriteFailed`, both carrying the spooler's last-error text.
    #[instrument(skip(self, options, data), fields(printer = %self.destination.name, bytes = data.len()))]
    pub fn stream(
        &self,
        job_id: i32,
        document_name: &str,
        format: DocumentFormat,
        options: &OptionSet,
        data: &[u8],
    ) -> Result<()> {
        let dest = self.destination;

        self.spooler
            .start_document(
                dest.descriptor,
                dest.info,
                job_id,
                document_name,
                format,
                options,
                true,
            )
            .map_err(|_| FachoryError::DocumentStartFailed {
                destination: dest.name.to_owned(),
                reason: self.spooler.last_error_message(),
            })?;

        debug!(sha256 = %fingerprint(data), %format, "writing document");

        self.spooler
            .write_document_data(data)
            .map_err(|_| FachoryError::WriteFailed {
                destination: dest.name.to_owned(),
                reason: self.spooler.last_error_message(),
            })
    }
}

/// SHA-256 of `data` as lowercase hex, for log correlation.
pub fn fingerprint(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
