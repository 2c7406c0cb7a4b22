// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Fachory.

use thiserror::Error;

/// Top-level error type for all Fachory operations.
///
/// Print errors carry the destination name and, where the spooler supplied
/// one, its last-error text so that the log line at the call boundary is
/// self-contained.
#[derive(Debug, Error)]
pub enum FachoryError {
    // -- Destination registry --
    #[error("printer {0} is not registered")]
    DestinationNotFound(String),

    // -- Job lifecycle --
    #[error("unable to create job for printer {destination}: {reason}")]
    JobCreationFailed { destination: String, reason: String },

    #[error("unable to start the document for printer {destination}: {reason}")]
    DocumentStartFailed { destination: String, reason: String },

    #[error("could not write document to printer {destination}: {reason}")]
    WriteFailed { destination: String, reason: String },

    #[error("job failed for printer {destination}: {reason}")]
    FinalizeFailed { destination: String, reason: String },

    #[error("no document format known for {0}")]
    UnsupportedFormat(String),

    // -- Spooler transport --
    #[error("spooler request failed: {0}")]
    Spooler(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("invalid task id: {0}")]
    InvalidTaskId(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FachoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_errors_name_the_printer_and_reason() {
        let err = FachoryError::DocumentStartFailed {
            destination: "desk1".into(),
            reason: "client-error-document-format-not-supported".into(),
        };
        let text = err.to_string();
        assert!(text.contains("desk1"));
        assert!(text.contains("document-format-not-supported"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FachoryError = io.into();
        assert!(matches!(err, FachoryError::Io(_)));
    }
}
