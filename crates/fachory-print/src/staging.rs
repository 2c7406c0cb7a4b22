// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staging files for in-memory text.
//
// Text without a backing file is written to a uniquely named temporary file
// so it can travel the same path as file-based documents.  The file is
// deleted when the `StagingFile` is dropped, whatever happened in between.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use fachory_core::error::Result;

const PREFIX: &str = "fachory-";
const SUFFIX: &str = ".txt";

/// A temporary file holding staged text, removed on drop.
#[derive(Debug)]
pub struct StagingFile {
    file: NamedTempFile,
}

impl StagingFile {
    /// Stage `contents` in the system temporary directory.
    pub fn create(contents: &str) -> Result<Self> {
        Self::create_in(std::env::temp_dir(), contents)
    }

    /// Stage `contents` in `dir`.
    pub fn create_in(dir: impl AsRef<Path>, contents: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(PREFIX)
            .suffix(SUFFIX)
            .tempfile_in(dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        debug!(path = %file.path().display(), bytes = contents.len(), "staged text");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_content_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let text = "[ ] Going to the Gym\n[ ] Do chore\nüñí\n";
        let staged = StagingFile::create_in(dir.path(), text).expect("stage");

        let read_back = std::fs::read(staged.path()).expect("read");
        assert_eq!(read_back, text.as_bytes());
    }

    #[test]
    fn file_is_removed_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staged = StagingFile::create_in(dir.path(), "hello").expect("stage");
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = StagingFile::create_in(dir.path(), "a").expect("stage a");
        let b = StagingFile::create_in(dir.path(), "b").expect("stage b");
        assert_ne!(a.path(), b.path());
        let name = a.path().file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with(PREFIX) && name.ends_with(SUFFIX));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = StagingFile::create_in(dir.path().join("nope"), "x");
        assert!(matches!(result, Err(fachory_core::FachoryError::Io(_))));
    }
}
