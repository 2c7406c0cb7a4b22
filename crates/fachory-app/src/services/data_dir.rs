// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use fachory_core::error::Result;

/// Return the application data directory, creating it if needed.
///
/// `override_dir` wins when given; otherwise `$XDG_DATA_HOME/fachory`, then
/// `$HOME/.local/share/fachory`.
pub fn data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => base_dir(
            std::env::var("XDG_DATA_HOME").ok(),
            std::env::var("HOME").ok(),
        )
        .join("fachory"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn base_dir(xdg_data_home: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(xdg) = xdg_data_home.filter(|s| !s.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = home.filter(|s| !s.is_empty()) {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    std::env::temp_dir()
}
