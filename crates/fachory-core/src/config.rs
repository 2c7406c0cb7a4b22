// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{DuplexMode, Orientation, PaperSize};

/// Default job options applied to every print request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintDefaults {
    pub paper_size: PaperSize,
    pub duplex: DuplexMode,
    pub orientation: Orientation,
    /// Roll media keyword for receipt printers (e.g. `Roll80mm`).  When set
    /// it replaces the paper-size `media` value.
    pub roll_media: Option<String>,
}

impl Default for PrintDefaults {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::Letter,
            duplex: DuplexMode::Simplex,
            orientation: Orientation::Portrait,
            roll_media: Some("Roll80mm".into()),
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URI of the local print scheduler.
    pub spooler_uri: String,
    /// How long destination enumeration may wait for the scheduler.
    pub enumeration_timeout_ms: u64,
    /// Job name shown in the printer queue.
    pub job_name: String,
    /// Send `ESC @` ahead of every payload to clear the printer state.
    pub raw_reset: bool,
    pub print: PrintDefaults,
    /// Task database file name inside the data directory.
    pub database_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            spooler_uri: "ipp://localhost:631".into(),
            enumeration_timeout_ms: 1000,
            job_name: "fachory".into(),
            raw_reset: false,
            print: PrintDefaults::default(),
            database_file: "tasks.db".into(),
        }
    }
}

impl AppConfig {
    /// Load the configuration from `path`, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring malformed config");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
        }
    }

    /// Write the configuration to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
