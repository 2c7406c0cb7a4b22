// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Fachory: print destinations, document formats, the
// option keywords the spooler understands, and the tasks we print.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Build the lookup key for a destination: `name` for the primary instance,
/// `name/instance` for a named instance (the `lpstat` convention).
pub fn qualified_name(name: &str, instance: Option<&str>) -> String {
    match instance {
        Some(instance) if !instance.is_empty() => format!("{name}/{instance}"),
        _ => name.to_owned(),
    }
}

/// A print destination as cached by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    /// Instance qualifier; `None` for the primary instance.
    pub instance: Option<String>,
    pub is_default: bool,
    /// Options stored on the destination (e.g. `printer-location`).
    pub options: BTreeMap<String, String>,
}

impl Destination {
    /// Key under which this destination is registered.
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.name, self.instance.as_deref())
    }
}

/// Document formats the streamer can declare to the spooler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Bytes passed through to the device untouched (ESC/POS text etc.).
    Raw,
    Pdf,
    Jpeg,
    Png,
}

impl DocumentFormat {
    /// MIME type declared as the IPP `document-format` of each document
    /// sent to the spooler.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Raw => "application/vnd.cups-raw",
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "txt" | "raw" | "prn" => Some(Self::Raw),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
}

impl PaperSize {
    /// PWG `media` keyword for this paper size.
    pub fn media_keyword(&self) -> &'static str {
        match self {
            Self::A4 => "iso_a4_210x297mm",
            Self::A3 => "iso_a3_297x420mm",
            Self::A5 => "iso_a5_148x210mm",
            Self::Letter => "na_letter_8.5x11in",
            Self::Legal => "na_legal_8.5x14in",
        }
    }
}

/// Duplex printing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplexMode {
    Simplex,
    LongEdge,
    ShortEdge,
}

impl DuplexMode {
    /// `sides` keyword.
    pub fn sides_keyword(&self) -> &'static str {
        match self {
            Self::Simplex => "one-sided",
            Self::LongEdge => "two-sided-long-edge",
            Self::ShortEdge => "two-sided-short-edge",
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
    ReversePortrait,
    ReverseLandscape,
}

impl Orientation {
    /// `orientation-requested` enum value (RFC 8011 §5.2.10).
    pub fn enum_value(&self) -> i32 {
        match self {
            Self::Portrait => 3,
            Self::Landscape => 4,
            Self::ReversePortrait => 5,
            Self::ReverseLandscape => 6,
        }
    }
}

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A task waiting to be done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(name: String, description: String) -> Self {
        Self {
            id: TaskId::new(),
            name,
            description,
            created_at: Utc::now(),
        }
    }
}

/// A task that has been marked done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub task: Task,
    pub comments: Option<String>,
    pub completed_at: DateTime<Utc>,
}
