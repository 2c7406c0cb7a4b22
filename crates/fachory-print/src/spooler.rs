// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The print-spooler capability surface consumed by the print core.
//
// A spooler enumerates destinations, hands out a per-destination capability
// descriptor, and runs the create-job / start-document / write /
// finish-document sequence.  Every call is blocking.  `cups::CupsSpooler`
// talks to the local CUPS scheduler; `memory::MemorySpooler` records calls
// in memory for dry runs and tests.

use std::time::Duration;

use fachory_core::error::Result;
use fachory_core::types::{Destination, DocumentFormat, qualified_name};

use crate::options::OptionSet;

/// A destination exactly as the spooler reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDescriptor {
    pub name: String,
    pub instance: Option<String>,
    pub is_default: bool,
    /// Options stored on the destination, in spooler order.
    pub options: Vec<(String, String)>,
}

impl DestinationDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
            is_default: false,
            options: Vec::new(),
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Registry key: `name` or `name/instance`.
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.name, self.instance.as_deref())
    }

    /// A descriptor without a usable name cannot be registered.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Snapshot of this descriptor as the public `Destination` record.
    pub fn to_destination(&self) -> Destination {
        Destination {
            name: self.name.clone(),
            instance: self.instance.clone().filter(|i| !i.is_empty()),
            is_default: self.is_default,
            options: self.options.iter().cloned().collect(),
        }
    }
}

/// One entry of an enumeration snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationEvent {
    Added(DestinationDescriptor),
    Removed(DestinationDescriptor),
}

/// Blocking interface to a print spooler.
///
/// Methods take `&self`; implementations that keep per-document state use
/// interior mutability.  Failed calls return `Err` and leave a human-readable
/// explanation in [`Spooler::last_error_message`].
pub trait Spooler {
    /// Per-destination capability descriptor required to start jobs.
    type Info;

    /// Report the current destination snapshot.  Destinations that vanished
    /// since the previous call are reported as [`DestinationEvent::Removed`].
    fn enumerate_destinations(&self, timeout: Duration) -> Result<Vec<DestinationEvent>>;

    /// Fetch the capability descriptor for a destination.
    fn capability_info(&self, dest: &DestinationDescriptor) -> Result<Self::Info>;

    /// Hand a capability descriptor back to the spooler.
    fn release_capability_info(&self, info: Self::Info) {
        drop(info);
    }

    /// Register a new job; returns the spooler-assigned job id.
    fn create_job(
        &self,
        dest: &DestinationDescriptor,
        info: &Self::Info,
        job_name: &str,
        options: &OptionSet,
    ) -> Result<i32>;

    /// Open a document stream inside a job.
    #[allow(clippy::too_many_arguments)]
    fn start_document(
        &self,
        dest: &DestinationDescriptor,
        info: &Self::Info,
        job_id: i32,
        document_name: &str,
        format: DocumentFormat,
        options: &OptionSet,
        last_document: bool,
    ) -> Result<()>;

    /// Append bytes to the open document stream.
    fn write_document_data(&self, data: &[u8]) -> Result<()>;

    /// Close the open document stream and submit it.
    fn finish_document(&self, dest: &DestinationDescriptor, info: &Self::Info) -> Result<()>;

    /// Cancel a job by destination name and id.
    fn cancel_job(&self, destination_name: &str, job_id: i32) -> Result<()>;

    /// Text of the most recent spooler failure.
    fn last_error_message(&self) -> String;
}
