// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory spooler.
//
// Keeps a destination snapshot and a log of every call it receives.  Used
// for `--dry-run` printing and as the spooler in tests, where individual
// operations can be made to fail.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use fachory_core::error::{FachoryError, Result};
use fachory_core::types::DocumentFormat;

use crate::options::OptionSet;
use crate::spooler::{DestinationDescriptor, DestinationEvent, Spooler};

const POISONED: &str = "memory spooler state poisoned";

/// One recorded spooler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpoolerCall {
    Enumerate,
    CapabilityInfo {
        destination: String,
    },
    ReleaseInfo {
        destination: String,
    },
    CreateJob {
        destination: String,
        job_name: String,
        options: OptionSet,
    },
    StartDocument {
        destination: String,
        job_id: i32,
        document_name: String,
        format: DocumentFormat,
        last_document: bool,
    },
    Write {
        data: Vec<u8>,
    },
    FinishDocument {
        destination: String,
    },
    CancelJob {
        destination: String,
        job_id: i32,
    },
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Enumerate,
    CapabilityInfo,
    CreateJob,
    StartDocument,
    Write,
    FinishDocument,
}

/// Capability descriptor handed out by [`MemorySpooler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryInfo {
    pub destination: String,
}

#[derive(Debug, Default)]
struct State {
    destinations: Vec<DestinationDescriptor>,
    reported: Vec<DestinationDescriptor>,
    injected: Vec<DestinationEvent>,
    calls: Vec<SpoolerCall>,
    failing: HashSet<Operation>,
    next_job_id: i32,
    open_document: bool,
    last_error: String,
}

/// Spooler that lives entirely in memory and records every call.
#[derive(Debug, Default)]
pub struct MemorySpooler {
    state: Mutex<State>,
}

impl MemorySpooler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`add_destination`](Self::add_destination).
    pub fn with_destination(self, dest: DestinationDescriptor) -> Self {
        self.add_destination(dest);
        self
    }

    /// Make `dest` part of the next enumeration snapshot.
    pub fn add_destination(&self, dest: DestinationDescriptor) {
        if let Ok(mut state) = self.lock() {
            let key = dest.qualified_name();
            state.destinations.retain(|d| d.qualified_name() != key);
            state.destinations.push(dest);
        }
    }

    /// Drop `name` from the snapshot; the next enumeration reports it removed.
    pub fn remove_destination(&self, name: &str) {
        if let Ok(mut state) = self.lock() {
            state.destinations.retain(|d| d.qualified_name() != name);
        }
    }

    /// Deliver `event` verbatim with the next enumeration.
    pub fn inject_event(&self, event: DestinationEvent) {
        if let Ok(mut state) = self.lock() {
            state.injected.push(event);
        }
    }

    /// Make `op` fail until [`succeed`](Self::succeed) is called.
    pub fn fail(&self, op: Operation) {
        if let Ok(mut state) = self.lock() {
            state.failing.insert(op);
        }
    }

    pub fn succeed(&self, op: Operation) {
        if let Ok(mut state) = self.lock() {
            state.failing.remove(&op);
        }
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<SpoolerCall> {
        self.lock().map(|state| state.calls.clone()).unwrap_or_default()
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&SpoolerCall) -> bool) -> usize {
        self.lock()
            .map(|state| state.calls.iter().filter(|c| pred(c)).count())
            .unwrap_or(0)
    }

    pub fn clear_calls(&self) {
        if let Ok(mut state) = self.lock() {
            state.calls.clear();
        }
    }

    /// Concatenation of every byte written so far.
    pub fn written(&self) -> Vec<u8> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        state
            .calls
            .iter()
            .filter_map(|c| match c {
                SpoolerCall::Write { data } => Some(data.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| FachoryError::Spooler(POISONED.into()))
    }

    /// Record `call`, then fail with `message` if `op` is marked failing.
    fn record(&self, call: SpoolerCall, op: Operation, message: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.calls.push(call);
        if state.failing.contains(&op) {
            state.last_error = message.to_owned();
            warn!(?op, "memory spooler rejecting call");
            return Err(FachoryError::Spooler(message.to_owned()));
        }
        Ok(())
    }
}

impl Spooler for MemorySpooler {
    type Info = MemoryInfo;

    fn enumerate_destinations(&self, _timeout: Duration) -> Result<Vec<DestinationEvent>> {
        self.record(
            SpoolerCall::Enumerate,
            Operation::Enumerate,
            "scheduler unavailable",
        )?;

        let mut state = self.lock()?;
        let current: HashSet<String> = state
            .destinations
            .iter()
            .map(DestinationDescriptor::qualified_name)
            .collect();

        let mut events: Vec<DestinationEvent> = state
            .reported
            .iter()
            .filter(|d| !current.contains(&d.qualified_name()))
            .cloned()
            .map(DestinationEvent::Removed)
            .collect();
        events.extend(state.destinations.iter().cloned().map(DestinationEvent::Added));
        events.append(&mut state.injected);

        state.reported = state.destinations.clone();
        debug!(count = events.len(), "memory spooler enumerated destinations");
        Ok(events)
    }

    fn capability_info(&self, dest: &DestinationDescriptor) -> Result<MemoryInfo> {
        let destination = dest.qualified_name();
        self.record(
            SpoolerCall::CapabilityInfo {
                destination: destination.clone(),
            },
            Operation::CapabilityInfo,
            "printer did not answer the attribute request",
        )?;
        Ok(MemoryInfo { destination })
    }

    fn release_capability_info(&self, info: MemoryInfo) {
        if let Ok(mut state) = self.lock() {
            state.calls.push(SpoolerCall::ReleaseInfo {
                destination: info.destination,
            });
        }
    }

    fn create_job(
        &self,
        dest: &DestinationDescriptor,
        _info: &MemoryInfo,
        job_name: &str,
        options: &OptionSet,
    ) -> Result<i32> {
        self.record(
            SpoolerCall::CreateJob {
                destination: dest.qualified_name(),
                job_name: job_name.to_owned(),
                options: options.clone(),
            },
            Operation::CreateJob,
            "client-error-not-possible",
        )?;
        let mut state = self.lock()?;
        state.next_job_id += 1;
        Ok(state.next_job_id)
    }

    fn start_document(
        &self,
        dest: &DestinationDescriptor,
        _info: &MemoryInfo,
        job_id: i32,
        document_name: &str,
        format: DocumentFormat,
        _options: &OptionSet,
        last_document: bool,
    ) -> Result<()> {
        self.record(
            SpoolerCall::StartDocument {
                destination: dest.qualified_name(),
                job_id,
                document_name: document_name.to_owned(),
                format,
                last_document,
            },
            Operation::StartDocument,
            "client-error-document-format-not-supported",
        )?;
        self.lock()?.open_document = true;
        Ok(())
    }

    fn write_document_data(&self, data: &[u8]) -> Result<()> {
        self.record(
            SpoolerCall::Write {
                data: data.to_vec(),
            },
            Operation::Write,
            "connection reset while sending document",
        )?;
        let mut state = self.lock()?;
        if !state.open_document {
            state.last_error = "no document open".into();
            return Err(FachoryError::Spooler("no document open".into()));
        }
        Ok(())
    }

    fn finish_document(&self, dest: &DestinationDescriptor, _info: &MemoryInfo) -> Result<()> {
        self.lock()?.open_document = false;
        self.record(
            SpoolerCall::FinishDocument {
                destination: dest.qualified_name(),
            },
            Operation::FinishDocument,
            "server-error-job-canceled",
        )
    }

    fn cancel_job(&self, destination_name: &str, job_id: i32) -> Result<()> {
        let mut state = self.lock()?;
        state.open_document = false;
        state.calls.push(SpoolerCall::CancelJob {
            destination: destination_name.to_owned(),
            job_id,
        });
        Ok(())
    }

    fn last_error_message(&self) -> String {
        match self.lock() {
            Ok(state) => state.last_error.clone(),
            Err(_) => POISONED.into(),
        }
    }
}
