// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fachory Print — destination registry, print-job lifecycle, and document
// streaming over a print spooler.  The spooler itself sits behind the
// `Spooler` trait: `CupsSpooler` talks IPP to a CUPS scheduler,
// `MemorySpooler` records calls for tests and dry runs.

pub mod cups;
pub mod job;
pub mod manager;
pub mod memory;
pub mod options;
pub mod registry;
pub mod spooler;
pub mod staging;
pub mod stream;

pub use cups::CupsSpooler;
pub use job::{JobOutcome, PrintJob};
pub use manager::PrinterManager;
pub use memory::MemorySpooler;
pub use options::OptionSet;
pub use registry::{DestinationRegistry, ResolvedDestination};
pub use spooler::{DestinationDescriptor, DestinationEvent, Spooler};
pub use staging::StagingFile;
pub use stream::DocumentStreamer;
