// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job controller.
//
// A `PrintJob` registers a job with the spooler and settles it exactly once:
// either explicitly through `dispose`, which returns the outcome, or when
// the value is dropped.  A cancelled job is cancelled on the spooler; any
// other job has its document finalized.  A job that never obtained an id
// (id 0) touches the spooler neither way.

use tracing::{error, info, warn};

use crate::options::OptionSet;
use crate::registry::ResolvedDestination;
use crate::spooler::Spooler;

/// How a job was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The document was finalized.
    Finished,
    /// The finalize request failed; carries the spooler's error text.
    FinalizeFailed(String),
    /// The job was cancelled on the spooler.
    Cancelled,
    /// Creation failed, there was nothing to settle.
    NotCreated,
}

/// A job against one destination.
pub struct PrintJob<'a, S: Spooler> {
    spooler: &'a S,
    destination: ResolvedDestination<'a, S::Info>,
    job_id: i32,
    cancelled: bool,
    settled: bool,
}

impl<'a, S: Spooler> PrintJob<'a, S> {
    /// Ask the spooler to create a job.  On failure the job is returned with
    /// id 0; check [`is_created`](Self::is_created).
    pub fn create(
        spooler: &'a S,
        destination: ResolvedDestination<'a, S::Info>,
        job_name: &str,
        options: &OptionSet,
    ) -> Self {
        let job_id = match spooler.create_job(destination.descriptor, destination.info, job_name, options) {
            Ok(id) if id > 0 => {
                info!(printer = %destination.name, job_id = id, "job created");
                id
            }
            Ok(id) => {
                error!(printer = %destination.name, job_id = id, "spooler returned an invalid job id");
                0
            }
            Err(e) => {
                error!(
                    printer = %destination.name,
                    error = %e,
                    "unable to create job: {}",
                    spooler.last_error_message()
                );
                0
            }
        };

        Self {
            spooler,
            destination,
            job_id,
            cancelled: false,
            settled: false,
        }
    }

    /// Spooler-assigned id; 0 when creation failed.
    pub fn id(&self) -> i32 {
        self.job_id
    }

    pub fn is_created(&self) -> bool {
        self.job_id != 0
    }

    pub fn printer_name(&self) -> &str {
        self.destination.name
    }

    /// The destination this job was created against.
    pub fn destination(&self) -> ResolvedDestination<'a, S::Info> {
        self.destination
    }

    /// Mark the job for cancellation.  Acted upon at disposal only.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Settle the job now and report how.
    pub fn dispose(mut self) -> JobOutcome {
        self.settle()
    }

    fn settle(&mut self) -> JobOutcome {
        self.settled = true;

        if !self.is_created() {
            return JobOutcome::NotCreated;
        }

        let printer = self.destination.name;

        if self.cancelled {
            if let Err(e) = self
                .spooler
                .cancel_job(&self.destination.descriptor.name, self.job_id)
            {
                warn!(printer = %printer, job_id = self.job_id, error = %e, "cancel request failed");
            }
            info!(printer = %printer, job_id = self.job_id, "job cancelled");
            return JobOutcome::Cancelled;
        }

        match self
            .spooler
            .finish_document(self.destination.descriptor, self.destination.info)
        {
            Ok(()) => {
                info!(printer = %printer, job_id = self.job_id, "job succeeded");
                JobOutcome::Finished
            }
            Err(e) => {
                let reason = self.spooler.last_error_message();
                error!(printer = %printer, job_id = self.job_id, error = %e, "job failed: {reason}");
                JobOutcome::FinalizeFailed(reason)
            }
        }
    }
}

impl<S: Spooler> Drop for PrintJob<'_, S> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle();
        }
    }
}
