// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spooler backed by the local CUPS scheduler, spoken to over IPP.
//
// Operations used:
//   - CUPS-Get-Printers       destination enumeration
//   - Get-Printer-Attributes  capability info
//   - Create-Job              job creation, with the option set as job
//                             template attributes
//   - Send-Document           one per finished document
//   - Cancel-Job
//
// A document opened with `start_document` is buffered until
// `finish_document`, which sends it as a single Send-Document request.  The
// `ipp` client is async; every call is driven to completion on a private
// current-thread Tokio runtime so the spooler stays blocking.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use ipp::prelude::*;
use tokio::runtime::Runtime;
use tracing::{debug, info, instrument, warn};

use fachory_core::config::AppConfig;
use fachory_core::error::{FachoryError, Result};
use fachory_core::types::DocumentFormat;

use crate::options::{OptionSet, ORIENTATION_REQUESTED};
use crate::spooler::{DestinationDescriptor, DestinationEvent, Spooler};

/// `printer-type` bit CUPS sets on the default destination.
const CUPS_PRINTER_DEFAULT: i32 = 0x20000;

/// Timeout for per-job requests (attributes, create, send, cancel).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Printer attributes copied into a destination's stored options.
const DESTINATION_OPTION_KEYS: &[&str] = &[
    "printer-info",
    "printer-location",
    "printer-make-and-model",
    "printer-state",
    "device-uri",
];

/// Send `$op` to `$uri` on the spooler's runtime, bounded by `$timeout`, and
/// yield the response if its status is successful.  Failures are recorded as
/// the last error.
macro_rules! send {
    ($spooler:expr, $what:expr, $uri:expr, $timeout:expr, $op:expr) => {{
        let spooler = $spooler;
        let what = $what;
        let client = AsyncIppClient::new($uri);
        let timeout = $timeout;
        let operation = $op;
        match spooler
            .runtime
            .block_on(async { tokio::time::timeout(timeout, client.send(operation)).await })
        {
            Err(_) => Err(spooler.fail(format!("{what}: timed out"))),
            Ok(Err(e)) => Err(spooler.fail(format!("{what}: {e}"))),
            Ok(Ok(response)) => {
                let code = response.header().status_code();
                if code.is_success() {
                    Ok(response)
                } else {
                    Err(spooler.fail(format!("{what} returned status {code:?}")))
                }
            }
        }
    }};
}

/// Capability info for one CUPS queue.
#[derive(Debug, Clone)]
pub struct CupsInfo {
    pub printer_uri: Uri,
    /// Flattened Get-Printer-Attributes response.
    pub attributes: HashMap<String, String>,
}

/// A document between `start_document` and `finish_document`.
#[derive(Debug)]
struct OpenDocument {
    printer_uri: Uri,
    job_id: i32,
    name: String,
    format: DocumentFormat,
    last_document: bool,
    data: Vec<u8>,
}

/// Blocking spooler over the CUPS IPP endpoint.
pub struct CupsSpooler {
    /// Scheduler base, e.g. `ipp://localhost:631`, without trailing slash.
    base: String,
    scheduler_uri: Uri,
    runtime: Runtime,
    /// Destinations reported by the previous enumeration, by qualified name.
    reported: Mutex<HashMap<String, DestinationDescriptor>>,
    document: Mutex<Option<OpenDocument>>,
    last_error: Mutex<String>,
}

impl CupsSpooler {
    /// Create a spooler for the scheduler at `base_uri`.
    pub fn new(base_uri: &str) -> Result<Self> {
        let base = base_uri.trim_end_matches('/').to_owned();
        let scheduler_uri: Uri = format!("{base}/")
            .parse()
            .map_err(|e| FachoryError::Config(format!("invalid spooler URI '{base_uri}': {e}")))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            base,
            scheduler_uri,
            runtime,
            reported: Mutex::new(HashMap::new()),
            document: Mutex::new(None),
            last_error: Mutex::new(String::new()),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.spooler_uri)
    }

    /// `ipp://host:631/printers/<name>`
    pub fn printer_uri(&self, name: &str) -> Result<Uri> {
        printer_uri(&self.base, name).map_err(|e| self.fail(e))
    }

    /// Record `message` as the last error and wrap it.
    fn fail(&self, message: String) -> FachoryError {
        warn!(%message, "spooler request failed");
        if let Ok(mut last) = self.last_error.lock() {
            *last = message.clone();
        }
        FachoryError::Spooler(message)
    }

    /// Lock `mutex`, failing with a spooler error if a panicking thread
    /// poisoned it.
    fn lock<'a, T>(&self, mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
        mutex
            .lock()
            .map_err(|_| self.fail(format!("{what} state poisoned")))
    }
}

impl Spooler for CupsSpooler {
    type Info = CupsInfo;

    #[instrument(skip(self), fields(scheduler = %self.scheduler_uri))]
    fn enumerate_destinations(&self, timeout: Duration) -> Result<Vec<DestinationEvent>> {
        let operation = IppOperationBuilder::cups().get_printers();

        debug!("sending CUPS-Get-Printers");
        let response = send!(self, "CUPS-Get-Printers", self.scheduler_uri.clone(), timeout, operation)?;

        let current = parse_printers(response.attributes());
        let mut reported = self.lock(&self.reported, "destination")?;

        let mut events: Vec<DestinationEvent> = reported
            .iter()
            .filter(|(name, _)| !current.iter().any(|d| &d.qualified_name() == *name))
            .map(|(_, d)| DestinationEvent::Removed(d.clone()))
            .collect();
        events.extend(current.iter().cloned().map(DestinationEvent::Added));

        *reported = current
            .into_iter()
            .map(|d| (d.qualified_name(), d))
            .collect();

        debug!(count = events.len(), "received destination events");
        Ok(events)
    }

    #[instrument(skip(self, dest), fields(printer = %dest.name))]
    fn capability_info(&self, dest: &DestinationDescriptor) -> Result<CupsInfo> {
        let printer_uri = self.printer_uri(&dest.name)?;
        let operation = IppOperationBuilder::get_printer_attributes(printer_uri.clone()).build();

        debug!("sending Get-Printer-Attributes");
        let response = send!(
            self,
            "Get-Printer-Attributes",
            printer_uri.clone(),
            REQUEST_TIMEOUT,
            operation
        )?;

        let attributes = flatten_attributes(response.attributes());
        debug!(count = attributes.len(), "received printer attributes");
        Ok(CupsInfo {
            printer_uri,
            attributes,
        })
    }

    #[instrument(skip(self, dest, info, options), fields(printer = %dest.name))]
    fn create_job(
        &self,
        dest: &DestinationDescriptor,
        info: &CupsInfo,
        job_name: &str,
        options: &OptionSet,
    ) -> Result<i32> {
        let mut builder = IppOperationBuilder::create_job(info.printer_uri.clone()).attribute(
            IppAttribute::new("job-name", IppValue::NameWithoutLanguage(job_name.into())),
        );
        // Descriptive printer attributes merged in from the destination are
        // not job template attributes.
        for (key, value) in options.iter().filter(|(k, _)| !DESTINATION_OPTION_KEYS.contains(k)) {
            builder = builder.attribute(IppAttribute::new(key, option_value(key, value)));
        }

        let response = send!(
            self,
            "Create-Job",
            info.printer_uri.clone(),
            REQUEST_TIMEOUT,
            builder.build()
        )?;

        let job_id = extract_job_id(response.attributes())
            .ok_or_else(|| self.fail("Create-Job response missing job-id attribute".into()))?;
        info!(job_id, "job accepted by scheduler");
        Ok(job_id)
    }

    fn start_document(
        &self,
        dest: &DestinationDescriptor,
        info: &CupsInfo,
        job_id: i32,
        document_name: &str,
        format: DocumentFormat,
        _options: &OptionSet,
        last_document: bool,
    ) -> Result<()> {
        if job_id <= 0 {
            return Err(self.fail(format!("invalid job id {job_id} for {}", dest.name)));
        }

        let mut document = self.lock(&self.document, "document")?;
        if let Some(open) = document.as_ref() {
            let message = format!("document '{}' of job {} is still open", open.name, open.job_id);
            drop(document);
            return Err(self.fail(message));
        }

        debug!(printer = %dest.name, job_id, document = document_name, %format, "document opened");
        *document = Some(OpenDocument {
            printer_uri: info.printer_uri.clone(),
            job_id,
            name: document_name.to_owned(),
            format,
            last_document,
            data: Vec::new(),
        });
        Ok(())
    }

    fn write_document_data(&self, data: &[u8]) -> Result<()> {
        let mut document = self.lock(&self.document, "document")?;
        match document.as_mut() {
            Some(open) => {
                open.data.extend_from_slice(data);
                Ok(())
            }
            None => {
                drop(document);
                Err(self.fail("no document open for writing".into()))
            }
        }
    }

    #[instrument(skip(self, dest, _info), fields(printer = %dest.name))]
    fn finish_document(&self, dest: &DestinationDescriptor, _info: &CupsInfo) -> Result<()> {
        let open = self
            .lock(&self.document, "document")?
            .take()
            .ok_or_else(|| self.fail("no document open to finish".into()))?;

        debug!(
            job_id = open.job_id,
            bytes = open.data.len(),
            format = %open.format,
            last = open.last_document,
            "sending Send-Document"
        );

        let payload = IppPayload::new(Cursor::new(open.data));
        let operation = IppOperationBuilder::send_document(open.printer_uri.clone(), open.job_id, payload)
            .document_format(open.format.mime_type())
            .last(open.last_document)
            .build();
        send!(self, "Send-Document", open.printer_uri, REQUEST_TIMEOUT, operation)?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn cancel_job(&self, destination_name: &str, job_id: i32) -> Result<()> {
        // Whatever was buffered for this job is discarded.
        let mut document = self.lock(&self.document, "document")?;
        if document.as_ref().is_some_and(|d| d.job_id == job_id) {
            *document = None;
        }
        drop(document);

        let printer_uri = self.printer_uri(destination_name)?;
        let operation = IppOperationBuilder::cancel_job(printer_uri.clone(), job_id).build();

        info!(job_id, "sending Cancel-Job");
        send!(
            self,
            format!("Cancel-Job({job_id})"),
            printer_uri,
            REQUEST_TIMEOUT,
            operation
        )?;
        Ok(())
    }

    fn last_error_message(&self) -> String {
        match self.last_error.lock() {
            Ok(last) => last.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn printer_uri(base: &str, name: &str) -> std::result::Result<Uri, String> {
    format!("{base}/printers/{name}")
        .parse()
        .map_err(|e| format!("invalid printer URI for '{name}': {e}"))
}

/// IPP value for a job option: `orientation-requested` is an enum, every
/// other option a keyword.
fn option_value(key: &str, value: &str) -> IppValue {
    match value.parse::<i32>() {
        Ok(n) if key == ORIENTATION_REQUESTED => IppValue::Enum(n),
        _ => IppValue::Keyword(value.into()),
    }
}

fn integer_value(value: &IppValue) -> Option<i32> {
    match value {
        IppValue::Integer(n) | IppValue::Enum(n) => Some(*n),
        _ => None,
    }
}

/// One descriptor per Printer Attributes group of a CUPS-Get-Printers
/// response.  Groups without a `printer-name` are skipped.
fn parse_printers(attrs: &IppAttributes) -> Vec<DestinationDescriptor> {
    let mut printers = Vec::new();

    for group in attrs.groups_of(DelimiterTag::PrinterAttributes) {
        let attributes = group.attributes();

        let Some(name) = attributes
            .get("printer-name")
            .map(|a| format!("{}", a.value()))
        else {
            continue;
        };

        let is_default = attributes
            .get("printer-type")
            .and_then(|a| integer_value(a.value()))
            .is_some_and(|t| t & CUPS_PRINTER_DEFAULT != 0);

        let mut descriptor = DestinationDescriptor::new(name).with_default(is_default);
        for key in DESTINATION_OPTION_KEYS {
            if let Some(attr) = attributes.get(*key) {
                descriptor = descriptor.with_option(*key, format!("{}", attr.value()));
            }
        }
        printers.push(descriptor);
    }

    printers
}

/// Flatten all attribute groups into a single name → value map.
fn flatten_attributes(attrs: &IppAttributes) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for group in attrs.groups() {
        for (name, attr) in group.attributes() {
            map.insert(name.clone(), format!("{}", attr.value()));
        }
    }
    map
}

/// Extract `job-id` from the Job Attributes group.
fn extract_job_id(attrs: &IppAttributes) -> Option<i32> {
    attrs
        .groups_of(DelimiterTag::JobAttributes)
        .filter_map(|group| group.attributes().get("job-id"))
        .find_map(|attr| integer_value(attr.value()))
}
