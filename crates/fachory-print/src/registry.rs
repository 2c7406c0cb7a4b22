// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Destination registry: the in-process cache of print destinations.
//
// Destinations live in an arena addressed by integer index.  The name→index
// map is the only lookup path.  Removing a destination marks its slot empty,
// releases its capability descriptor back to the spooler, and compacts the
// arena, rebuilding the map so every name keeps pointing at a live slot.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use fachory_core::error::{FachoryError, Result};
use fachory_core::types::Destination;

use crate::spooler::{DestinationDescriptor, DestinationEvent, Spooler};

/// One registered destination.
#[derive(Debug)]
struct Entry<I> {
    descriptor: DestinationDescriptor,
    destination: Destination,
    info: I,
}

/// A destination resolved for printing: its descriptor plus capability info.
#[derive(Debug)]
pub struct ResolvedDestination<'a, I> {
    pub name: &'a str,
    pub descriptor: &'a DestinationDescriptor,
    pub info: &'a I,
}

// Manual impls: `I` itself need not be `Clone`/`Copy`.
impl<I> Clone for ResolvedDestination<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for ResolvedDestination<'_, I> {}

/// Cache of known destinations, keyed by `name` or `name/instance`.
///
/// Generic over the spooler's capability descriptor type `I`.  Mutating
/// methods take `&mut self`, so enumeration is serialized by the borrow
/// checker; share a registry across threads only behind a single `Mutex`.
#[derive(Debug)]
pub struct DestinationRegistry<I> {
    /// Arena of entries; `None` marks a slot awaiting compaction.
    entries: Vec<Option<Entry<I>>>,
    /// Qualified name → arena index.
    index: HashMap<String, usize>,
}

impl<I> Default for DestinationRegistry<I> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<I> DestinationRegistry<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the spooler for its destination snapshot and apply every event.
    ///
    /// Returns once all events have been applied.  Returns the number of
    /// destinations registered afterwards.  A failed enumeration leaves the
    /// registry untouched.
    #[instrument(skip_all)]
    pub fn enumerate<S>(&mut self, spooler: &S, timeout: Duration) -> Result<usize>
    where
        S: Spooler<Info = I>,
    {
        let events = spooler.enumerate_destinations(timeout)?;
        debug!(events = events.len(), "applying destination events");

        for event in events {
            match event {
                DestinationEvent::Added(descriptor) => {
                    self.insert(spooler, descriptor, true);
                }
                DestinationEvent::Removed(descriptor) => {
                    self.remove(spooler, &descriptor);
                }
            }
        }

        info!(count = self.len(), "destination registry refreshed");
        Ok(self.len())
    }

    /// Register a destination.  Returns `true` if a new entry was created.
    ///
    /// Invalid descriptors and names that are already registered are logged
    /// and ignored, as is a destination whose capability descriptor cannot
    /// be fetched.
    pub fn add<S>(&mut self, spooler: &S, descriptor: DestinationDescriptor) -> bool
    where
        S: Spooler<Info = I>,
    {
        self.insert(spooler, descriptor, false)
    }

    /// Every enumeration re-reports known destinations, so duplicates seen
    /// there are expected and only logged at debug level.
    fn insert<S>(&mut self, spooler: &S, descriptor: DestinationDescriptor, enumerated: bool) -> bool
    where
        S: Spooler<Info = I>,
    {
        if !descriptor.is_valid() {
            error!("invalid destination for added printer, skipping");
            return false;
        }

        let name = descriptor.qualified_name();
        if self.index.contains_key(&name) {
            if enumerated {
                debug!(printer = %name, "destination already registered");
            } else {
                warn!(printer = %name, "destination already registered, not added");
            }
            return false;
        }

        let info = match spooler.capability_info(&descriptor) {
            Ok(info) => info,
            Err(e) => {
                error!(
                    printer = %name,
                    error = %e,
                    detail = %spooler.last_error_message(),
                    "could not fetch destination info, skipping"
                );
                return false;
            }
        };

        info!(printer = %name, "registering printer");
        let destination = descriptor.to_destination();
        self.entries.push(Some(Entry {
            descriptor,
            destination,
            info,
        }));
        self.index.insert(name, self.entries.len() - 1);
        true
    }

    /// Deregister a destination.  Returns `true` if an entry was removed.
    ///
    /// Unknown names are a silent no-op so that duplicate removal events are
    /// harmless.
    pub fn remove<S>(&mut self, spooler: &S, descriptor: &DestinationDescriptor) -> bool
    where
        S: Spooler<Info = I>,
    {
        if !descriptor.is_valid() {
            error!("invalid destination for removed printer, skipping");
            return false;
        }

        let name = descriptor.qualified_name();
        let Some(slot) = self.index.remove(&name) else {
            debug!(printer = %name, "removal of unknown printer ignored");
            return false;
        };

        info!(printer = %name, "deregistering printer");
        if let Some(entry) = self.entries.get_mut(slot).and_then(Option::take) {
            spooler.release_capability_info(entry.info);
        }
        self.compact();
        true
    }

    /// Resolve `name` to its descriptor and capability info.
    pub fn query(&self, name: &str) -> Result<ResolvedDestination<'_, I>> {
        let entry = self
            .index
            .get_key_value(name)
            .and_then(|(key, &slot)| {
                self.entries
                    .get(slot)
                    .and_then(Option::as_ref)
                    .map(|entry| (key.as_str(), entry))
            });

        match entry {
            Some((name, entry)) => Ok(ResolvedDestination {
                name,
                descriptor: &entry.descriptor,
                info: &entry.info,
            }),
            None => Err(FachoryError::DestinationNotFound(name.to_owned())),
        }
    }

    /// Cached record for `name`.
    pub fn destination(&self, name: &str) -> Option<&Destination> {
        let slot = *self.index.get(name)?;
        self.entries
            .get(slot)?
            .as_ref()
            .map(|entry| &entry.destination)
    }

    /// The destination flagged as default, if any.
    pub fn default_destination(&self) -> Option<&Destination> {
        self.live().map(|e| &e.destination).find(|d| d.is_default)
    }

    /// Names of all registered destinations, in no particular order.
    pub fn list(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Drop every destination, handing capability info back to the spooler.
    pub fn clear<S>(&mut self, spooler: &S)
    where
        S: Spooler<Info = I>,
    {
        self.index.clear();
        for entry in self.entries.drain(..).flatten() {
            spooler.release_capability_info(entry.info);
        }
    }

    fn live(&self) -> impl Iterator<Item = &Entry<I>> {
        self.entries.iter().flatten()
    }

    /// Squeeze out empty slots and re-point the map at the new positions.
    fn compact(&mut self) {
        self.entries.retain(Option::is_some);
        self.index = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| {
                entry
                    .as_ref()
                    .map(|e| (e.descriptor.qualified_name(), slot))
            })
            .collect();
    }
}
