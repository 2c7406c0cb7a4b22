// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for destination enumeration, registry lookup, option
// resolution, and a full dry-run submission in the fachory-print crate.

use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use fachory_core::config::{AppConfig, PrintDefaults};
use fachory_print::memory::MemoryInfo;
use fachory_print::stream::fingerprint;
use fachory_print::{DestinationDescriptor, DestinationRegistry, MemorySpooler, OptionSet, PrinterManager};

const TIMEOUT: Duration = Duration::from_millis(10);

/// A spooler advertising `count` destinations, `desk0` being the default.
fn spooler_with(count: usize) -> MemorySpooler {
    let spooler = MemorySpooler::new();
    for i in 0..count {
        spooler.add_destination(
            DestinationDescriptor::new(format!("desk{i}"))
                .with_default(i == 0)
                .with_option("printer-location", "office"),
        );
    }
    spooler
}

/// Benchmark enumerating 64 destinations into an empty registry.
fn bench_enumerate(c: &mut Criterion) {
    c.bench_function("registry_enumerate (64 destinations)", |b| {
        b.iter(|| {
            let spooler = spooler_with(64);
            let mut registry: DestinationRegistry<MemoryInfo> = DestinationRegistry::new();
            let added = registry.enumerate(&spooler, TIMEOUT).expect("enumerate");
            black_box(added);
        });
    });
}

/// Benchmark name lookups, hits and misses.
fn bench_query(c: &mut Criterion) {
    let spooler = spooler_with(64);
    let mut registry: DestinationRegistry<MemoryInfo> = DestinationRegistry::new();
    registry.enumerate(&spooler, TIMEOUT).expect("enumerate");

    c.bench_function("registry_query (hit)", |b| {
        b.iter(|| {
            let dest = registry.query(black_box("desk42")).expect("query");
            black_box(dest);
        });
    });

    c.bench_function("registry_query (miss)", |b| {
        b.iter(|| {
            let result = registry.query(black_box("missing"));
            assert!(result.is_err());
        });
    });
}

/// Benchmark resolving defaults merged with destination options.
fn bench_options(c: &mut Criterion) {
    let defaults = PrintDefaults::default();
    let dest = DestinationDescriptor::new("desk1")
        .with_option("media", "A4")
        .with_option("printer-info", "Front desk");

    c.bench_function("option_set_for_destination", |b| {
        b.iter(|| {
            let options = OptionSet::for_destination(black_box(&defaults), black_box(&dest));
            black_box(options);
        });
    });
}

/// Benchmark a dry-run text submission, staging file included.
fn bench_submit_text(c: &mut Criterion) {
    let manager = PrinterManager::new(spooler_with(4), AppConfig::default());
    let text = "[ ] Going to the Gym\n[ ] Do chore\n".repeat(16);

    c.bench_function("submit_text (dry run)", |b| {
        b.iter(|| {
            manager.spooler().clear_calls();
            assert!(manager.print_text("desk1", black_box(&text)));
        });
    });
}

/// Benchmark SHA-256 fingerprinting of a 1 MiB document.
fn bench_fingerprint(c: &mut Criterion) {
    let data = vec![0x42u8; 1024 * 1024];

    c.bench_function("fingerprint_sha256 (1 MiB)", |b| {
        b.iter(|| black_box(fingerprint(black_box(&data))));
    });
}

criterion_group!(
    benches,
    bench_enumerate,
    bench_query,
    bench_options,
    bench_submit_text,
    bench_fingerprint,
);
criterion_main!(benches);
