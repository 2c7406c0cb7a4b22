// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fachory Store — persistent pending/completed task lists in SQLite.

pub mod store;

pub use store::TaskStore;
