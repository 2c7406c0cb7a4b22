// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer. Resolves the data directory, loads configuration,
// and opens the task database for the command handlers.

use std::path::{Path, PathBuf};

use fachory_core::error::{FachoryError, Result};
use fachory_core::types::{CompletedTask, Task, TaskId};
use fachory_core::AppConfig;
use fachory_store::TaskStore;
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// Configuration and task storage shared by every command.
pub struct AppServices {
    store: TaskStore,
    data_dir: PathBuf,
    config: AppConfig,
}

impl AppServices {
    /// Initialise services under the data directory.
    ///
    /// A missing `config.json` is written out with defaults so it can be
    /// edited; an unreadable one falls back to defaults.
    pub fn init(override_dir: Option<&Path>) -> Result<Self> {
        let dir = data_dir::data_dir(override_dir)?;
        info!(path = %dir.display(), "initialising app services");

        let config_path = dir.join(CONFIG_FILE);
        let config = AppConfig::load_or_default(&config_path);
        if !config_path.exists()
            && let Err(e) = config.save(&config_path)
        {
            warn!(error = %e, "could not write default configuration");
        }

        let store = TaskStore::open(dir.join(&config.database_file))?;

        info!("app services initialised");
        Ok(Self {
            store,
            data_dir: dir,
            config,
        })
    }

    /// Defaults and an in-memory task database, for when the data directory
    /// is unusable.
    pub fn fallback() -> Result<Self> {
        Ok(Self {
            store: TaskStore::open_in_memory()?,
            data_dir: std::env::temp_dir(),
            config: AppConfig::default(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // -- Tasks ---------------------------------------------------------------

    pub fn add_task(&self, name: &str, description: &str) -> Result<Task> {
        self.store.add_task(name, description)
    }

    pub fn pending_tasks(&self) -> Result<Vec<Task>> {
        self.store.pending_tasks()
    }

    pub fn completed_tasks(&self) -> Result<Vec<CompletedTask>> {
        self.store.completed_tasks()
    }

    /// Mark the task with textual id `id` done.  `Ok(false)` if it is not
    /// pending.
    pub fn mark_task_done(&self, id: &str, comments: Option<&str>) -> Result<bool> {
        let id: TaskId = id
            .trim()
            .parse()
            .map_err(|e| FachoryError::InvalidTaskId(format!("'{id}': {e}")))?;
        self.store.complete_task(&id, comments)
    }

    /// Pending tasks rendered as a `[ ] name` checklist, one per line.
    pub fn checklist(&self) -> Result<String> {
        Ok(render_checklist(&self.pending_tasks()?))
    }
}

pub fn render_checklist(tasks: &[Task]) -> String {
    tasks.iter().map(|t| format!("[ ] {}\n", t.name)).collect()
}
