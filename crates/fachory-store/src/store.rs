// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Task store backed by SQLite.
//
// Two tables hold the to-do list: `pending` for tasks still to be done and
// `completed` for tasks that have been marked done, with the completion time
// and optional comments.  The schema is built by versioned migrations, each
// identified by a fixed UUID and recorded in `migrations` once applied.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument, warn};

use fachory_core::error::{FachoryError, Result};
use fachory_core::types::{CompletedTask, Task, TaskId};

const CREATE_MIGRATIONS_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS migrations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        applied_at TEXT NOT NULL
    )
"#;

/// Schema migrations as (uuid, statement), applied in order.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "7b87b3ab-6153-4904-9270-73b61efe637c",
        r#"
        CREATE TABLE pending (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "98739ef0-69eb-4196-a884-b5b18b0e93e7",
        r#"
        CREATE TABLE completed (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            comments TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT NOT NULL
        )
        "#,
    ),
];

/// Persistent task lists.
///
/// All methods are synchronous; `rusqlite` has no async interface.
pub struct TaskStore {
    conn: Connection,
}

impl TaskStore {
    /// Open (or create) the task database at `path` and bring its schema up
    /// to date.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| FachoryError::Database(format!("open: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| FachoryError::Database(format!("WAL pragma: {e}")))?;

        let store = Self { conn };
        store.check_connection()?;
        store.migrate()?;

        info!("task database opened");
        Ok(store)
    }

    /// Open an in-memory database (useful for tests and dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FachoryError::Database(format!("open in-memory: {e}")))?;

        let store = Self { conn };
        store.migrate()?;

        debug!("in-memory task database opened");
        Ok(store)
    }

    fn check_connection(&self) -> Result<()> {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|e| FachoryError::Database(format!("connection check: {e}")))
    }

    /// Apply every migration not yet recorded.  Returns how many ran.
    fn migrate(&self) -> Result<usize> {
        self.conn
            .execute_batch(CREATE_MIGRATIONS_SQL)
            .map_err(|e| FachoryError::Database(format!("create migrations table: {e}")))?;

        let mut applied = 0;
        for (uuid, statement) in MIGRATIONS {
            let recorded: Option<i64> = self
                .conn
                .query_row(
                    "SELECT id FROM migrations WHERE uuid = ?1",
                    params![uuid],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| FachoryError::Database(format!("check migration {uuid}: {e}")))?;

            if recorded.is_some() {
                warn!(migration = uuid, "migration has already been applied, skipping");
                continue;
            }

            info!(migration = uuid, "applying migration");
            let tx = self
                .conn
                .unchecked_transaction()
                .map_err(|e| FachoryError::Database(format!("begin migration {uuid}: {e}")))?;
            tx.execute_batch(statement)
                .map_err(|e| FachoryError::Database(format!("apply migration {uuid}: {e}")))?;
            tx.execute(
                "INSERT INTO migrations (uuid, applied_at) VALUES (?1, ?2)",
                params![uuid, Utc::now().to_rfc3339()],
            )
            .map_err(|e| FachoryError::Database(format!("record migration {uuid}: {e}")))?;
            tx.commit()
                .map_err(|e| FachoryError::Database(format!("commit migration {uuid}: {e}")))?;
            applied += 1;
        }

        Ok(applied)
    }

    /// Add a new pending task.
    #[instrument(skip(self, description))]
    pub fn add_task(&self, name: &str, description: &str) -> Result<Task> {
        let task = Task::new(name.to_owned(), description.to_owned());

        self.conn
            .execute(
                "INSERT INTO pending (uuid, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    task.id.to_string(),
                    task.name,
                    task.description,
                    task.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| FachoryError::Database(format!("insert task: {e}")))?;

        info!(task_id = %task.id, "task added");
        Ok(task)
    }

    /// Pending tasks, oldest first.
    #[instrument(skip(self))]
    pub fn pending_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT uuid, name, description, created_at
                 FROM pending ORDER BY created_at ASC, id ASC",
            )
            .map_err(|e| FachoryError::Database(format!("prepare pending_tasks: {e}")))?;

        let tasks = stmt
            .query_map([], row_to_task)
            .map_err(|e| FachoryError::Database(format!("query pending_tasks: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FachoryError::Database(format!("collect rows: {e}")))?;

        debug!(count = tasks.len(), "retrieved pending tasks");
        Ok(tasks)
    }

    /// Look up one pending task.
    pub fn pending_task(&self, id: &TaskId) -> Result<Option<Task>> {
        self.conn
            .query_row(
                "SELECT uuid, name, description, created_at FROM pending WHERE uuid = ?1",
                params![id.to_string()],
                row_to_task,
            )
            .optional()
            .map_err(|e| FachoryError::Database(format!("query pending_task: {e}")))
    }

    /// Move a task from `pending` to `completed`.
    ///
    /// Returns `Ok(false)` if no pending task has that id.
    pub fn mark_task_done(&self, id: &TaskId) -> Result<bool> {
        self.complete_task(id, None)
    }

    /// As [`mark_task_done`](Self::mark_task_done), recording `comments`
    /// alongside the completed task.
    #[instrument(skip(self, comments), fields(task_id = %id))]
    pub fn complete_task(&self, id: &TaskId, comments: Option<&str>) -> Result<bool> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| FachoryError::Database(format!("begin complete_task: {e}")))?;

        let moved = tx
            .execute(
                "INSERT INTO completed (uuid, name, description, comments, created_at, completed_at)
                 SELECT uuid, name, description, ?2, created_at, ?3
                 FROM pending WHERE uuid = ?1",
                params![id.to_string(), comments, Utc::now().to_rfc3339()],
            )
            .map_err(|e| FachoryError::Database(format!("copy completed task: {e}")))?;

        if moved == 0 {
            warn!(task_id = %id, "task was not pending");
            return Ok(false);
        }

        tx.execute("DELETE FROM pending WHERE uuid = ?1", params![id.to_string()])
            .map_err(|e| FachoryError::Database(format!("delete pending task: {e}")))?;
        tx.commit()
            .map_err(|e| FachoryError::Database(format!("commit complete_task: {e}")))?;

        info!(task_id = %id, "task marked done");
        Ok(true)
    }

    /// Completed tasks, most recently completed first.
    #[instrument(skip(self))]
    pub fn completed_tasks(&self) -> Result<Vec<CompletedTask>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT uuid, name, description, created_at, comments, completed_at
                 FROM completed ORDER BY completed_at DESC, id DESC",
            )
            .map_err(|e| FachoryError::Database(format!("prepare completed_tasks: {e}")))?;

        let tasks = stmt
            .query_map([], |row| {
                Ok(CompletedTask {
                    task: row_to_task(row)?,
                    comments: row.get(4)?,
                    completed_at: parse_time(row, 5)?,
                })
            })
            .map_err(|e| FachoryError::Database(format!("query completed_tasks: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FachoryError::Database(format!("collect rows: {e}")))?;

        debug!(count = tasks.len(), "retrieved completed tasks");
        Ok(tasks)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Map the leading `uuid, name, description, created_at` columns to a `Task`.
fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let id_str: String = row.get(0)?;
    let uuid = uuid::Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Task {
        id: TaskId(uuid),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_time(row, 3)?,
    })
}

fn parse_time(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_list_pending_in_insertion_order() {
        let store = TaskStore::open_in_memory().expect("open in-memory db");
        let gym = store.add_task("Going to the Gym", "").expect("add");
        let chore = store.add_task("Do chore", "dishes").expect("add");

        let pending = store.pending_tasks().expect("pending");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, gym.id);
        assert_eq!(pending[1].id, chore.id);
        assert_eq!(pending[1].description, "dishes");
    }

    #[test]
    fn mark_done_moves_task_to_completed() {
        let store = TaskStore::open_in_memory().expect("open in-memory db");
        let task = store.add_task("Do Work", "").expect("add");

        assert!(store.mark_task_done(&task.id).expect("mark done"));
        assert!(store.pending_tasks().expect("pending").is_empty());
        assert!(store.pending_task(&task.id).expect("lookup").is_none());

        let completed = store.completed_tasks().expect("completed");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].task.id, task.id);
        assert_eq!(completed[0].task.name, "Do Work");
        assert!(completed[0].comments.is_none());
        assert!(completed[0].completed_at >= task.created_at);
    }

    #[test]
    fn unknown_task_is_not_done() {
        let store = TaskStore::open_in_memory().expect("open in-memory db");
        assert!(!store.mark_task_done(&TaskId::new()).expect("mark done"));
        assert!(store.completed_tasks().expect("completed").is_empty());
    }

    #[test]
    fn marking_twice_only_succeeds_once() {
        let store = TaskStore::open_in_memory().expect("open in-memory db");
        let task = store.add_task("Eat", "").expect("add");
        assert!(store.mark_task_done(&task.id).expect("first"));
        assert!(!store.mark_task_done(&task.id).expect("second"));
        assert_eq!(store.completed_tasks().expect("completed").len(), 1);
    }

    #[test]
    fn comments_are_kept() {
        let store = TaskStore::open_in_memory().expect("open in-memory db");
        let task = store.add_task("Helping", "").expect("add");
        assert!(store.complete_task(&task.id, Some("took an hour")).expect("complete"));

        let completed = store.completed_tasks().expect("completed");
        assert_eq!(completed[0].comments.as_deref(), Some("took an hour"));
    }

    #[test]
    fn reopening_skips_applied_migrations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tasks.db");

        let id = {
            let store = TaskStore::open(&path).expect("first open");
            store.add_task("Persisted", "").expect("add").id
        };

        let store = TaskStore::open(&path).expect("second open");
        assert_eq!(store.migrate().expect("migrate"), 0);

        let migrations: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(migrations, MIGRATIONS.len() as i64);

        let pending = store.pending_tasks().expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    #[test]
    fn corrupt_uuid_is_a_database_error() {
        let store = TaskStore::open_in_memory().expect("open in-memory db");
        store
            .conn
            .execute(
                "INSERT INTO pending (uuid, name, description, created_at) VALUES ('nope', 'x', '', ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .expect("raw insert");

        assert!(matches!(store.pending_tasks(), Err(FachoryError::Database(_))));
    }
}
