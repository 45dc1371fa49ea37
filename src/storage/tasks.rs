//! Project records.

use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;

use super::{Database, ProjectStatus, StoreError, decode_time, encode_time};

/// A persisted project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub status: ProjectStatus,
    pub creator_id: Option<i64>,
    pub brief: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creation time as operators read it (Moscow time).
    #[must_use]
    pub fn created_display(&self) -> String {
        format_moscow(self.created_at)
    }
}

/// Formats a timestamp in Moscow time as `DD.MM.YYYY HH:MM`.
#[must_use]
pub fn format_moscow(time: DateTime<Utc>) -> String {
    const FORMAT: &str = "%d.%m.%Y %H:%M";
    // Moscow has no DST, a fixed +03:00 is exact.
    FixedOffset::east_opt(3 * 3600).map_or_else(
        || time.format(FORMAT).to_string(),
        |offset| time.with_timezone(&offset).format(FORMAT).to_string(),
    )
}

/// Fields needed to create a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub creator_id: Option<i64>,
    pub brief: Option<String>,
}

const TASK_COLUMNS: &str = "id, title, status, creator_id, brief, created_at, updated_at";

type RawTask = (i64, String, String, Option<i64>, Option<String>, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawTask> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn into_task(raw: RawTask) -> Result<Task, StoreError> {
    let (id, title, status, creator_id, brief, created_at, updated_at) = raw;
    Ok(Task {
        id,
        title,
        status: ProjectStatus::from_label(&status).ok_or(StoreError::InvalidStatus(status))?,
        creator_id,
        brief,
        created_at: decode_time(&created_at)?,
        updated_at: decode_time(&updated_at)?,
    })
}

impl Database {
    /// Inserts a project in the initial status and returns it.
    pub fn create_task(&self, new: &NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let stamp = encode_time(now);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO tasks (title, status, creator_id, brief, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                new.title,
                ProjectStatus::INITIAL.label(),
                new.creator_id,
                new.brief,
                stamp
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Task {} created: '{}'", id, new.title);

        Ok(Task {
            id,
            title: new.title.clone(),
            status: ProjectStatus::INITIAL,
            creator_id: new.creator_id,
            brief: new.brief.clone(),
            created_at: decode_time(&stamp)?,
            updated_at: decode_time(&stamp)?,
        })
    }

    /// Looks a project up by id.
    pub fn get_task(&self, id: i64) -> Result<Option<Task>, StoreError> {
        let raw = self
            .conn()?
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                read_row,
            )
            .optional()?;
        raw.map(into_task).transpose()
    }

    /// Replaces the title and, when given, the brief.
    pub fn update_title(&self, id: i64, title: &str, brief: Option<&str>) -> Result<Task, StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE tasks SET title = ?2, brief = COALESCE(?3, brief), updated_at = ?4 WHERE id = ?1",
            params![id, title, brief, encode_time(Utc::now())],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownTask(id));
        }
        self.get_task(id)?.ok_or(StoreError::UnknownTask(id))
    }

    /// Sets a new status and returns the updated project.
    pub fn update_status(&self, id: i64, status: ProjectStatus) -> Result<Task, StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.label(), encode_time(Utc::now())],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownTask(id));
        }
        self.get_task(id)?.ok_or(StoreError::UnknownTask(id))
    }

    /// Counts all projects.
    pub fn count_tasks(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Returns the project at `offset` in newest-first order.
    pub fn nth_recent_task(&self, offset: u64) -> Result<Option<Task>, StoreError> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let raw = self
            .conn()?
            .query_row(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     ORDER BY created_at DESC, id DESC LIMIT 1 OFFSET ?1"
                ),
                params![offset],
                read_row,
            )
            .optional()?;
        raw.map(into_task).transpose()
    }

    /// Position of a project in newest-first order.
    pub fn task_position(&self, id: i64) -> Result<Option<u64>, StoreError> {
        let Some(task) = self.get_task(id)? else {
            return Ok(None);
        };
        let newer: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM tasks WHERE created_at > ?1 OR (created_at = ?1 AND id > ?2)",
            params![encode_time(task.created_at), id],
            |row| row.get(0),
        )?;
        Ok(Some(u64::try_from(newer).unwrap_or_default()))
    }
}

/// Maps any integer position onto `0..total`, wrapping in both directions.
///
/// Returns `None` when there is nothing to browse.
#[must_use]
pub fn wrap_position(index: i64, total: u64) -> Option<u64> {
    let total = i64::try_from(total).ok().filter(|t| *t > 0)?;
    u64::try_from(index.rem_euclid(total)).ok()
}
