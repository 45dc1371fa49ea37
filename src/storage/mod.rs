//! Task and operator persistence.
//!
//! A single SQLite connection behind a mutex. Every operation is one short
//! statement or transaction; nothing holds the lock across an await point.

mod status;
mod tasks;
mod users;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

pub use status::ProjectStatus;
pub use tasks::{NewTask, Task, format_moscow, wrap_position};
pub use users::{NewUser, UserRecord};

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),

    #[error("Stored status is not a known label: {0}")]
    InvalidStatus(String),

    #[error("Stored timestamp is invalid: {0}")]
    InvalidTimestamp(String),

    #[error("Task {0} not found")]
    UnknownTask(i64),

    #[error("Database connection lock poisoned")]
    Poisoned,

    #[error("Database worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    /// Parses a connection string.
    ///
    /// Accepts `sqlite:///relative.db`, `sqlite:////absolute.db`, driver
    /// suffixed schemes such as `sqlite+aiosqlite:///…`, plain paths and
    /// `:memory:`.
    pub fn parse(url: &str) -> Result<Self, StoreError> {
        let url = url.trim();
        let path = match url.split_once("://") {
            Some((scheme, rest)) => {
                if scheme != "sqlite" && !scheme.starts_with("sqlite+") {
                    return Err(StoreError::UnsupportedUrl(url.to_owned()));
                }
                rest.strip_prefix('/').unwrap_or(rest)
            }
            None => url.strip_prefix("sqlite:").unwrap_or(url),
        };

        match path {
            "" => Err(StoreError::UnsupportedUrl(url.to_owned())),
            ":memory:" => Ok(Self::Memory),
            p => Ok(Self::File(PathBuf::from(p))),
        }
    }
}

/// Handle to the task database.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens the database behind a connection string and migrates it.
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let conn = match DatabaseLocation::parse(url)? {
            DatabaseLocation::Memory => Connection::open_in_memory()?,
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                info!("Opening database at {}", path.display());
                Connection::open(path)?
            }
        };
        Self::with_connection(conn)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS tasks (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              title TEXT NOT NULL,
              status TEXT NOT NULL,
              creator_id INTEGER,
              brief TEXT,
              created_at TEXT NOT NULL,
              updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_recent ON tasks(created_at DESC, id DESC);

            CREATE TABLE IF NOT EXISTS users (
              id INTEGER PRIMARY KEY,
              username TEXT,
              full_name TEXT,
              is_active INTEGER NOT NULL DEFAULT 1
            );
            ",
        )?;
        Ok(())
    }

    /// Runs `f` on the blocking pool so SQLite never stalls the runtime.
    pub async fn call<T, F>(db: &Arc<Self>, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Self) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(db);
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Formats a timestamp so that text order equals time order.
fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sqlalchemy_style_urls() {
        assert_eq!(
            DatabaseLocation::parse("sqlite:///db.sqlite3").unwrap(),
            DatabaseLocation::File(PathBuf::from("db.sqlite3"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite+aiosqlite:///./data/app.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("./data/app.db"))
        );
        assert_eq!(
            DatabaseLocation::parse("sqlite:////var/lib/bot.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("/var/lib/bot.db"))
        );
    }

    #[test]
    fn test_parse_memory_and_plain_paths() {
        assert_eq!(DatabaseLocation::parse(":memory:").unwrap(), DatabaseLocation::Memory);
        assert_eq!(
            DatabaseLocation::parse("sqlite:///:memory:").unwrap(),
            DatabaseLocation::Memory
        );
        assert_eq!(
            DatabaseLocation::parse("bot.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("bot.db"))
        );
    }

    #[test]
    fn test_parse_rejects_other_engines() {
        assert!(matches!(
            DatabaseLocation::parse("postgresql://u@h/db"),
            Err(StoreError::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bot.db");
        let url = format!("sqlite:///{}", path.display());
        // Absolute paths need the fourth slash, which display() provides.
        let db = Database::open(&url).unwrap();
        assert_eq!(db.count_tasks().unwrap(), 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_call_runs_off_the_runtime() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let created = Database::call(&db, |db| {
            db.create_task(&NewTask {
                title: "Лендинг".to_owned(),
                creator_id: None,
                brief: None,
            })
        })
        .await
        .unwrap();

        let count = Database::call(&db, Database::count_tasks).await.unwrap();
        assert_eq!(count, 1);
        let missing = Database::call(&db, move |db| db.update_status(created.id + 1, ProjectStatus::Done)).await;
        assert!(matches!(missing, Err(StoreError::UnknownTask(_))));
    }

    #[test]
    fn test_time_roundtrip_keeps_order() {
        use chrono::TimeZone;

        let earlier = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(encode_time(earlier) < encode_time(later));
        assert_eq!(decode_time(&encode_time(earlier)).unwrap(), earlier);
        assert!(decode_time("yesterday").is_err());
    }
}
