//! Operator records.

use rusqlite::{OptionalExtension, params};
use tracing::info;

use super::{Database, StoreError};

/// A registered operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Telegram account id.
    pub id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub is_active: bool,
}

/// Fields captured on first `/start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

impl Database {
    /// Looks an operator up by account id.
    pub fn find_user(&self, id: i64) -> Result<Option<UserRecord>, StoreError> {
        let user = self
            .conn()?
            .query_row(
                "SELECT id, username, full_name, is_active FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        full_name: row.get(2)?,
                        is_active: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Registers an operator unless already known.
    ///
    /// Returns `true` when a new row was created. Existing rows are left
    /// untouched.
    pub fn register_user(&self, user: &NewUser) -> Result<bool, StoreError> {
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO users (id, username, full_name, is_active) VALUES (?1, ?2, ?3, 1)",
            params![user.id, user.username, user.full_name],
        )?;
        if inserted > 0 {
            info!("User registered id={}", user.id);
        }
        Ok(inserted > 0)
    }
}
