//! Settings rows.

use std::collections::HashMap;

use rusqlite::OptionalExtension;

use crate::{Database, DbError};

const KIND_NORMAL: &str = "normal";
const KIND_SECRET: &str = "secret";

fn kind_of(secret: bool) -> &'static str {
    if secret { KIND_SECRET } else { KIND_NORMAL }
}

impl Database {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DbError> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Insert or replace a value. `secret` marks it for masking.
    pub fn set_setting(&self, key: &str, value: &str, secret: bool) -> Result<(), DbError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value, setting_type, updated_at) VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = ?2, setting_type = ?3, updated_at = CURRENT_TIMESTAMP",
            rusqlite::params![key, value, kind_of(secret)],
        )?;
        Ok(())
    }

    /// Whether a stored key is secret; `None` when the key is not stored.
    pub fn is_secret(&self, key: &str) -> Result<Option<bool>, DbError> {
        let conn = self.lock()?;
        let kind = conn
            .query_row(
                "SELECT setting_type FROM settings WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match kind.as_deref() {
            None => Ok(None),
            Some(KIND_NORMAL) => Ok(Some(false)),
            Some(KIND_SECRET) => Ok(Some(true)),
            Some(other) => Err(DbError::InvalidData {
                key: key.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn get_all_settings(&self) -> Result<HashMap<String, String>, DbError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = HashMap::new();
        for row in rows {
            let (k, v) = row?;
            map.insert(k, v);
        }
        Ok(map)
    }

    /// Write several values in one transaction. Existing rows keep their
    /// secret flag; new rows are normal.
    pub fn update_settings_bulk(&self, settings: &HashMap<String, String>) -> Result<(), DbError> {
        let pairs: Vec<(&str, &str)> = settings
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.write_values(&pairs)
    }

    pub(crate) fn write_values(&self, pairs: &[(&str, &str)]) -> Result<(), DbError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO settings (key, value, setting_type, updated_at) VALUES (?1, ?2, 'normal', CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = CURRENT_TIMESTAMP",
            )?;
            for (key, value) in pairs {
                stmt.execute(rusqlite::params![key, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Remove a stored value. Returns whether a row existed.
    pub fn delete_setting(&self, key: &str) -> Result<bool, DbError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(removed > 0)
    }
}
