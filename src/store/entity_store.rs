use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::store::migrations::BASE_MIGRATION;
use crate::store::{normalize_name, Entity, CHECKED_DATE_FORMAT};

pub struct EntityStore {
    conn: Connection,
}

impl EntityStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed creating database directory: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed opening database: {}", path.display()))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(BASE_MIGRATION)?;
        Ok(())
    }

    /// Returns `false` without touching the existing row when `name` is
    /// already tracked.
    pub fn insert(&self, name: &str, subscribers: i64, now: DateTime<Utc>) -> Result<bool> {
        let result = self.conn.execute(
            r#"
INSERT INTO subreddits(name, checked_date, subscribers)
VALUES (?1, ?2, ?3)
"#,
            params![normalize_name(name), format_checked_date(now), subscribers],
        );
        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Records a fresh count. `checked_date` never moves backwards, and an
    /// unknown name is left alone; the return value says whether a row
    /// matched.
    pub fn update(&self, name: &str, subscribers: i64, now: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
UPDATE subreddits
SET subscribers = ?1,
    checked_date = MAX(checked_date, ?2)
WHERE name = ?3
"#,
            params![subscribers, format_checked_date(now), normalize_name(name)],
        )?;
        Ok(changed > 0)
    }

    pub fn get(&self, name: &str) -> Result<Option<Entity>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT name, checked_date, subscribers
FROM subreddits
WHERE name = ?1
"#,
        )?;
        let entity = stmt
            .query_row(params![normalize_name(name)], row_to_entity)
            .optional()?;
        Ok(entity)
    }

    pub fn list_all(&self) -> Result<Vec<Entity>> {
        let mut stmt = self.conn.prepare(
            r#"
SELECT name, checked_date, subscribers
FROM subreddits
ORDER BY name
"#,
        )?;
        let rows = stmt
            .query_map([], row_to_entity)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> Result<usize> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM subreddits", [], |row| row.get(0))?;
        Ok(total as usize)
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err)?;
        Ok(())
    }
}

fn format_checked_date(at: DateTime<Utc>) -> String {
    at.format(CHECKED_DATE_FORMAT).to_string()
}

fn row_to_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
    let checked_raw: String = row.get(1)?;
    let checked_at = NaiveDateTime::parse_from_str(&checked_raw, CHECKED_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(Entity {
        name: row.get(0)?,
        checked_at,
        subscribers: row.get(2)?,
    })
}
