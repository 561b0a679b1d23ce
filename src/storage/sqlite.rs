//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::CategoryProgress;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{EntityRecord, PassRecord, PassStatus, PositionedRecord, Record};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = init_database(path)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn ensure_entity(&self, code: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO entities (code) VALUES (?1)",
            params![code],
        )?;
        Ok(())
    }

    fn read_pass(row: &rusqlite::Row<'_>) -> rusqlite::Result<PassRecord> {
        Ok(PassRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: PassStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(PassStatus::Failed),
            entities_done: row.get(5)?,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Pass Management =====

    fn create_pass(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO passes (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, PassStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_pass(&self, pass_id: i64) -> StorageResult<PassRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, entities_done
                 FROM passes WHERE id = ?1",
                params![pass_id],
                Self::read_pass,
            )
            .optional()?
            .ok_or(StorageError::PassNotFound(pass_id))
    }

    fn get_latest_pass(&self) -> StorageResult<Option<PassRecord>> {
        let pass = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, entities_done
                 FROM passes ORDER BY id DESC LIMIT 1",
                [],
                Self::read_pass,
            )
            .optional()?;
        Ok(pass)
    }

    fn finish_pass(
        &mut self,
        pass_id: i64,
        status: PassStatus,
        entities_done: u32,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE passes SET status = ?1, finished_at = ?2, entities_done = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, entities_done, pass_id],
        )?;
        if updated == 0 {
            return Err(StorageError::PassNotFound(pass_id));
        }
        Ok(())
    }

    fn count_passes(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM passes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Names and Links =====

    fn add_entity_names(&mut self, name: &str, codes: &[String]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        for (ordinal, code) in codes.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO entities (code) VALUES (?1)",
                params![code],
            )?;
            tx.execute(
                "INSERT INTO entity_names (name, code, ordinal) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name, code) DO UPDATE SET ordinal = excluded.ordinal",
                params![name, code, ordinal as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_entity_names(&self) -> StorageResult<Vec<(String, Vec<String>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, code FROM entity_names ORDER BY name, ordinal")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut names: Vec<(String, Vec<String>)> = Vec::new();
        for row in rows {
            let (name, code) = row?;
            match names.last_mut() {
                Some((last, codes)) if *last == name => codes.push(code),
                _ => names.push((name, vec![code])),
            }
        }

        Ok(names)
    }

    fn get_link(&self, code: &str) -> StorageResult<Option<String>> {
        let link: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT link FROM entities WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(link.flatten())
    }

    fn set_link(&mut self, code: &str, link: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO entities (code, link) VALUES (?1, ?2)
             ON CONFLICT(code) DO UPDATE SET link = excluded.link",
            params![code, link],
        )?;
        Ok(())
    }

    fn list_entities(&self) -> StorageResult<Vec<EntityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT e.code, e.link, e.prepared_at IS NOT NULL, d.entity_code IS NOT NULL
             FROM entities e LEFT JOIN done_markers d ON d.entity_code = e.code
             ORDER BY e.code",
        )?;

        let entities = stmt
            .query_map([], |row| {
                Ok(EntityRecord {
                    code: row.get(0)?,
                    link: row.get(1)?,
                    prepared: row.get(2)?,
                    done: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entities)
    }

    // ===== Category State =====

    fn replace_categories(
        &mut self,
        code: &str,
        categories: &[CategoryProgress],
    ) -> StorageResult<()> {
        self.ensure_entity(code)?;

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM categories WHERE entity_code = ?1",
            params![code],
        )?;
        for category in categories {
            tx.execute(
                "INSERT INTO categories (entity_code, category_id, amount, parsed)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    code,
                    category.category_id,
                    category.amount as i64,
                    category.parsed as i64
                ],
            )?;
        }
        tx.execute(
            "UPDATE entities SET prepared_at = ?1 WHERE code = ?2",
            params![now, code],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load_categories(&self, code: &str) -> StorageResult<Vec<CategoryProgress>> {
        let mut stmt = self.conn.prepare(
            "SELECT category_id, amount, parsed FROM categories
             WHERE entity_code = ?1 ORDER BY category_id",
        )?;

        let categories = stmt
            .query_map(params![code], |row| {
                Ok(CategoryProgress {
                    category_id: row.get(0)?,
                    amount: row.get::<_, i64>(1)? as u64,
                    parsed: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    fn is_prepared(&self, code: &str) -> StorageResult<bool> {
        let prepared: Option<bool> = self
            .conn
            .query_row(
                "SELECT prepared_at IS NOT NULL FROM entities WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(prepared.unwrap_or(false))
    }

    fn update_parsed(&mut self, code: &str, category_id: &str, parsed: u64) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE categories SET parsed = ?1 WHERE entity_code = ?2 AND category_id = ?3",
            params![parsed as i64, code, category_id],
        )?;
        if updated == 0 {
            return Err(StorageError::EntityNotFound(format!(
                "{} (category {})",
                code, category_id
            )));
        }
        Ok(())
    }

    // ===== Records =====

    fn append_records(
        &mut self,
        code: &str,
        category_id: &str,
        records: &[PositionedRecord],
    ) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        let stored: i64 = tx.query_row(
            "SELECT COUNT(*) FROM records WHERE entity_code = ?1 AND category_id = ?2",
            params![code, category_id],
            |row| row.get(0),
        )?;

        // Positions must extend the stored sequence exactly
        let mut expected = stored as u64 + 1;
        for positioned in records {
            if positioned.position != expected {
                return Err(StorageError::ConstraintViolation(format!(
                    "{}/{}: expected position {}, got {}",
                    code, category_id, expected, positioned.position
                )));
            }
            tx.execute(
                "INSERT INTO records (entity_code, category_id, position, remote_id, title, link, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    code,
                    category_id,
                    positioned.position as i64,
                    positioned.record.remote_id,
                    positioned.record.title,
                    positioned.record.link,
                    now
                ],
            )?;
            expected += 1;
        }

        tx.commit()?;
        Ok(())
    }

    fn count_records(&self, code: &str, category_id: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE entity_code = ?1 AND category_id = ?2",
            params![code, category_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn load_records(&self, code: &str, category_id: &str) -> StorageResult<Vec<PositionedRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT position, remote_id, title, link FROM records
             WHERE entity_code = ?1 AND category_id = ?2 ORDER BY position",
        )?;

        let records = stmt
            .query_map(params![code, category_id], |row| {
                Ok(PositionedRecord {
                    position: row.get::<_, i64>(0)? as u64,
                    record: Record {
                        remote_id: row.get(1)?,
                        title: row.get(2)?,
                        link: row.get(3)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    // ===== Done Markers =====

    fn mark_done(&mut self, code: &str) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO done_markers (entity_code, marked_at) VALUES (?1, ?2)",
            params![code, now],
        )?;
        Ok(inserted > 0)
    }

    fn is_done(&self, code: &str) -> StorageResult<bool> {
        let marker: Option<String> = self
            .conn
            .query_row(
                "SELECT marked_at FROM done_markers WHERE entity_code = ?1",
                params![code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(marker.is_some())
    }

    // ===== Statistics =====

    fn count_total_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_categories(&self) -> StorageResult<(u64, u64)> {
        let (complete, total): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(parsed >= amount), 0), COUNT(*) FROM categories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((complete as u64, total as u64))
    }
}

/// Initializes or opens a database at the given path
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}
