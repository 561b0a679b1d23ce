//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Rubric-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track driver passes
CREATE TABLE IF NOT EXISTS passes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    entities_done INTEGER NOT NULL DEFAULT 0
);

-- Every entity identifier; link NULL = never looked up, '' = not found
CREATE TABLE IF NOT EXISTS entities (
    code TEXT PRIMARY KEY,
    link TEXT,
    prepared_at TEXT
);

-- Pre-crawl input: entity names and their identifiers in preference order
CREATE TABLE IF NOT EXISTS entity_names (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    code TEXT NOT NULL REFERENCES entities(code),
    ordinal INTEGER NOT NULL,
    UNIQUE(name, code)
);

CREATE INDEX IF NOT EXISTS idx_entity_names_name ON entity_names(name);

-- Per-entity category state
CREATE TABLE IF NOT EXISTS categories (
    entity_code TEXT NOT NULL REFERENCES entities(code),
    category_id TEXT NOT NULL,
    amount INTEGER NOT NULL,
    parsed INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY(entity_code, category_id)
);

-- Append-only record tables; the row count is the authoritative progress
CREATE TABLE IF NOT EXISTS records (
    entity_code TEXT NOT NULL,
    category_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    remote_id TEXT NOT NULL,
    title TEXT NOT NULL,
    link TEXT NOT NULL,
    fetched_at TEXT NOT NULL,
    PRIMARY KEY(entity_code, category_id, position)
);

-- Presence-only done markers
CREATE TABLE IF NOT EXISTS done_markers (
    entity_code TEXT PRIMARY KEY REFERENCES entities(code),
    marked_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
