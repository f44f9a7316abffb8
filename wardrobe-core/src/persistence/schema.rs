use rusqlite::{params, Connection, Result as SqlResult};

/// Schema version for the relational slot store format.
pub const SCHEMA_VERSION: i32 = 1;

/// Create all tables and record the schema version.
pub fn create_tables(conn: &Connection) -> SqlResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        params![SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Delete every row belonging to one avatar (preserving schema).
pub fn delete_avatar_rows(conn: &Connection, avatar_id: &str) -> SqlResult<usize> {
    conn.execute("DELETE FROM slot_state_params WHERE avatar_id = ?1", params![avatar_id])?;
    conn.execute("DELETE FROM slot_states WHERE avatar_id = ?1", params![avatar_id])?;
    conn.execute("DELETE FROM slot_tracked WHERE avatar_id = ?1", params![avatar_id])?;
    conn.execute("DELETE FROM slots WHERE avatar_id = ?1", params![avatar_id])?;
    conn.execute("DELETE FROM stores WHERE avatar_id = ?1", params![avatar_id])
}

pub fn latest_version(conn: &Connection) -> SqlResult<Option<i32>> {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

-- ============================================================
-- Stores (one per avatar)
-- ============================================================

CREATE TABLE IF NOT EXISTS stores (
    avatar_id TEXT PRIMARY KEY,
    root_hint TEXT,
    updated_at TEXT NOT NULL
);

-- ============================================================
-- Slots
-- ============================================================

CREATE TABLE IF NOT EXISTS slots (
    avatar_id TEXT NOT NULL,
    slot_index INTEGER NOT NULL,
    name TEXT NOT NULL,
    configured INTEGER NOT NULL,
    icon TEXT,
    PRIMARY KEY (avatar_id, slot_index)
);

CREATE TABLE IF NOT EXISTS slot_tracked (
    avatar_id TEXT NOT NULL,
    slot_index INTEGER NOT NULL,
    path TEXT NOT NULL,
    PRIMARY KEY (avatar_id, slot_index, path)
);

CREATE TABLE IF NOT EXISTS slot_states (
    avatar_id TEXT NOT NULL,
    slot_index INTEGER NOT NULL,
    position INTEGER NOT NULL,
    path TEXT NOT NULL,
    active INTEGER NOT NULL,
    PRIMARY KEY (avatar_id, slot_index, position)
);

CREATE TABLE IF NOT EXISTS slot_state_params (
    avatar_id TEXT NOT NULL,
    slot_index INTEGER NOT NULL,
    position INTEGER NOT NULL,
    param TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (avatar_id, slot_index, position, param)
);
";
