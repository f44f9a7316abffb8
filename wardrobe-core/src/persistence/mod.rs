pub mod load;
pub mod save;
pub mod schema;
mod tests;

use std::fmt;
use std::path::Path;

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use wardrobe_types::{AvatarId, SlotStore};

/// Error from the slot database or from reading/writing JSON documents.
#[derive(Debug)]
pub enum StoreError {
    Sql(rusqlite::Error),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql(e) => write!(f, "database error: {}", e),
            Self::Json(e) => write!(f, "invalid JSON: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sql(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sql(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Open (creating if needed) a slot database in WAL mode with the current
/// schema in place.
pub fn open_database(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    schema::create_tables(&conn)?;
    log::debug!(target: "persistence", "opened slot database {}", path.display());
    Ok(conn)
}

/// Save one avatar's store.
///
/// Runs in an explicit transaction so the write is atomic: if the process
/// dies mid-save the previous rows for that avatar remain intact.
pub fn save_store(conn: &Connection, store: &SlotStore) -> StoreResult<()> {
    let tx = conn.unchecked_transaction()?;
    save::save_relational(&tx, store)?;
    tx.commit()?;
    log::debug!(target: "persistence", "saved slot store for avatar {}", store.avatar());
    Ok(())
}

/// Load one avatar's store, repaired to the current shape.
pub fn load_store(conn: &Connection, avatar: &AvatarId) -> StoreResult<Option<SlotStore>> {
    Ok(load::load_relational(conn, avatar)?)
}

/// Load the avatar's store, or create and save an empty one.
pub fn load_or_create(conn: &Connection, avatar: &AvatarId) -> StoreResult<SlotStore> {
    if let Some(store) = load_store(conn, avatar)? {
        return Ok(store);
    }
    log::info!(target: "persistence", "creating slot store for avatar {}", avatar);
    let store = SlotStore::new(avatar.clone());
    save_store(conn, &store)?;
    Ok(store)
}

/// Remove an avatar's store. Returns false if there was nothing to delete.
pub fn delete_store(conn: &Connection, avatar: &AvatarId) -> StoreResult<bool> {
    let tx = conn.unchecked_transaction()?;
    let removed = schema::delete_avatar_rows(&tx, avatar.as_str())?;
    tx.commit()?;
    Ok(removed > 0)
}

pub fn list_avatars(conn: &Connection) -> StoreResult<Vec<AvatarId>> {
    Ok(load::list_avatars(conn)?)
}

/// Read a JSON document (scene snapshot, controller, menu).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a pretty-printed JSON document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text)?;
    Ok(())
}
