use rusqlite::{params, Connection, Result as SqlResult};
use wardrobe_types::{Slot, SlotStore};

use super::schema;

/// Replace the stored rows of one avatar with `store`. DELETE + INSERT; the
/// caller owns the transaction.
pub fn save_relational(conn: &Connection, store: &SlotStore) -> SqlResult<()> {
    let avatar = store.avatar().as_str();
    schema::delete_avatar_rows(conn, avatar)?;

    conn.execute(
        "INSERT INTO stores (avatar_id, root_hint, updated_at) VALUES (?1, ?2, datetime('now'))",
        params![avatar, store.root_hint().map(|p| p.as_str())],
    )?;

    for (index, slot) in store.slots().iter().enumerate() {
        save_slot(conn, avatar, index, slot)?;
    }
    Ok(())
}

fn save_slot(conn: &Connection, avatar: &str, index: usize, slot: &Slot) -> SqlResult<()> {
    let index = index as i64;
    conn.execute(
        "INSERT INTO slots (avatar_id, slot_index, name, configured, icon)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            avatar,
            index,
            slot.name,
            slot.configured as i32,
            slot.icon.as_ref().map(|i| i.as_str()),
        ],
    )?;

    let mut tracked = conn.prepare(
        "INSERT INTO slot_tracked (avatar_id, slot_index, path) VALUES (?1, ?2, ?3)",
    )?;
    for path in &slot.tracked {
        tracked.execute(params![avatar, index, path.as_str()])?;
    }

    let mut state_stmt = conn.prepare(
        "INSERT INTO slot_states (avatar_id, slot_index, position, path, active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut param_stmt = conn.prepare(
        "INSERT INTO slot_state_params (avatar_id, slot_index, position, param, value)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, state) in slot.states.iter().enumerate() {
        let position = position as i64;
        state_stmt.execute(params![
            avatar,
            index,
            position,
            state.path.as_str(),
            state.active as i32,
        ])?;
        for (param, value) in &state.continuous {
            if !value.is_finite() {
                continue;
            }
            param_stmt.execute(params![avatar, index, position, param, *value as f64])?;
        }
    }
    Ok(())
}
