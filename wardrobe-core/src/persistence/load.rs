use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use wardrobe_types::{AssetRef, AvatarId, ObjectState, PathKey, Slot, SlotStore, SLOT_COUNT};

/// Load the rows of one avatar. Returns `None` if the avatar has no store.
///
/// Slot indices missing from the table come back as empty slots; shape repair
/// and legacy migration happen in [`SlotStore::from_parts`].
pub fn load_relational(conn: &Connection, avatar: &AvatarId) -> SqlResult<Option<SlotStore>> {
    let root_hint: Option<Option<String>> = conn
        .query_row(
            "SELECT root_hint FROM stores WHERE avatar_id = ?1",
            params![avatar.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(root_hint) = root_hint else {
        return Ok(None);
    };

    let mut slots: BTreeMap<i64, Slot> = BTreeMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT slot_index, name, configured, icon FROM slots
             WHERE avatar_id = ?1 ORDER BY slot_index",
        )?;
        let rows = stmt.query_map(params![avatar.as_str()], |row| {
            let index: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let configured: bool = row.get(2)?;
            let icon: Option<String> = row.get(3)?;
            Ok((index, name, configured, icon))
        })?;
        for row in rows {
            let (index, name, configured, icon) = row?;
            if index < 0 || index as usize >= SLOT_COUNT {
                log::warn!(target: "persistence", "dropping slot row with index {}", index);
                continue;
            }
            let mut slot = Slot::empty(index as usize);
            slot.name = name;
            slot.configured = configured;
            slot.icon = icon.map(AssetRef::new);
            slots.insert(index, slot);
        }
    }

    {
        let mut stmt = conn.prepare(
            "SELECT slot_index, path FROM slot_tracked WHERE avatar_id = ?1 ORDER BY slot_index, path",
        )?;
        let rows = stmt.query_map(params![avatar.as_str()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (index, path) = row?;
            if let Some(slot) = slots.get_mut(&index) {
                slot.tracked.insert(PathKey::new(path));
            }
        }
    }

    let mut params_by_state: BTreeMap<(i64, i64), BTreeMap<String, f32>> = BTreeMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT slot_index, position, param, value FROM slot_state_params WHERE avatar_id = ?1",
        )?;
        let rows = stmt.query_map(params![avatar.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;
        for row in rows {
            let (index, position, param, value) = row?;
            params_by_state
                .entry((index, position))
                .or_default()
                .insert(param, value as f32);
        }
    }

    {
        let mut stmt = conn.prepare(
            "SELECT slot_index, position, path, active FROM slot_states
             WHERE avatar_id = ?1 ORDER BY slot_index, position",
        )?;
        let rows = stmt.query_map(params![avatar.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?;
        for row in rows {
            let (index, position, path, active) = row?;
            let Some(slot) = slots.get_mut(&index) else {
                continue;
            };
            let mut state = ObjectState::new(PathKey::new(path), active);
            if let Some(continuous) = params_by_state.remove(&(index, position)) {
                state.continuous = continuous;
            }
            slot.states.push(state);
        }
    }

    let len = slots.keys().next_back().map(|&i| i as usize + 1).unwrap_or(0);
    let mut ordered: Vec<Slot> = (0..len).map(Slot::empty).collect();
    for (index, slot) in slots {
        ordered[index as usize] = slot;
    }

    Ok(Some(SlotStore::from_parts(
        avatar.clone(),
        ordered,
        root_hint.map(PathKey::new),
    )))
}

pub fn list_avatars(conn: &Connection) -> SqlResult<Vec<AvatarId>> {
    let mut stmt = conn.prepare("SELECT avatar_id FROM stores ORDER BY avatar_id")?;
    let avatars = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .map(|r| r.map(AvatarId::new))
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(avatars)
}
