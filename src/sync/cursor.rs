//! The per-item sync checkpoint store.

use rusqlite::{Connection, OptionalExtension, params};

use crate::Error;

pub fn create_cursor_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS cursor (
            item_id TEXT PRIMARY KEY REFERENCES item(item_id) ON DELETE CASCADE,
            cursor TEXT
        )",
        (),
    )?;

    Ok(())
}

/// Retrieve the stored sync checkpoint for an item.
///
/// Returns `None` when the item has never completed a sync pass, which means
/// "sync from the beginning".
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn get_cursor(connection: &Connection, item_id: &str) -> Result<Option<String>, Error> {
    let cursor = connection
        .prepare("SELECT cursor FROM cursor WHERE item_id = :item_id")?
        .query_row(&[(":item_id", &item_id)], |row| {
            row.get::<_, Option<String>>(0)
        })
        .optional()?;

    Ok(cursor.flatten())
}

/// Store the sync checkpoint for an item, overwriting unconditionally.
///
/// The cursor is persisted even when a sync pass made no net change, so the
/// stored value always reflects the last completed pass.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn upsert_cursor(connection: &Connection, item_id: &str, cursor: &str) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO cursor (item_id, cursor) VALUES (?1, ?2)
         ON CONFLICT(item_id) DO UPDATE SET cursor = excluded.cursor",
        params![item_id, cursor],
    )?;

    Ok(())
}
