use rusqlite::{Connection, Row, params};
use time::OffsetDateTime;

use crate::Error;

/// One linked financial institution connection.
///
/// Created when a public token is exchanged for credentials; never updated
/// afterwards. Deletion is out-of-band and not exposed through the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// The opaque identifier the aggregation API assigned to the connection.
    pub item_id: String,
    /// The credential used for all outbound calls for this item.
    pub access_token: String,
    /// The institution name reported when the item was linked.
    pub institution_name: Option<String>,
    /// When the item was linked.
    pub created_at: OffsetDateTime,
}

pub fn create_item_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS item (
            item_id TEXT PRIMARY KEY,
            access_token TEXT NOT NULL,
            institution_name TEXT,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_item(row: &Row) -> Result<Item, rusqlite::Error> {
    let item_id = row.get(0)?;
    let access_token = row.get(1)?;
    let institution_name = row.get(2)?;
    let created_at = row.get(3)?;

    Ok(Item {
        item_id,
        access_token,
        institution_name,
        created_at,
    })
}

/// Store the credentials for a newly linked item.
///
/// An item with the same ID that already exists is left untouched and the
/// insert is silently dropped, so exchanging the same institution twice
/// cannot overwrite a working credential.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn insert_item(
    connection: &Connection,
    item_id: &str,
    access_token: &str,
    institution_name: Option<&str>,
) -> Result<(), Error> {
    connection.execute(
        "INSERT OR IGNORE INTO item (item_id, access_token, institution_name, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            item_id,
            access_token,
            institution_name,
            OffsetDateTime::now_utc()
        ],
    )?;

    Ok(())
}

/// List every linked item, oldest first.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an unexpected SQL error.
pub fn list_items(connection: &Connection) -> Result<Vec<Item>, Error> {
    connection
        .prepare(
            "SELECT item_id, access_token, institution_name, created_at FROM item
             ORDER BY created_at, item_id",
        )?
        .query_map([], map_row_to_item)?
        .map(|maybe_item| maybe_item.map_err(Error::SqlError))
        .collect()
}

/// Retrieve a linked item by its ID.
///
/// # Errors
/// Returns an [Error::UnknownItem] if `item_id` does not refer to a linked
/// item, or an [Error::SqlError] if there is some other SQL error.
pub fn get_item(connection: &Connection, item_id: &str) -> Result<Item, Error> {
    connection
        .prepare(
            "SELECT item_id, access_token, institution_name, created_at FROM item
             WHERE item_id = :item_id",
        )?
        .query_row(&[(":item_id", &item_id)], map_row_to_item)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UnknownItem(item_id.to_owned()),
            error => error.into(),
        })
}

#[cfg(test)]
mod item_store_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{get_item, insert_item, list_items};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_and_get_round_trips() {
        let conn = get_test_connection();

        insert_item(&conn, "item-1", "access-1", Some("Test Bank")).unwrap();

        let item = get_item(&conn, "item-1").unwrap();
        assert_eq!(item.item_id, "item-1");
        assert_eq!(item.access_token, "access-1");
        assert_eq!(item.institution_name.as_deref(), Some("Test Bank"));
    }

    #[test]
    fn insert_without_institution_name() {
        let conn = get_test_connection();

        insert_item(&conn, "item-1", "access-1", None).unwrap();

        let item = get_item(&conn, "item-1").unwrap();
        assert_eq!(item.institution_name, None);
    }

    #[test]
    fn duplicate_insert_is_silently_dropped() {
        let conn = get_test_connection();
        insert_item(&conn, "item-1", "access-original", Some("Test Bank")).unwrap();

        insert_item(&conn, "item-1", "access-imposter", Some("Other Bank")).unwrap();

        let items = list_items(&conn).unwrap();
        assert_eq!(items.len(), 1, "want exactly one row per item ID");
        assert_eq!(
            items[0].access_token, "access-original",
            "a duplicate exchange must not overwrite the stored credential"
        );
    }

    #[test]
    fn list_returns_every_item() {
        let conn = get_test_connection();
        insert_item(&conn, "item-1", "access-1", Some("Test Bank")).unwrap();
        insert_item(&conn, "item-2", "access-2", None).unwrap();

        let items = list_items(&conn).unwrap();

        assert_eq!(items.len(), 2);
    }

    #[test]
    fn get_unknown_item_is_a_caller_error() {
        let conn = get_test_connection();

        let result = get_item(&conn, "item-404");

        assert_eq!(result, Err(Error::UnknownItem("item-404".to_owned())));
    }
}
