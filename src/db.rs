/*! Sets up the SQLite tables that back the credential store. */

use rusqlite::Connection;

use crate::{item, sync};

/// Create the tables for linked items and their sync cursors.
///
/// # Errors
/// Returns an error if there is an SQL error while creating a table.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    item::create_item_table(connection)?;
    sync::create_cursor_table(connection)?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert_eq!(Ok(()), initialize(&connection));
    }
}
