//! Decoded event inserts.

use crate::events::{ColumnValue, DecodedEvent};
use sqlx::sqlite::SqliteArguments;
use sqlx::query::Query;
use sqlx::{Sqlite, SqliteConnection};

/// Insert one event into `table`, provenance columns first.
///
/// `created_by` is left to the column default.
pub(super) async fn insert_event(
    conn: &mut SqliteConnection,
    table: &str,
    event: &DecodedEvent,
) -> Result<(), sqlx::Error> {
    let columns = event.columns();
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in columns {
        query = bind_column(query, value);
    }
    query.execute(&mut *conn).await?;
    Ok(())
}

fn bind_column<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: ColumnValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        ColumnValue::Text(text) => query.bind(text),
        ColumnValue::Integer(int) => query.bind(int),
        ColumnValue::Bool(flag) => query.bind(flag),
    }
}
