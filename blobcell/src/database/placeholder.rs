//! Zero-filled placeholder cells
//!
//! An open blob handle cannot change the size of its cell, so a streamed
//! write is always two steps: allocate a `zeroblob` of the final length
//! here, then lock a session and stream the content in.

use crate::blob::Locator;
use crate::config::MAX_BLOB_SIZE;
use crate::error::{BlobError, Result};
use sqlx::{Executor, Sqlite};

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn placeholder_len(len: usize) -> Result<i64> {
    if len > MAX_BLOB_SIZE {
        return Err(BlobError::Range {
            offset: 0,
            length: len,
            size: MAX_BLOB_SIZE,
        });
    }
    // MAX_BLOB_SIZE fits in i64
    Ok(len as i64)
}

/// Insert a new row whose `column` holds `len` zero bytes; returns its row id
pub async fn insert_placeholder<'e, E>(executor: E, table: &str, column: &str, len: usize) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let len = placeholder_len(len)?;

    let sql = format!(
        "INSERT INTO {} ({}) VALUES (zeroblob(?))",
        quote_identifier(table),
        quote_identifier(column)
    );

    let row_id = sqlx::query(&sql)
        .bind(len)
        .execute(executor)
        .await?
        .last_insert_rowid();

    tracing::debug!("Inserted {} byte placeholder at {}.{}[{}]", len, table, column, row_id);
    Ok(row_id)
}

/// Replace the cell at `locator` with `len` zero bytes.
///
/// Returns `false` when no row has that id.
pub async fn allocate_placeholder<'e, E>(executor: E, locator: &Locator, len: usize) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let len = placeholder_len(len)?;

    let sql = format!(
        "UPDATE {} SET {} = zeroblob(?) WHERE rowid = ?",
        quote_identifier(&locator.table),
        quote_identifier(&locator.column)
    );

    let rows = sqlx::query(&sql)
        .bind(len)
        .bind(locator.row_id)
        .execute(executor)
        .await?
        .rows_affected();

    if rows == 0 {
        tracing::debug!("No row to allocate placeholder at {}", locator);
        return Ok(false);
    }

    tracing::debug!("Allocated {} byte placeholder at {}", len, locator);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnection;
    use sqlx::Connection;

    async fn test_connection() -> SqliteConnection {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE \"odd \"\"name\"\"\" (id INTEGER PRIMARY KEY, data BLOB)")
            .execute(&mut conn)
            .await
            .unwrap();
        conn
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("images"), "\"images\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[tokio::test]
    async fn test_insert_placeholder() {
        let mut conn = test_connection().await;

        let row_id = insert_placeholder(&mut conn, "odd \"name\"", "data", 500).await.unwrap();

        let (len, zeros): (i64, i64) = sqlx::query_as(
            "SELECT length(data), data = zeroblob(500) FROM \"odd \"\"name\"\"\" WHERE rowid = ?",
        )
        .bind(row_id)
        .fetch_one(&mut conn)
        .await
        .unwrap();

        assert_eq!(len, 500);
        assert_eq!(zeros, 1);
    }

    #[tokio::test]
    async fn test_allocate_placeholder() {
        let mut conn = test_connection().await;
        let row_id = insert_placeholder(&mut conn, "odd \"name\"", "data", 4).await.unwrap();
        let locator = Locator::new("odd \"name\"", "data", row_id);

        assert!(allocate_placeholder(&mut conn, &locator, 1000).await.unwrap());
        assert!(!allocate_placeholder(&mut conn, &locator.with_row(row_id + 1), 10)
            .await
            .unwrap());

        let len: i64 = sqlx::query_scalar("SELECT length(data) FROM \"odd \"\"name\"\"\" WHERE rowid = ?")
            .bind(row_id)
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(len, 1000);
    }

    #[tokio::test]
    async fn test_placeholder_too_large() {
        let mut conn = test_connection().await;
        let result = insert_placeholder(&mut conn, "odd \"name\"", "data", MAX_BLOB_SIZE + 1).await;
        assert!(matches!(result, Err(BlobError::Range { .. })));
    }
}
