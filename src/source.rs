//! Source capture store: connection factory, row decoding by column name,
//! and a callback-based chunked reader that never materializes a full
//! result set. The row stream is the only long-lived cursor in the
//! pipeline and is released when iteration ends.

use crate::category::Category;
use crate::date::ExportWindow;
use crate::error::Result;
use crate::query::CaptureQuery;
use ahash::AHashSet;
use chrono::NaiveDateTime;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Connection, Executor, Row};

/// One polled snapshot, as stored in the source table.
#[derive(Clone, Debug)]
pub struct Capture {
    pub id: i64,
    pub start_time: NaiveDateTime,
    pub timezone: String,
    pub payload: serde_json::Value,
}

impl Capture {
    /// Decode a full-projection row. Columns are looked up by name so a
    /// reordered source schema cannot silently shift fields.
    pub fn from_row(row: &MySqlRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            start_time: row.try_get("start_time")?,
            timezone: row.try_get("timezone")?,
            payload: row.try_get("raw_json")?,
        })
    }
}

/// Open a connection and select the capture database.
pub async fn connect_source(url: &str, database: &str) -> Result<MySqlConnection> {
    let mut conn = MySqlConnection::connect(url).await?;
    conn.execute(format!("USE `{database}`").as_str()).await?;
    Ok(conn)
}

/// Stream the query's rows in batches of at most `chunk_size`, invoking
/// `on_chunk` for each. The final batch may be smaller but is never empty.
pub async fn for_each_chunk<F>(
    conn: &mut MySqlConnection,
    query: &CaptureQuery,
    chunk_size: usize,
    log_queries: bool,
    mut on_chunk: F,
) -> Result<()>
where
    F: FnMut(Vec<MySqlRow>) -> Result<()>,
{
    let sql = query.sql();
    if log_queries {
        tracing::debug!(category = %query.category, %sql, "source query");
    }
    let chunk_size = chunk_size.max(1);

    let mut rows = query.bind(sqlx::query(&sql)).fetch(&mut *conn);
    let mut batch: Vec<MySqlRow> = Vec::with_capacity(chunk_size);
    while let Some(row) = rows.try_next().await? {
        batch.push(row);
        if batch.len() == chunk_size {
            on_chunk(std::mem::take(&mut batch))?;
            batch.reserve(chunk_size);
        }
    }
    if !batch.is_empty() {
        on_chunk(batch)?;
    }
    Ok(())
}

/// Id-only scan of the window for one category, through the chunked reader.
pub async fn window_ids(
    conn: &mut MySqlConnection,
    category: Category,
    window: &ExportWindow,
    chunk_size: usize,
    log_queries: bool,
) -> Result<AHashSet<i64>> {
    let query = CaptureQuery::window_ids(category, *window);
    let mut ids = AHashSet::new();
    for_each_chunk(conn, &query, chunk_size, log_queries, |batch| {
        for row in &batch {
            ids.insert(row.try_get::<i64, _>("id")?);
        }
        Ok(())
    })
    .await?;
    Ok(ids)
}
