//! Intermediate file materialization: fetch each pending capture through
//! the chunked reader and dump its decoded payload as one JSON file in the
//! window directory.

use crate::category::Category;
use crate::config::ExportOptions;
use crate::date::ExportWindow;
use crate::error::Result;
use crate::paths;
use crate::progress::ProgressScope;
use crate::provenance::Provenance;
use crate::query::CaptureQuery;
use crate::source::{self, Capture};
use sqlx::mysql::MySqlConnection;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Split the sorted pending ids into fetch batches of at most `chunk_size`.
/// The last batch may be smaller; none is empty.
pub fn id_batches(ids: &[i64], chunk_size: usize) -> impl Iterator<Item = &[i64]> {
    ids.chunks(chunk_size.max(1))
}

/// Write one capture's payload to its deterministically named file.
pub fn write_capture(dir: &Path, category: Category, capture: &Capture) -> Result<PathBuf> {
    let tag = Provenance {
        category,
        start_time: capture.start_time,
        timezone: capture.timezone.clone(),
        id: capture.id,
    };
    let path = dir.join(tag.file_name());
    let file = File::create(&path)?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer(&mut w, &capture.payload)?;
    w.flush()?;
    Ok(path)
}

/// Materialize all pending captures of one category. Returns the number of
/// files written.
pub async fn materialize_category(
    conn: &mut MySqlConnection,
    category: Category,
    ids: &[i64],
    window: &ExportWindow,
    opts: &ExportOptions,
) -> Result<u64> {
    let dir = paths::ensure_window_dir(&opts.output_root, category, window)?;
    let pb = if opts.progress {
        ProgressScope::count(format!("Dumping {category} to json"), ids.len() as u64)
    } else {
        ProgressScope::hidden()
    };

    let mut written = 0u64;
    for batch in id_batches(ids, opts.chunk_size) {
        let query = CaptureQuery::by_ids(category, batch.to_vec());
        source::for_each_chunk(conn, &query, opts.chunk_size, opts.log_queries, |rows| {
            for row in &rows {
                let capture = Capture::from_row(row)?;
                write_capture(&dir, category, &capture)?;
                written += 1;
                pb.inc_items(1);
            }
            Ok(())
        })
        .await?;
    }

    pb.finish(format!("{category}: {written} files"));
    tracing::info!(%category, files = written, dir = %dir.display(), "materialized");
    Ok(written)
}
