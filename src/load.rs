//! Geospatial loader: provenance snapshot, chunked bulk inserts of
//! materialized files, and the idempotent geometry-derivation pass.

use crate::category::Category;
use crate::error::{ExportError, Result};
use crate::prepare::{
    prepare_alerts, prepare_irregularities, prepare_jams, AlertRow, IrregularityRow, JamRow,
};
use crate::progress::ProgressScope;
use crate::provenance::Provenance;
use ahash::AHashSet;
use serde_json::Value;
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Executor, Postgres, QueryBuilder, Row};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// PostgreSQL caps a statement at 65535 bind parameters; multi-row inserts
/// are sub-batched below it.
const MAX_BIND_PARAMS: usize = 65_535;

pub async fn connect_dest(url: &str) -> Result<PgConnection> {
    Ok(PgConnection::connect(url).await?)
}

/// Snapshot of provenance ids already present in the destination table.
/// Read once per run; concurrent runs are an out-of-scope caller concern.
pub async fn existing_ids(conn: &mut PgConnection, category: Category) -> Result<AHashSet<i64>> {
    let sql = format!("SELECT DISTINCT datafile_id FROM waze.{}", category.table());
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    let mut ids = AHashSet::with_capacity(rows.len());
    for row in &rows {
        ids.insert(row.try_get::<i64, _>("datafile_id")?);
    }
    Ok(ids)
}

fn read_intermediate(path: &Path) -> Result<(Provenance, Value)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ExportError::Decode(format!("unreadable file name: {}", path.display())))?;
    let meta = Provenance::parse(name)?;
    let file = File::open(path)?;
    let payload: Value = serde_json::from_reader(BufReader::new(file))?;
    Ok((meta, payload))
}

/// Ids were pre-deduplicated against this snapshot; seeing one again means
/// the deduplication step is broken, not that the store hiccuped.
fn check_unseen(existing: &AHashSet<i64>, meta: &Provenance) -> Result<()> {
    if existing.contains(&meta.id) {
        tracing::error!(
            category = %meta.category,
            id = meta.id,
            "duplicate provenance id at insert time: deduplication invariant violated"
        );
        return Err(ExportError::DuplicateProvenance { category: meta.category, id: meta.id });
    }
    Ok(())
}

/// Load one category's intermediate files in batches of `chunk_size`
/// files. Returns the number of destination rows inserted.
pub async fn load_category(
    conn: &mut PgConnection,
    category: Category,
    files: &[PathBuf],
    existing: &AHashSet<i64>,
    chunk_size: usize,
    progress: bool,
) -> Result<u64> {
    let pb = if progress {
        ProgressScope::count(format!("Loading {category} to postgis"), files.len() as u64)
    } else {
        ProgressScope::hidden()
    };

    let mut inserted = 0u64;
    for file_batch in files.chunks(chunk_size.max(1)) {
        match category {
            Category::Alerts => {
                let mut rows: Vec<AlertRow> = Vec::new();
                for path in file_batch {
                    let (meta, payload) = read_intermediate(path)?;
                    check_unseen(existing, &meta)?;
                    rows.extend(prepare_alerts(&payload, &meta)?);
                }
                inserted += insert_alerts(conn, &rows).await?;
            }
            Category::Jams => {
                let mut rows: Vec<JamRow> = Vec::new();
                for path in file_batch {
                    let (meta, payload) = read_intermediate(path)?;
                    check_unseen(existing, &meta)?;
                    rows.extend(prepare_jams(&payload, &meta)?);
                }
                inserted += insert_jams(conn, &rows).await?;
            }
            Category::Irregularities => {
                let mut rows: Vec<IrregularityRow> = Vec::new();
                for path in file_batch {
                    let (meta, payload) = read_intermediate(path)?;
                    check_unseen(existing, &meta)?;
                    rows.extend(prepare_irregularities(&payload, &meta)?);
                }
                inserted += insert_irregularities(conn, &rows).await?;
            }
        }
        pb.inc_items(file_batch.len() as u64);
    }

    pb.finish(format!("{category}: {inserted} rows"));
    tracing::info!(%category, rows = inserted, "loaded");
    Ok(inserted)
}

async fn insert_alerts(conn: &mut PgConnection, rows: &[AlertRow]) -> Result<u64> {
    const COLUMNS: usize = 19;
    let mut inserted = 0u64;
    for slice in rows.chunks((MAX_BIND_PARAMS / COLUMNS).max(1)) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO waze.alerts (uuid, pub_millis, pub_utc_date, road_type, location, \
             street, city, country, magvar, reliability, report_description, report_rating, \
             confidence, \"type\", subtype, report_by_municipality_user, thumbs_up, jam_uuid, \
             datafile_id) ",
        );
        qb.push_values(slice, |mut b, r| {
            b.push_bind(r.uuid.clone())
                .push_bind(r.pub_millis)
                .push_bind(r.pub_utc_date)
                .push_bind(r.road_type)
                .push_bind(r.location.clone())
                .push_bind(r.street.clone())
                .push_bind(r.city.clone())
                .push_bind(r.country.clone())
                .push_bind(r.magvar)
                .push_bind(r.reliability)
                .push_bind(r.report_description.clone())
                .push_bind(r.report_rating)
                .push_bind(r.confidence)
                .push_bind(r.kind.clone())
                .push_bind(r.subtype.clone())
                .push_bind(r.report_by_municipality_user)
                .push_bind(r.thumbs_up)
                .push_bind(r.jam_uuid.clone())
                .push_bind(r.datafile_id);
        });
        inserted += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(inserted)
}

async fn insert_jams(conn: &mut PgConnection, rows: &[JamRow]) -> Result<u64> {
    const COLUMNS: usize = 20;
    let mut inserted = 0u64;
    for slice in rows.chunks((MAX_BIND_PARAMS / COLUMNS).max(1)) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO waze.jams (uuid, pub_millis, pub_utc_date, start_node, end_node, \
             road_type, street, city, country, delay, speed, speed_kmh, length, turn_type, \
             level, blocking_alert_id, line, \"type\", turn_line, datafile_id) ",
        );
        qb.push_values(slice, |mut b, r| {
            b.push_bind(r.uuid.clone())
                .push_bind(r.pub_millis)
                .push_bind(r.pub_utc_date)
                .push_bind(r.start_node.clone())
                .push_bind(r.end_node.clone())
                .push_bind(r.road_type)
                .push_bind(r.street.clone())
                .push_bind(r.city.clone())
                .push_bind(r.country.clone())
                .push_bind(r.delay)
                .push_bind(r.speed)
                .push_bind(r.speed_kmh)
                .push_bind(r.length)
                .push_bind(r.turn_type.clone())
                .push_bind(r.level)
                .push_bind(r.blocking_alert_id.clone())
                .push_bind(r.line.clone())
                .push_bind(r.kind.clone())
                .push_bind(r.turn_line.clone())
                .push_bind(r.datafile_id);
        });
        inserted += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(inserted)
}

async fn insert_irregularities(conn: &mut PgConnection, rows: &[IrregularityRow]) -> Result<u64> {
    const COLUMNS: usize = 30;
    let mut inserted = 0u64;
    for slice in rows.chunks((MAX_BIND_PARAMS / COLUMNS).max(1)) {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO waze.irregularities (uuid, detection_date_millis, detection_date, \
             detection_utc_date, update_date_millis, update_date, update_utc_date, street, \
             city, country, is_highway, speed, regular_speed, delay_seconds, seconds, length, \
             trend, \"type\", severity, jam_level, drivers_count, alerts_count, n_thumbs_up, \
             n_comments, n_images, line, cause_type, start_node, end_node, datafile_id) ",
        );
        qb.push_values(slice, |mut b, r| {
            b.push_bind(r.uuid.clone())
                .push_bind(r.detection_date_millis)
                .push_bind(r.detection_date.clone())
                .push_bind(r.detection_utc_date)
                .push_bind(r.update_date_millis)
                .push_bind(r.update_date.clone())
                .push_bind(r.update_utc_date)
                .push_bind(r.street.clone())
                .push_bind(r.city.clone())
                .push_bind(r.country.clone())
                .push_bind(r.is_highway)
                .push_bind(r.speed)
                .push_bind(r.regular_speed)
                .push_bind(r.delay_seconds)
                .push_bind(r.seconds)
                .push_bind(r.length)
                .push_bind(r.trend)
                .push_bind(r.kind.clone())
                .push_bind(r.severity)
                .push_bind(r.jam_level)
                .push_bind(r.drivers_count)
                .push_bind(r.alerts_count)
                .push_bind(r.n_thumbs_up)
                .push_bind(r.n_comments)
                .push_bind(r.n_images)
                .push_bind(r.line.clone())
                .push_bind(r.cause_type.clone())
                .push_bind(r.start_node.clone())
                .push_bind(r.end_node.clone())
                .push_bind(r.datafile_id);
        });
        inserted += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(inserted)
}

const ALERTS_LOCATION_GEO: &str = "\
UPDATE waze.alerts
SET location_geo = ST_MakePoint((location->>'x')::float8, (location->>'y')::float8)
WHERE location_geo IS NULL
  AND location IS NOT NULL
  AND location->>'x' IS NOT NULL
  AND location->>'y' IS NOT NULL";

const JAMS_LINE_GEO: &str = "\
UPDATE waze.jams
SET line_geo = (
    SELECT ST_MakeLine(ST_MakePoint((pt->>'x')::float8, (pt->>'y')::float8) ORDER BY ord)
    FROM jsonb_array_elements(line) WITH ORDINALITY AS t(pt, ord))
WHERE line_geo IS NULL AND line->0 IS NOT NULL";

const JAMS_TURN_LINE_GEO: &str = "\
UPDATE waze.jams
SET turn_line_geo = (
    SELECT ST_MakeLine(ST_MakePoint((pt->>'x')::float8, (pt->>'y')::float8) ORDER BY ord)
    FROM jsonb_array_elements(turn_line) WITH ORDINALITY AS t(pt, ord))
WHERE turn_line_geo IS NULL AND turn_line->0 IS NOT NULL";

const IRREGULARITIES_LINE_GEO: &str = "\
UPDATE waze.irregularities
SET line_geo = (
    SELECT ST_MakeLine(ST_MakePoint((pt->>'x')::float8, (pt->>'y')::float8) ORDER BY ord)
    FROM jsonb_array_elements(line) WITH ORDINALITY AS t(pt, ord))
WHERE line_geo IS NULL AND line->0 IS NOT NULL";

/// Geometry-derivation statements for one category. Every statement is
/// restricted to rows with null geometry and present coordinate data, so a
/// second pass matches zero rows.
pub fn geometry_statements(category: Category) -> &'static [&'static str] {
    match category {
        Category::Alerts => &[ALERTS_LOCATION_GEO],
        Category::Jams => &[JAMS_LINE_GEO, JAMS_TURN_LINE_GEO],
        Category::Irregularities => &[IRREGULARITIES_LINE_GEO],
    }
}

/// Run the geometry pass for each category; returns rows updated per
/// category.
pub async fn update_geometry(
    conn: &mut PgConnection,
    categories: &[Category],
) -> Result<BTreeMap<Category, u64>> {
    let mut updated = BTreeMap::new();
    for &category in categories {
        let mut rows = 0u64;
        for stmt in geometry_statements(category) {
            rows += (&mut *conn).execute(*stmt).await?.rows_affected();
        }
        tracing::info!(%category, rows, "geometry derived");
        updated.insert(category, rows);
    }
    Ok(updated)
}
