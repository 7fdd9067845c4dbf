//! Destination schema bootstrap: the WazeCCPProcessor-compatible `waze`
//! schema, its reference tables, and idempotent seed data.
//!
//! The destination database must already have the PostGIS extension
//! available; `ensure_schema` attempts an idempotent `CREATE EXTENSION`
//! but tolerates the failure an unprivileged role would get.

use crate::error::Result;
use sqlx::postgres::PgConnection;
use sqlx::{Executor, Postgres, QueryBuilder};

pub const SCHEMA: &str = "waze";

const CREATE_EXTENSION: &str = "CREATE EXTENSION IF NOT EXISTS postgis";
const CREATE_SCHEMA: &str = "CREATE SCHEMA IF NOT EXISTS waze";
const DROP_SCHEMA: &str = "DROP SCHEMA IF EXISTS waze CASCADE";

/// Table and index DDL, in dependency order. Every statement is idempotent.
pub const DDL_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS waze.alerts (
        id SERIAL PRIMARY KEY,
        uuid TEXT NOT NULL,
        pub_millis BIGINT NOT NULL,
        pub_utc_date TIMESTAMP,
        road_type INTEGER,
        location JSONB,
        location_geo GEOMETRY(POINT),
        street TEXT,
        city TEXT,
        country TEXT,
        magvar INTEGER,
        reliability INTEGER,
        report_description TEXT,
        report_rating INTEGER,
        confidence INTEGER,
        \"type\" TEXT,
        subtype TEXT,
        report_by_municipality_user BOOLEAN,
        thumbs_up INTEGER,
        jam_uuid TEXT,
        datafile_id BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS waze.jams (
        id SERIAL PRIMARY KEY,
        uuid TEXT NOT NULL,
        pub_millis BIGINT NOT NULL,
        pub_utc_date TIMESTAMP,
        start_node TEXT,
        end_node TEXT,
        road_type INTEGER,
        street TEXT,
        city TEXT,
        country TEXT,
        delay INTEGER,
        speed DOUBLE PRECISION,
        speed_kmh DOUBLE PRECISION,
        length INTEGER,
        turn_type TEXT,
        level INTEGER,
        blocking_alert_id TEXT,
        line JSONB,
        line_geo GEOMETRY(LINESTRING),
        \"type\" TEXT,
        turn_line JSONB,
        turn_line_geo GEOMETRY(LINESTRING),
        datafile_id BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS waze.irregularities (
        id SERIAL PRIMARY KEY,
        uuid TEXT NOT NULL,
        detection_date_millis BIGINT NOT NULL,
        detection_date TEXT,
        detection_utc_date TIMESTAMP,
        update_date_millis BIGINT NOT NULL,
        update_date TEXT,
        update_utc_date TIMESTAMP,
        street TEXT,
        city TEXT,
        country TEXT,
        is_highway BOOLEAN,
        speed DOUBLE PRECISION,
        regular_speed DOUBLE PRECISION,
        delay_seconds INTEGER,
        seconds INTEGER,
        length INTEGER,
        trend INTEGER,
        \"type\" TEXT,
        severity DOUBLE PRECISION,
        jam_level INTEGER,
        drivers_count INTEGER,
        alerts_count INTEGER,
        n_thumbs_up INTEGER,
        n_comments INTEGER,
        n_images INTEGER,
        line JSONB,
        line_geo GEOMETRY(LINESTRING),
        cause_type TEXT,
        start_node TEXT,
        end_node TEXT,
        datafile_id BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS waze.coordinate_type (
        id INTEGER PRIMARY KEY,
        type_name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS waze.roads (
        id SERIAL PRIMARY KEY,
        value INTEGER NOT NULL,
        name VARCHAR(100) NOT NULL,
        CONSTRAINT roads_unique_combo UNIQUE (value, name)
    )",
    "CREATE TABLE IF NOT EXISTS waze.alert_types (
        id SERIAL PRIMARY KEY,
        \"type\" TEXT NOT NULL,
        subtype TEXT,
        CONSTRAINT alert_types_unique_combo UNIQUE (\"type\", subtype)
    )",
    "CREATE TABLE IF NOT EXISTS waze.coordinates (
        id VARCHAR(40) PRIMARY KEY,
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        \"order\" INTEGER NOT NULL,
        jam_id INTEGER REFERENCES waze.jams (id),
        irregularity_id INTEGER REFERENCES waze.irregularities (id),
        alert_id INTEGER REFERENCES waze.alerts (id),
        coordinate_type_id INTEGER REFERENCES waze.coordinate_type (id)
    )",
    "CREATE INDEX IF NOT EXISTS alerts_datafile_id_idx ON waze.alerts (datafile_id)",
    "CREATE INDEX IF NOT EXISTS jams_datafile_id_idx ON waze.jams (datafile_id)",
    "CREATE INDEX IF NOT EXISTS irregularities_datafile_id_idx ON waze.irregularities (datafile_id)",
    "CREATE INDEX IF NOT EXISTS alerts_pub_utc_date_idx ON waze.alerts (pub_utc_date)",
    "CREATE INDEX IF NOT EXISTS jams_pub_utc_date_idx ON waze.jams (pub_utc_date)",
    "CREATE INDEX IF NOT EXISTS irregularities_detection_utc_date_idx ON waze.irregularities (detection_utc_date)",
];

pub const COORDINATE_TYPE_SEEDS: &[(i32, &str)] =
    &[(1, "Line"), (2, "Turn Line"), (3, "Location")];

pub const ROAD_SEEDS: &[(i32, &str)] = &[
    (1, "Streets"),
    (2, "Primary Street"),
    (3, "Freeways"),
    (4, "Ramps"),
    (5, "Trails"),
    (6, "Primary"),
    (7, "Secondary"),
    (8, "4X4 Trails"),
    (9, "Walkway"),
    (10, "Pedestrian"),
    (11, "Exit"),
    (12, "?"),
    (13, "?"),
    (14, "4X4 Trails"),
    (15, "Ferry crossing"),
    (16, "Stairway"),
    (17, "Private road"),
    (18, "Railroads"),
    (19, "Runway/Taxiway"),
    (20, "Parking lot road"),
    (21, "Service road"),
];

pub const ALERT_TYPE_SEEDS: &[(&str, &str)] = &[
    ("ACCIDENT", "ACCIDENT_MINOR"),
    ("ACCIDENT", "ACCIDENT_MAJOR"),
    ("ACCIDENT", "NO_SUBTYPE"),
    ("JAM", "JAM_MODERATE_TRAFFIC"),
    ("JAM", "JAM_HEAVY_TRAFFIC"),
    ("JAM", "JAM_STAND_STILL_TRAFFIC"),
    ("JAM", "JAM_LIGHT_TRAFFIC"),
    ("JAM", "NO_SUBTYPE"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_SHOULDER"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_OBJECT"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_POT_HOLE"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_ROAD_KILL"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_SHOULDER_CAR_STOPPED"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_SHOULDER_ANIMALS"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_SHOULDER_MISSING_SIGN"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_FOG"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_HAIL"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_HEAVY_RAIN"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_HEAVY_SNOW"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_FLOOD"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_MONSOON"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_TORNADO"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_HEAT_WAVE"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_HURRICANE"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_WEATHER_FREEZING_RAIN"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_LANE_CLOSED"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_OIL"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_ICE"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_CONSTRUCTION"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_CAR_STOPPED"),
    ("WEATHERHAZARD/HAZARD", "HAZARD_ON_ROAD_TRAFFIC_LIGHT_FAULT"),
    ("WEATHERHAZARD/HAZARD", "NO_SUBTYPE"),
    ("MISC", "NO_SUBTYPE"),
    ("CONSTRUCTION", "NO_SUBTYPE"),
    ("ROAD_CLOSED", "ROAD_CLOSED_HAZARD"),
    ("ROAD_CLOSED", "ROAD_CLOSED_CONSTRUCTION"),
    ("ROAD_CLOSED", "ROAD_CLOSED_EVENT"),
];

/// Result of one idempotent seed pass. A row already present is skipped,
/// never an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub inserted: u64,
    pub skipped: u64,
}

impl SeedOutcome {
    fn absorb(&mut self, attempted: u64, inserted: u64) {
        self.inserted += inserted;
        self.skipped += attempted - inserted;
    }
}

/// Idempotently create the destination schema and tables. With
/// `force_reset`, drop the whole schema first.
pub async fn ensure_schema(conn: &mut PgConnection, force_reset: bool) -> Result<()> {
    if force_reset {
        tracing::warn!("force reset: dropping schema {SCHEMA}");
        (&mut *conn).execute(DROP_SCHEMA).await?;
    }
    if let Err(e) = (&mut *conn).execute(CREATE_EXTENSION).await {
        tracing::warn!("could not create postgis extension (assuming it exists): {e}");
    }
    (&mut *conn).execute(CREATE_SCHEMA).await?;
    for stmt in DDL_STATEMENTS {
        (&mut *conn).execute(*stmt).await?;
    }
    Ok(())
}

/// Seed the fixed reference tables with insert-or-ignore semantics.
pub async fn seed_reference_tables(conn: &mut PgConnection) -> Result<SeedOutcome> {
    let mut outcome = SeedOutcome::default();

    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO waze.coordinate_type (id, type_name) ");
    qb.push_values(COORDINATE_TYPE_SEEDS, |mut b, (id, name)| {
        b.push_bind(*id).push_bind(*name);
    });
    qb.push(" ON CONFLICT DO NOTHING");
    let res = qb.build().execute(&mut *conn).await?;
    outcome.absorb(COORDINATE_TYPE_SEEDS.len() as u64, res.rows_affected());

    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO waze.roads (value, name) ");
    qb.push_values(ROAD_SEEDS, |mut b, (value, name)| {
        b.push_bind(*value).push_bind(*name);
    });
    qb.push(" ON CONFLICT DO NOTHING");
    let res = qb.build().execute(&mut *conn).await?;
    outcome.absorb(ROAD_SEEDS.len() as u64, res.rows_affected());

    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO waze.alert_types (\"type\", subtype) ");
    qb.push_values(ALERT_TYPE_SEEDS, |mut b, (kind, subtype)| {
        b.push_bind(*kind).push_bind(*subtype);
    });
    qb.push(" ON CONFLICT DO NOTHING");
    let res = qb.build().execute(&mut *conn).await?;
    outcome.absorb(ALERT_TYPE_SEEDS.len() as u64, res.rows_affected());

    tracing::info!(inserted = outcome.inserted, skipped = outcome.skipped, "reference tables seeded");
    Ok(outcome)
}
