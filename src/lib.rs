mod category;
mod config;
mod date;
mod error;
mod query;
mod provenance;
mod paths;

mod source;
mod dedupe;
mod materialize;
mod schema;
mod prepare;
mod load;

mod pipeline;
mod progress;
mod util;

pub use crate::category::Category;
pub use crate::config::ExportOptions;
pub use crate::date::ExportWindow;
pub use crate::error::{ExportError, Result};
pub use crate::pipeline::{RunOutcome, RunReport, TrafficETL};

pub use crate::provenance::{Provenance, FILE_EXTENSION, START_TIME_FORMAT};
pub use crate::query::{CaptureQuery, Projection, Selection};

// Expose the pure deduplication core.
pub use crate::dedupe::{fully_exported, pending_by_category, pending_ids};

// Expose the reader/materializer building blocks used by integration tests
// and downstream tooling.
pub use crate::materialize::{id_batches, write_capture};
pub use crate::paths::{ensure_window_dir, list_window_files, remove_window_dirs, window_dir};
pub use crate::source::Capture;

// Destination-side surface: DDL, seeds and the geometry pass.
pub use crate::load::geometry_statements;
pub use crate::prepare::{
    prepare_alerts, prepare_irregularities, prepare_jams, AlertRow, IrregularityRow, JamRow,
    FOREIGN_DATE_FORMAT,
};
pub use crate::schema::{
    SeedOutcome, ALERT_TYPE_SEEDS, COORDINATE_TYPE_SEEDS, DDL_STATEMENTS, ROAD_SEEDS, SCHEMA,
};

// Expose progress helpers for the binary.
pub use crate::progress::ProgressScope;
pub use crate::util::init_tracing_once;
