//! Export orchestration: window resolution, deduplication, materialization,
//! loading and cleanup, in that order, with a short-circuit to a clean
//! "nothing to export" outcome.
//!
//! The pipeline is sequential and single-threaded. Each stage opens its own
//! store connection and drops it before the next stage begins; the
//! deduplication snapshot is read once, so concurrent runs against the same
//! destination schema must be serialized by the caller.

use crate::category::Category;
use crate::config::ExportOptions;
use crate::date::ExportWindow;
use crate::dedupe;
use crate::error::Result;
use crate::load;
use crate::materialize;
use crate::paths;
use crate::schema::{self, SeedOutcome};
use crate::source;
use crate::util::init_tracing_once;
use ahash::AHashSet;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Clone)]
pub struct TrafficETL {
    opts: ExportOptions,
}

/// Counters of one completed run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub window: ExportWindow,
    pub seeds: SeedOutcome,
    pub files_written: u64,
    pub rows_inserted: BTreeMap<Category, u64>,
    pub geometry_rows_updated: BTreeMap<Category, u64>,
}

/// Terminal state of a run. `NothingToExport` is a success: the window was
/// already fully exported and no file or row was written.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    NothingToExport { window: ExportWindow },
}

impl TrafficETL {
    pub fn new() -> Self {
        Self { opts: ExportOptions::default() }
    }

    // -------- Builder methods --------
    pub fn categories<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        self.opts = self.opts.with_categories(categories);
        self
    }
    pub fn time_range(mut self, days: i64) -> Self { self.opts = self.opts.with_time_range(days); self }
    pub fn date_range(mut self, initial: NaiveDate, last: NaiveDate) -> Self { self.opts = self.opts.with_date_range(initial, last); self }
    pub fn chunk_size(mut self, rows: usize) -> Self { self.opts = self.opts.with_chunk_size(rows); self }
    pub fn output_root(mut self, root: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_root(root); self }
    pub fn source(mut self, url: impl Into<String>, database: impl Into<String>) -> Self { self.opts = self.opts.with_source(url, database); self }
    pub fn dest(mut self, url: impl Into<String>) -> Self { self.opts = self.opts.with_dest(url); self }
    pub fn force_reset(mut self, yes: bool) -> Self { self.opts = self.opts.with_force_reset(yes); self }
    pub fn log_queries(mut self, yes: bool) -> Self { self.opts = self.opts.with_log_queries(yes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }

    pub fn options(&self) -> &ExportOptions {
        &self.opts
    }

    /// Run the pipeline with the window anchored at the current date.
    pub async fn run(self) -> Result<RunOutcome> {
        let today = Utc::now().date_naive();
        self.run_at(today).await
    }

    /// Run with an explicit "today", for replays and tests.
    pub async fn run_at(self, today: NaiveDate) -> Result<RunOutcome> {
        init_tracing_once();
        let opts = &self.opts;

        // INIT: everything that can fail without I/O fails here.
        opts.validate()?;
        let window = ExportWindow::resolve(
            opts.time_range_days,
            opts.initial_date,
            opts.final_date,
            today,
        )?;
        tracing::info!(window = %window.name(), categories = ?opts.categories, "export run started");

        // Destination prep + provenance snapshot. The schema must exist
        // before the snapshot query.
        let mut existing: BTreeMap<Category, AHashSet<i64>> = BTreeMap::new();
        let seeds: SeedOutcome;
        {
            let mut dest = load::connect_dest(&opts.dest_url).await?;
            schema::ensure_schema(&mut dest, opts.force_reset).await?;
            seeds = schema::seed_reference_tables(&mut dest).await?;
            for &category in &opts.categories {
                existing.insert(category, load::existing_ids(&mut dest, category).await?);
            }
        }

        // DEDUPLICATE: id-only window scan, then set difference.
        let mut window_ids: BTreeMap<Category, AHashSet<i64>> = BTreeMap::new();
        {
            let mut src = source::connect_source(&opts.source_url, &opts.source_database).await?;
            for &category in &opts.categories {
                let ids = source::window_ids(
                    &mut src,
                    category,
                    &window,
                    opts.chunk_size,
                    opts.log_queries,
                )
                .await?;
                window_ids.insert(category, ids);
            }
        }

        let pending = dedupe::pending_by_category(&window_ids, &existing);
        if dedupe::fully_exported(&pending) {
            tracing::info!(window = %window.name(), "all data already exported");
            return Ok(RunOutcome::NothingToExport { window });
        }
        // Exhausted categories drop out of the run; the rest continue.
        let active: Vec<(Category, Vec<i64>)> =
            pending.into_iter().filter(|(_, ids)| !ids.is_empty()).collect();
        let active_categories: Vec<Category> = active.iter().map(|(c, _)| *c).collect();

        // MATERIALIZE
        let mut files_written = 0u64;
        {
            let mut src = source::connect_source(&opts.source_url, &opts.source_database).await?;
            for (category, ids) in &active {
                files_written +=
                    materialize::materialize_category(&mut src, *category, ids, &window, opts)
                        .await?;
            }
        }

        // LOAD
        let mut rows_inserted: BTreeMap<Category, u64> = BTreeMap::new();
        let geometry_rows_updated: BTreeMap<Category, u64>;
        let no_ids = AHashSet::new();
        {
            let mut dest = load::connect_dest(&opts.dest_url).await?;
            for &category in &active_categories {
                let files = paths::list_window_files(&opts.output_root, category, &window);
                let rows = load::load_category(
                    &mut dest,
                    category,
                    &files,
                    existing.get(&category).unwrap_or(&no_ids),
                    opts.chunk_size,
                    opts.progress,
                )
                .await?;
                rows_inserted.insert(category, rows);
            }
            geometry_rows_updated = load::update_geometry(&mut dest, &active_categories).await?;
        }

        // CLEANUP: intermediate files only outlive a failed run.
        paths::remove_window_dirs(&opts.output_root, &active_categories, &window)?;

        tracing::info!(window = %window.name(), files = files_written, "export run completed");
        Ok(RunOutcome::Completed(RunReport {
            window,
            seeds,
            files_written,
            rows_inserted,
            geometry_rows_updated,
        }))
    }
}
