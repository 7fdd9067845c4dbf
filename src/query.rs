//! Typed selection predicates over the source capture store.
//!
//! Bounds and ids are always bound as parameters; the only identifiers
//! spliced into the SQL text come from the closed `Category` enum.

use crate::category::Category;
use crate::date::ExportWindow;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;

/// Column set fetched from the source store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    /// id, start_time, timezone and raw payload.
    Full,
    /// id only; used for the deduplication scan.
    IdOnly,
}

/// Row selection: either a time window or an explicit id list.
#[derive(Clone, Debug)]
pub enum Selection {
    Window(ExportWindow),
    Ids(Vec<i64>),
}

#[derive(Clone, Debug)]
pub struct CaptureQuery {
    pub category: Category,
    pub selection: Selection,
    pub projection: Projection,
}

impl CaptureQuery {
    /// Full records whose start time falls inside the window.
    pub fn window(category: Category, window: ExportWindow) -> Self {
        Self { category, selection: Selection::Window(window), projection: Projection::Full }
    }

    /// Id-only projection of the window, for the deduplication scan.
    pub fn window_ids(category: Category, window: ExportWindow) -> Self {
        Self { category, selection: Selection::Window(window), projection: Projection::IdOnly }
    }

    /// Full records for an explicit id list (post-deduplication pass).
    /// Empty id lists are a caller bug: the category must be dropped from
    /// the run instead.
    pub fn by_ids(category: Category, ids: Vec<i64>) -> Self {
        assert!(!ids.is_empty(), "id selection must not be empty");
        Self { category, selection: Selection::Ids(ids), projection: Projection::Full }
    }

    pub fn sql(&self) -> String {
        let columns = match self.projection {
            Projection::Full => "`id`, `start_time`, `timezone`, `raw_json`",
            Projection::IdOnly => "`id`",
        };
        let table = self.category.table();
        match &self.selection {
            Selection::Window(_) => format!(
                "SELECT {columns} FROM `{table}` WHERE `start_time` >= ? AND `start_time` < ?"
            ),
            Selection::Ids(ids) => {
                let marks = vec!["?"; ids.len()].join(", ");
                format!("SELECT {columns} FROM `{table}` WHERE `id` IN ({marks})")
            }
        }
    }

    /// Bind this query's values onto a prepared statement for `sql()`.
    pub fn bind<'q>(
        &self,
        query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        match &self.selection {
            Selection::Window(w) => query.bind(w.initial_datetime()).bind(w.final_datetime()),
            Selection::Ids(ids) => {
                let mut query = query;
                for id in ids {
                    query = query.bind(*id);
                }
                query
            }
        }
    }
}
