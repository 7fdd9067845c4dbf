#[path = "common/mod.rs"]
mod common;

use common::*;
use tetl::{CaptureQuery, Category};

#[test]
fn window_query_selects_full_projection_with_bound_range() {
    let sql = CaptureQuery::window(Category::Jams, window_jan_2023()).sql();
    assert_eq!(
        sql,
        "SELECT `id`, `start_time`, `timezone`, `raw_json` FROM `jams` \
         WHERE `start_time` >= ? AND `start_time` < ?"
    );
}

#[test]
fn id_scan_projects_only_the_id_column() {
    let sql = CaptureQuery::window_ids(Category::Alerts, window_jan_2023()).sql();
    assert_eq!(sql, "SELECT `id` FROM `alerts` WHERE `start_time` >= ? AND `start_time` < ?");
}

#[test]
fn id_selection_uses_one_placeholder_per_id() {
    let sql = CaptureQuery::by_ids(Category::Irregularities, vec![1, 2, 3]).sql();
    assert_eq!(
        sql,
        "SELECT `id`, `start_time`, `timezone`, `raw_json` FROM `irregularities` \
         WHERE `id` IN (?, ?, ?)"
    );
    assert_eq!(sql.matches('?').count(), 3);
}

#[test]
fn no_raw_values_appear_in_the_sql_text() {
    let sql = CaptureQuery::by_ids(Category::Alerts, vec![41, 42]).sql();
    assert!(!sql.contains("41"));
    assert!(!sql.contains("42"));

    let sql = CaptureQuery::window(Category::Alerts, window_jan_2023()).sql();
    assert!(!sql.contains("2023"));
}

#[test]
#[should_panic(expected = "id selection must not be empty")]
fn empty_id_selection_is_a_caller_bug() {
    let _ = CaptureQuery::by_ids(Category::Alerts, vec![]);
}
