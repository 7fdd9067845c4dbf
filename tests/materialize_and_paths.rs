#[path = "common/mod.rs"]
mod common;

use common::*;
use std::fs::File;
use std::io::Write;
use tetl::{
    ensure_window_dir, id_batches, list_window_files, remove_window_dirs, window_dir, Category,
};

#[test]
fn window_dir_layout_is_root_category_window() {
    let w = window_jan_2023();
    let dir = window_dir("/data/dumps".as_ref(), Category::Jams, &w);
    assert_eq!(dir.to_str().unwrap(), "/data/dumps/jams/2023-01-01--to--2023-01-02");
}

#[test]
fn ensure_window_dir_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let w = window_jan_2023();
    let first = ensure_window_dir(root.path(), Category::Alerts, &w).unwrap();
    let second = ensure_window_dir(root.path(), Category::Alerts, &w).unwrap();
    assert_eq!(first, second);
    assert!(first.is_dir());
}

#[test]
fn written_capture_round_trips_through_the_file() {
    let root = tempfile::tempdir().unwrap();
    let w = window_jan_2023();
    let c = capture(42, "2023-01-01 12:30:00", "America/Sao_Paulo", alerts_payload());

    let paths = materialize_all(root.path(), Category::Alerts, &w, &[c.clone()]);
    assert_eq!(paths.len(), 1);
    assert_eq!(
        paths[0].file_name().unwrap().to_str().unwrap(),
        "alerts--2023-01-01 12:30:00--America-Sao_Paulo--42.json"
    );
    assert_eq!(read_json(&paths[0]), c.payload);
}

#[test]
fn five_ids_with_chunk_size_two_make_three_batches() {
    let ids = [1i64, 2, 3, 4, 5];
    let batches: Vec<&[i64]> = id_batches(&ids, 2).collect();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0], &[1, 2]);
    assert_eq!(batches[1], &[3, 4]);
    assert_eq!(batches[2], &[5]);
    assert!(batches.iter().all(|b| !b.is_empty()));
}

#[test]
fn listing_filters_by_category_prefix_and_sorts() {
    let root = tempfile::tempdir().unwrap();
    let w = window_jan_2023();
    let captures = [
        capture(2, "2023-01-01 09:00:00", "UTC", jams_payload()),
        capture(1, "2023-01-01 08:00:00", "UTC", jams_payload()),
    ];
    materialize_all(root.path(), Category::Jams, &w, &captures);

    // Stray files in the window directory must not be picked up.
    let dir = window_dir(root.path(), Category::Jams, &w);
    File::create(dir.join("notes.txt")).unwrap().write_all(b"scratch").unwrap();
    File::create(dir.join("alerts--2023-01-01 08:00:00--UTC--9.json"))
        .unwrap()
        .write_all(b"[]")
        .unwrap();

    let files = list_window_files(root.path(), Category::Jams, &w);
    let names: Vec<&str> =
        files.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "jams--2023-01-01 08:00:00--UTC--1.json",
            "jams--2023-01-01 09:00:00--UTC--2.json",
        ]
    );
}

#[test]
fn listing_a_missing_window_is_empty() {
    let root = tempfile::tempdir().unwrap();
    assert!(list_window_files(root.path(), Category::Alerts, &window_jan_2023()).is_empty());
}

#[test]
fn cleanup_removes_window_dirs_and_tolerates_absent_ones() {
    let root = tempfile::tempdir().unwrap();
    let w = window_jan_2023();
    let c = capture(1, "2023-01-01 08:00:00", "UTC", alerts_payload());
    materialize_all(root.path(), Category::Alerts, &w, &[c]);
    assert!(window_dir(root.path(), Category::Alerts, &w).exists());

    // Alerts dir exists, jams dir never did; both are fine.
    remove_window_dirs(root.path(), &[Category::Alerts, Category::Jams], &w).unwrap();
    assert!(!window_dir(root.path(), Category::Alerts, &w).exists());

    remove_window_dirs(root.path(), &[Category::Alerts], &w).unwrap();
}
