#[path = "common/mod.rs"]
mod common;

use common::*;
use tetl::{Category, Provenance};

#[test]
fn filename_round_trips_for_every_category() {
    for category in Category::ALL {
        let tag = Provenance {
            category,
            start_time: ts("2023-01-01 12:30:00"),
            timezone: "America/Sao_Paulo".to_string(),
            id: 42,
        };
        let parsed = Provenance::parse(&tag.file_name()).unwrap();
        assert_eq!(parsed, tag);
    }
}

#[test]
fn filename_encodes_slashless_timezone() {
    let tag = Provenance {
        category: Category::Alerts,
        start_time: ts("2023-01-01 12:30:00"),
        timezone: "America/Sao_Paulo".to_string(),
        id: 7,
    };
    assert_eq!(
        tag.file_name(),
        "alerts--2023-01-01 12:30:00--America-Sao_Paulo--7.json"
    );
}

#[test]
fn parse_recovers_timestamp_id_and_timezone() {
    let parsed =
        Provenance::parse("jams--2023-01-01 08:00:00--Europe-Paris--1234.json").unwrap();
    assert_eq!(parsed.category, Category::Jams);
    assert_eq!(parsed.start_time, ts("2023-01-01 08:00:00"));
    assert_eq!(parsed.timezone, "Europe/Paris");
    assert_eq!(parsed.id, 1234);
}

#[test]
fn parse_rejects_malformed_names() {
    // wrong extension
    assert!(Provenance::parse("alerts--2023-01-01 08:00:00--UTC--1.txt").is_err());
    // missing separator fields
    assert!(Provenance::parse("alerts--2023-01-01 08:00:00--1.json").is_err());
    // unknown category
    assert!(Provenance::parse("potholes--2023-01-01 08:00:00--UTC--1.json").is_err());
    // unparseable timestamp
    assert!(Provenance::parse("alerts--yesterday--UTC--1.json").is_err());
    // non-numeric id
    assert!(Provenance::parse("alerts--2023-01-01 08:00:00--UTC--one.json").is_err());
}
