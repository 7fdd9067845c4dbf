use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tetl::{Capture, Category, ExportWindow};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// The window used by most scenarios: `2023-01-01` to `2023-01-02`.
pub fn window_jan_2023() -> ExportWindow {
    ExportWindow::new(date(2023, 1, 1), date(2023, 1, 2)).unwrap()
}

/// Two alerts: one fully populated (with a point location), one sparse.
pub fn alerts_payload() -> Value {
    json!([
        {
            "uuid": "a1b2c3",
            "pubMillis": 1_672_569_000_000_i64,
            "roadType": 2,
            "location": {"x": -46.633, "y": -23.550},
            "street": "Av. Paulista",
            "city": "São Paulo",
            "country": "BR",
            "magvar": 180,
            "reliability": 7,
            "reportRating": 3,
            "confidence": 1,
            "type": "JAM",
            "subtype": "JAM_HEAVY_TRAFFIC",
            "reportByMunicipalityUser": false,
            "nThumbsUp": 4,
            "jamUuid": "j-77"
        },
        {
            "uuid": "d4e5f6",
            "pubMillis": 1_672_569_060_000_i64,
            "type": "ACCIDENT"
        }
    ])
}

/// Two jams: one with a coordinate line, one with none (its geometry must
/// stay null after the derivation pass).
pub fn jams_payload() -> Value {
    json!([
        {
            "uuid": "jam-1",
            "pubMillis": 1_672_569_000_000_i64,
            "startNode": "Rua A",
            "endNode": "Rua B",
            "roadType": 2,
            "street": "Marginal Tietê",
            "city": "São Paulo",
            "country": "BR",
            "delay": 120,
            "speed": 3.5,
            "length": 500,
            "turnType": "NONE",
            "level": 3,
            "line": [{"x": -46.60, "y": -23.50}, {"x": -46.61, "y": -23.51}],
            "type": "NONE"
        },
        {
            "uuid": "jam-2",
            "pubMillis": 1_672_569_060_000_i64,
            "line": null,
            "type": "NONE"
        }
    ])
}

pub fn irregularities_payload() -> Value {
    json!([
        {
            "id": 123_456,
            "detectionDateMillis": 1_672_660_800_000_i64,
            "detectionDate": "Mon Jan 02 12:00:00 +0000 2023",
            "updateDateMillis": 1_672_664_400_000_i64,
            "updateDate": "Mon Jan 02 13:00:00 +0000 2023",
            "street": "Av. Rebouças",
            "city": "São Paulo",
            "country": "BR",
            "isHighway": true,
            "speed": 12.3,
            "regularSpeed": 50.0,
            "delaySeconds": 600,
            "seconds": 300,
            "length": 1500,
            "trend": 1,
            "type": "NONE",
            "severity": 2.5,
            "jamLevel": 3,
            "driversCount": 42,
            "alertsCount": 5,
            "nThumbsUp": 2,
            "nComments": 0,
            "nImages": 0,
            "line": [{"x": -46.60, "y": -23.50}, {"x": -46.62, "y": -23.52}]
        }
    ])
}

pub fn capture(id: i64, start_time: &str, timezone: &str, payload: Value) -> Capture {
    Capture { id, start_time: ts(start_time), timezone: timezone.to_string(), payload }
}

/// Materialize captures into the window directory of a category, returning
/// the written paths.
pub fn materialize_all(
    output_root: &Path,
    category: Category,
    window: &ExportWindow,
    captures: &[Capture],
) -> Vec<PathBuf> {
    let dir = tetl::ensure_window_dir(output_root, category, window).unwrap();
    captures
        .iter()
        .map(|c| tetl::write_capture(&dir, category, c).unwrap())
        .collect()
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_reader(BufReader::new(File::open(path).unwrap())).unwrap()
}
