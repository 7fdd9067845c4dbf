//! Payload-to-row remapping for the destination schema.
//!
//! Each intermediate file holds the raw array of one capture; every element
//! becomes one destination row stamped with the capture's provenance id.
//! Any malformed element aborts the run: silently skipping a record would
//! leave a hole the deduplication step can never detect again.

use crate::error::{ExportError, Result};
use crate::provenance::Provenance;
use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

/// Format of irregularity detection/update dates, e.g.
/// `Mon Jan 02 12:00:00 +0000 2023`.
pub const FOREIGN_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Clone, Debug, PartialEq)]
pub struct AlertRow {
    pub uuid: Option<String>,
    pub pub_millis: Option<i64>,
    pub pub_utc_date: NaiveDateTime,
    pub road_type: Option<i32>,
    pub location: Option<Value>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub magvar: Option<i32>,
    pub reliability: Option<i32>,
    pub report_description: Option<String>,
    pub report_rating: Option<i32>,
    pub confidence: Option<i32>,
    pub kind: Option<String>,
    pub subtype: Option<String>,
    pub report_by_municipality_user: Option<bool>,
    pub thumbs_up: Option<i32>,
    pub jam_uuid: Option<String>,
    pub datafile_id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JamRow {
    pub uuid: Option<String>,
    pub pub_millis: Option<i64>,
    pub pub_utc_date: NaiveDateTime,
    pub start_node: Option<String>,
    pub end_node: Option<String>,
    pub road_type: Option<i32>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub delay: Option<i32>,
    pub speed: Option<f64>,
    pub speed_kmh: Option<f64>,
    pub length: Option<i32>,
    pub turn_type: Option<String>,
    pub level: Option<i32>,
    pub blocking_alert_id: Option<String>,
    pub line: Option<Value>,
    pub kind: Option<String>,
    pub turn_line: Option<Value>,
    pub datafile_id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IrregularityRow {
    pub uuid: Option<String>,
    pub detection_date_millis: Option<i64>,
    pub detection_date: Option<String>,
    pub detection_utc_date: NaiveDateTime,
    pub update_date_millis: Option<i64>,
    pub update_date: Option<String>,
    pub update_utc_date: NaiveDateTime,
    pub street: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub is_highway: Option<bool>,
    pub speed: Option<f64>,
    pub regular_speed: Option<f64>,
    pub delay_seconds: Option<i32>,
    pub seconds: Option<i32>,
    pub length: Option<i32>,
    pub trend: Option<i32>,
    pub kind: Option<String>,
    pub severity: Option<f64>,
    pub jam_level: Option<i32>,
    pub drivers_count: Option<i32>,
    pub alerts_count: Option<i32>,
    pub n_thumbs_up: Option<i32>,
    pub n_comments: Option<i32>,
    pub n_images: Option<i32>,
    pub line: Option<Value>,
    pub cause_type: Option<String>,
    pub start_node: Option<String>,
    pub end_node: Option<String>,
    pub datafile_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAlert {
    uuid: Option<String>,
    pub_millis: Option<i64>,
    road_type: Option<i32>,
    location: Option<Value>,
    street: Option<String>,
    city: Option<String>,
    country: Option<String>,
    magvar: Option<i32>,
    reliability: Option<i32>,
    report_description: Option<String>,
    report_rating: Option<i32>,
    confidence: Option<i32>,
    #[serde(rename = "type")]
    kind: Option<String>,
    subtype: Option<String>,
    report_by_municipality_user: Option<bool>,
    n_thumbs_up: Option<i32>,
    jam_uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJam {
    uuid: Option<String>,
    pub_millis: Option<i64>,
    start_node: Option<String>,
    end_node: Option<String>,
    road_type: Option<i32>,
    street: Option<String>,
    city: Option<String>,
    country: Option<String>,
    delay: Option<i32>,
    speed: Option<f64>,
    length: Option<i32>,
    turn_type: Option<String>,
    level: Option<i32>,
    blocking_alert_id: Option<String>,
    line: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<String>,
    turn_line: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIrregularity {
    id: Option<Value>,
    detection_date_millis: Option<i64>,
    detection_date: Option<String>,
    update_date_millis: Option<i64>,
    update_date: Option<String>,
    street: Option<String>,
    city: Option<String>,
    country: Option<String>,
    is_highway: Option<bool>,
    speed: Option<f64>,
    regular_speed: Option<f64>,
    delay_seconds: Option<i32>,
    seconds: Option<i32>,
    length: Option<i32>,
    trend: Option<i32>,
    #[serde(rename = "type")]
    kind: Option<String>,
    severity: Option<f64>,
    jam_level: Option<i32>,
    drivers_count: Option<i32>,
    alerts_count: Option<i32>,
    n_thumbs_up: Option<i32>,
    n_comments: Option<i32>,
    n_images: Option<i32>,
    line: Option<Value>,
    cause_type: Option<String>,
    start_node: Option<String>,
    end_node: Option<String>,
}

fn payload_array<'a>(payload: &'a Value, meta: &Provenance) -> Result<&'a [Value]> {
    payload.as_array().map(Vec::as_slice).ok_or_else(|| {
        ExportError::Decode(format!(
            "capture {} ({}): payload is not an array",
            meta.id, meta.category
        ))
    })
}

fn element<T: serde::de::DeserializeOwned>(raw: &Value, meta: &Provenance) -> Result<T> {
    serde_json::from_value(raw.clone()).map_err(|e| {
        ExportError::Decode(format!("capture {} ({}): {e}", meta.id, meta.category))
    })
}

/// The feed stamps these dates as UTC wall time regardless of the printed
/// offset; convert to the capture's local timezone and store the local
/// wall-clock value.
fn to_local_naive(s: &str, tz: Tz, meta: &Provenance) -> Result<NaiveDateTime> {
    let parsed = DateTime::parse_from_str(s, FOREIGN_DATE_FORMAT).map_err(|e| {
        ExportError::Decode(format!("capture {}: bad date {s:?}: {e}", meta.id))
    })?;
    Ok(parsed.naive_local().and_utc().with_timezone(&tz).naive_local())
}

fn capture_timezone(meta: &Provenance) -> Result<Tz> {
    meta.timezone.parse().map_err(|_| {
        ExportError::Decode(format!(
            "capture {}: unknown timezone {:?}",
            meta.id, meta.timezone
        ))
    })
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn prepare_alerts(payload: &Value, meta: &Provenance) -> Result<Vec<AlertRow>> {
    payload_array(payload, meta)?
        .iter()
        .map(|raw| {
            let raw: RawAlert = element(raw, meta)?;
            Ok(AlertRow {
                uuid: raw.uuid,
                pub_millis: raw.pub_millis,
                pub_utc_date: meta.start_time,
                road_type: raw.road_type,
                location: raw.location,
                street: raw.street,
                city: raw.city,
                country: raw.country,
                magvar: raw.magvar,
                reliability: raw.reliability,
                report_description: raw.report_description,
                report_rating: raw.report_rating,
                confidence: raw.confidence,
                kind: raw.kind,
                subtype: raw.subtype,
                report_by_municipality_user: raw.report_by_municipality_user,
                thumbs_up: raw.n_thumbs_up,
                jam_uuid: raw.jam_uuid,
                datafile_id: meta.id,
            })
        })
        .collect()
}

pub fn prepare_jams(payload: &Value, meta: &Provenance) -> Result<Vec<JamRow>> {
    payload_array(payload, meta)?
        .iter()
        .map(|raw| {
            let raw: RawJam = element(raw, meta)?;
            Ok(JamRow {
                uuid: raw.uuid,
                pub_millis: raw.pub_millis,
                pub_utc_date: meta.start_time,
                start_node: raw.start_node,
                end_node: raw.end_node,
                road_type: raw.road_type,
                street: raw.street,
                city: raw.city,
                country: raw.country,
                delay: raw.delay,
                // the feed reports one speed; both columns carry it
                speed: raw.speed,
                speed_kmh: raw.speed,
                length: raw.length,
                turn_type: raw.turn_type,
                level: raw.level,
                blocking_alert_id: raw.blocking_alert_id,
                line: raw.line,
                kind: raw.kind,
                turn_line: raw.turn_line,
                datafile_id: meta.id,
            })
        })
        .collect()
}

pub fn prepare_irregularities(payload: &Value, meta: &Provenance) -> Result<Vec<IrregularityRow>> {
    let tz = capture_timezone(meta)?;
    payload_array(payload, meta)?
        .iter()
        .map(|raw| {
            let raw: RawIrregularity = element(raw, meta)?;
            let detection_date = raw.detection_date.ok_or_else(|| {
                ExportError::Decode(format!("capture {}: irregularity missing detectionDate", meta.id))
            })?;
            let update_date = raw.update_date.ok_or_else(|| {
                ExportError::Decode(format!("capture {}: irregularity missing updateDate", meta.id))
            })?;
            Ok(IrregularityRow {
                uuid: raw.id.as_ref().map(value_to_text),
                detection_date_millis: raw.detection_date_millis,
                detection_utc_date: to_local_naive(&detection_date, tz, meta)?,
                detection_date: Some(detection_date),
                update_date_millis: raw.update_date_millis,
                update_utc_date: to_local_naive(&update_date, tz, meta)?,
                update_date: Some(update_date),
                street: raw.street,
                city: raw.city,
                country: raw.country,
                is_highway: raw.is_highway,
                speed: raw.speed,
                regular_speed: raw.regular_speed,
                delay_seconds: raw.delay_seconds,
                seconds: raw.seconds,
                length: raw.length,
                trend: raw.trend,
                kind: raw.kind,
                severity: raw.severity,
                jam_level: raw.jam_level,
                drivers_count: raw.drivers_count,
                alerts_count: raw.alerts_count,
                n_thumbs_up: raw.n_thumbs_up,
                n_comments: raw.n_comments,
                n_images: raw.n_images,
                line: raw.line,
                cause_type: raw.cause_type,
                start_node: raw.start_node,
                end_node: raw.end_node,
                datafile_id: meta.id,
            })
        })
        .collect()
}
