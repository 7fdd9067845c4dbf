//! Filename-encoded provenance for intermediate record files.
//!
//! `{category}--{start_time}--{timezone}--{id}.json`, with `/` in the
//! timezone replaced by `-`. Once a capture leaves the source store this
//! filename is the only link back to it, so encoding and parsing live in
//! this one pair of functions.

use crate::category::Category;
use crate::error::{ExportError, Result};
use chrono::NaiveDateTime;

pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const FILE_EXTENSION: &str = "json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provenance {
    pub category: Category,
    pub start_time: NaiveDateTime,
    pub timezone: String,
    pub id: i64,
}

impl Provenance {
    /// Deterministic file name for one capture.
    pub fn file_name(&self) -> String {
        format!(
            "{}--{}--{}--{}.{}",
            self.category,
            self.start_time.format(START_TIME_FORMAT),
            self.timezone.replace('/', "-"),
            self.id,
            FILE_EXTENSION,
        )
    }

    /// Recover provenance from a bare file name (no directory components).
    pub fn parse(file_name: &str) -> Result<Self> {
        let bad = |why: &str| ExportError::Decode(format!("filename {file_name:?}: {why}"));

        let stem = file_name
            .strip_suffix(&format!(".{FILE_EXTENSION}"))
            .ok_or_else(|| bad("missing .json extension"))?;
        let parts: Vec<&str> = stem.split("--").collect();
        let &[category, start_time, timezone, id] = parts.as_slice() else {
            return Err(bad("expected category--start_time--timezone--id"));
        };

        Ok(Self {
            category: category.parse().map_err(|e: String| bad(&e))?,
            start_time: NaiveDateTime::parse_from_str(start_time, START_TIME_FORMAT)
                .map_err(|e| bad(&format!("bad start_time: {e}")))?,
            timezone: timezone.replace('-', "/"),
            id: id.parse().map_err(|_| bad("bad id"))?,
        })
    }
}
