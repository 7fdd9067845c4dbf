use crate::error::{ExportError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Half-open, day-granularity export window `[initial_date, final_date)`.
///
/// Immutable for the lifetime of a run; its name doubles as the on-disk
/// partition key for intermediate files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportWindow {
    pub initial_date: NaiveDate,
    pub final_date: NaiveDate,
}

impl ExportWindow {
    pub fn new(initial_date: NaiveDate, final_date: NaiveDate) -> Result<Self> {
        if initial_date >= final_date {
            return Err(ExportError::Config(format!(
                "initial_date {initial_date} must precede final_date {final_date}"
            )));
        }
        Ok(Self { initial_date, final_date })
    }

    /// Resolve a window from the configuration surface.
    ///
    /// A day-count takes preference over an explicit `initial_date`:
    /// `final_date = today` (or the explicit final date) and
    /// `initial_date = final_date - days`. Without a day-count, the initial
    /// date must be explicit, the final date defaulting to `today`.
    pub fn resolve(
        time_range_days: Option<i64>,
        initial_date: Option<NaiveDate>,
        final_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self> {
        let final_date = final_date.unwrap_or(today);
        let initial_date = match (time_range_days, initial_date) {
            (Some(days), _) => {
                if days <= 0 {
                    return Err(ExportError::Config(format!(
                        "time range must be a positive day count, got {days}"
                    )));
                }
                final_date - Duration::days(days)
            }
            (None, Some(d)) => d,
            (None, None) => {
                return Err(ExportError::Config(
                    "either a day-count time range or an explicit initial_date is required".into(),
                ))
            }
        };
        Self::new(initial_date, final_date)
    }

    /// Derived run name, used as the directory/partition key.
    pub fn name(&self) -> String {
        format!("{}--to--{}", self.initial_date, self.final_date)
    }

    /// Lower bound as a datetime (midnight), for the selection predicate.
    pub fn initial_datetime(&self) -> NaiveDateTime {
        self.initial_date.and_hms_opt(0, 0, 0).expect("midnight is always valid")
    }

    /// Exclusive upper bound as a datetime (midnight).
    pub fn final_datetime(&self) -> NaiveDateTime {
        self.final_date.and_hms_opt(0, 0, 0).expect("midnight is always valid")
    }
}
