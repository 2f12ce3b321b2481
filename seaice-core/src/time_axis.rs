//! Time axis of a gridded dataset
//!
//! Each entry of the axis only needs to carry its calendar date; the seasonal
//! averaging groups by month and weights by the month's length, so the time of
//! day is discarded when decoding.

use crate::calendar::Calendar;
use crate::errors::{SeaIceError, SeaIceResult};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Calendar date of a single time-axis entry
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// 1-31
    pub day: u32,
}

impl Timestamp {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }
}

/// Ordered sequence of timestamped samples
///
/// Entries are expected in chronological order but need not be unique.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    entries: Vec<Timestamp>,
}

impl TimeAxis {
    /// Create a time axis, checking every month lies in 1-12
    pub fn new(entries: Vec<Timestamp>) -> SeaIceResult<Self> {
        if let Some(bad) = entries.iter().find(|t| !(1..=12).contains(&t.month)) {
            return Err(SeaIceError::InvalidMonth(bad.month));
        }
        Ok(Self { entries })
    }

    /// Create a time axis from parallel year and month sequences, all on day 1
    pub fn from_year_months(years: &[i32], months: &[u32]) -> SeaIceResult<Self> {
        if years.len() != months.len() {
            return Err(SeaIceError::ShapeMismatch {
                what: "months".to_string(),
                expected: years.len(),
                actual: months.len(),
            });
        }
        Self::new(
            years
                .iter()
                .zip(months)
                .map(|(&year, &month)| Timestamp::new(year, month, 1))
                .collect(),
        )
    }

    /// Decode CF-convention numeric time offsets
    ///
    /// `units` has the form `"<unit> since <reference date>"` where unit is one of
    /// days, hours, minutes or seconds, e.g. `"days since 1850-01-01 00:00:00"`.
    /// Offsets are counted in days of `calendar`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seaice_core::calendar::Calendar;
    /// use seaice_core::time_axis::{TimeAxis, Timestamp};
    ///
    /// let offsets = [0.0, 31.0, 59.0];
    /// let units = "days since 1850-01-01";
    /// let axis = TimeAxis::from_cf_offsets(&offsets, units, Calendar::NoLeap).unwrap();
    /// assert_eq!(axis.get(2), Some(&Timestamp::new(1850, 3, 1)));
    /// ```
    pub fn from_cf_offsets(values: &[f64], units: &str, calendar: Calendar) -> SeaIceResult<Self> {
        let reference = CfTimeUnits::parse(units)?;
        let origin = calendar.day_number(reference.year, reference.month, reference.day)?;

        let entries = values
            .iter()
            .map(|&value| {
                if !value.is_finite() {
                    return Err(SeaIceError::InvalidParameter(format!(
                        "non-finite time offset {value}"
                    )));
                }
                let seconds = value * reference.seconds_per_unit + reference.seconds_of_day;
                let days = (seconds / SECONDS_PER_DAY).floor() as i64;
                let (year, month, day) = calendar.date_from_day_number(origin + days)?;
                Ok(Timestamp::new(year, month, day))
            })
            .collect::<SeaIceResult<Vec<_>>>()?;

        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Timestamp> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timestamp> {
        self.entries.iter()
    }

    pub fn months(&self) -> Vec<u32> {
        self.entries.iter().map(|t| t.month).collect()
    }

    pub fn years(&self) -> Vec<i32> {
        self.entries.iter().map(|t| t.year).collect()
    }
}

/// Parsed `"<unit> since <date>"` attribute
#[derive(Debug, Clone, PartialEq)]
struct CfTimeUnits {
    seconds_per_unit: f64,
    year: i32,
    month: u32,
    day: u32,
    seconds_of_day: f64,
}

impl CfTimeUnits {
    fn parse(units: &str) -> SeaIceResult<Self> {
        let invalid = || SeaIceError::InvalidTimeUnits(units.to_string());

        let mut parts = units.trim().splitn(3, char::is_whitespace);
        let unit = parts.next().ok_or_else(invalid)?;
        if parts.next() != Some("since") {
            return Err(invalid());
        }
        let reference = parts.next().ok_or_else(invalid)?.trim();

        let seconds_per_unit = match unit.to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => SECONDS_PER_DAY,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            _ => return Err(invalid()),
        };

        // Date and time may be separated by a space or a "T"
        let mut fields = reference.splitn(2, |c: char| c == ' ' || c == 'T');
        let date = fields.next().ok_or_else(invalid)?;
        let clock = fields.next().map(str::trim).unwrap_or("");

        // A leading "-" belongs to the year
        let (sign, date) = match date.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, date),
        };
        let mut ymd = date.split('-');
        let year: i32 = ymd.next().and_then(|v| v.parse().ok()).ok_or_else(invalid)?;
        let month: u32 = ymd.next().map_or(Some(1), |v| v.parse().ok()).ok_or_else(invalid)?;
        let day: u32 = ymd.next().map_or(Some(1), |v| v.parse().ok()).ok_or_else(invalid)?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(invalid());
        }

        let seconds_of_day = if clock.is_empty() {
            0.0
        } else {
            // Drop a trailing time zone such as "Z" or " UTC"
            let clock = clock
                .split_whitespace()
                .next()
                .unwrap_or("")
                .trim_end_matches('Z');
            let mut hms = clock.split(':');
            let hours: f64 = hms
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(invalid)?;
            let minutes: f64 = hms
                .next()
                .map_or(Some(0.0), |v| v.parse().ok())
                .ok_or_else(invalid)?;
            let seconds: f64 = hms
                .next()
                .map_or(Some(0.0), |v| v.parse().ok())
                .ok_or_else(invalid)?;
            hours * 3_600.0 + minutes * 60.0 + seconds
        };

        Ok(Self {
            seconds_per_unit,
            year: sign * year,
            month,
            day,
            seconds_of_day,
        })
    }
}
