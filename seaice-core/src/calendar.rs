//! Calendar systems used by CF-convention climate datasets
//!
//! A dataset's time axis is only meaningful together with the calendar it was
//! written in. This module provides:
//!
//! - [`Calendar`]: the named day-counting conventions understood by the crate
//! - [`DAYS_PER_MONTH`]: the fixed days-per-month table, built once per process
//! - [`is_leap_year`]: the leap-year rule for each calendar
//! - [`month_lengths`]: the number of days in the month of every time-axis entry
//!
//! # Examples
//!
//! ```rust
//! use seaice_core::calendar::{is_leap_year, Calendar};
//!
//! assert!(is_leap_year(2000, Calendar::Standard));
//! assert!(!is_leap_year(2000, Calendar::NoLeap));
//! assert_eq!(Calendar::Day360.days_in_month(2000, 2).unwrap(), 30);
//! ```

use crate::errors::{SeaIceError, SeaIceResult};
use crate::time_axis::TimeAxis;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Julian day number of 1582-10-15, the first day of the Gregorian calendar.
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;

/// Named day-counting convention
///
/// `Julian` is recognised by the leap-year rule and by date arithmetic, but has
/// no entry in [`DAYS_PER_MONTH`]: asking it for month lengths is an
/// [`SeaIceError::UnknownCalendar`] error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Calendar {
    /// `noleap`: every year has 365 days
    NoLeap,
    /// `365_day`: alias of `noleap`
    Day365,
    /// `standard`: mixed Julian/Gregorian calendar
    Standard,
    /// `gregorian`: alias of `standard`
    Gregorian,
    /// `proleptic_gregorian`: Gregorian rules extended before 1582
    ProlepticGregorian,
    /// `all_leap`: every year has 366 days
    AllLeap,
    /// `366_day`: alias of `all_leap`
    Day366,
    /// `360_day`: twelve 30-day months
    Day360,
    /// `julian`: a leap year every four years
    Julian,
}

impl Calendar {
    /// Calendars with an entry in the days-per-month table
    pub const TABULATED: [Calendar; 8] = [
        Calendar::NoLeap,
        Calendar::Day365,
        Calendar::Standard,
        Calendar::Gregorian,
        Calendar::ProlepticGregorian,
        Calendar::AllLeap,
        Calendar::Day366,
        Calendar::Day360,
    ];

    /// CF-convention name of the calendar
    pub const fn name(&self) -> &'static str {
        match self {
            Calendar::NoLeap => "noleap",
            Calendar::Day365 => "365_day",
            Calendar::Standard => "standard",
            Calendar::Gregorian => "gregorian",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::AllLeap => "all_leap",
            Calendar::Day366 => "366_day",
            Calendar::Day360 => "360_day",
            Calendar::Julian => "julian",
        }
    }

    /// Canonical days-per-month for this calendar, indexed 1-12 (index 0 is unused)
    pub fn days_per_month(&self) -> SeaIceResult<&'static [u32; 13]> {
        DAYS_PER_MONTH
            .get(self)
            .ok_or_else(|| SeaIceError::UnknownCalendar(self.name().to_string()))
    }

    /// Month length used to weight `month` of `year`
    ///
    /// Every month of a leap year gains one day on top of the tabulated value,
    /// so a leap-year January counts 32 days. This differs from
    /// [`Calendar::days_in_month`], which only extends February.
    pub fn month_length(&self, year: i32, month: u32) -> SeaIceResult<u32> {
        if !(1..=12).contains(&month) {
            return Err(SeaIceError::InvalidMonth(month));
        }
        let days = self.days_per_month()?[month as usize];
        Ok(if is_leap_year(year, *self) { days + 1 } else { days })
    }

    /// Number of calendar days in `month` of `year`
    ///
    /// The February of a leap year gains one day on top of the tabulated value.
    pub fn days_in_month(&self, year: i32, month: u32) -> SeaIceResult<u32> {
        if !(1..=12).contains(&month) {
            return Err(SeaIceError::InvalidMonth(month));
        }
        let mut days = self.days_per_month()?[month as usize];
        if month == 2 && is_leap_year(year, *self) {
            days += 1;
        }
        Ok(days)
    }

    /// Convert a date into a day number that increases by one per calendar day
    ///
    /// Day numbers are only comparable within a single calendar.
    pub fn day_number(&self, year: i32, month: u32, day: u32) -> SeaIceResult<i64> {
        if !(1..=12).contains(&month) {
            return Err(SeaIceError::InvalidMonth(month));
        }
        let (y, m, d) = (year as i64, month as i64, day as i64);
        let number = match self {
            Calendar::NoLeap | Calendar::Day365 | Calendar::AllLeap | Calendar::Day366 => {
                let table = self.days_per_month()?;
                let year_length: i64 = table[1..].iter().map(|&v| v as i64).sum();
                let before: i64 = table[1..month as usize].iter().map(|&v| v as i64).sum();
                y * year_length + before + d - 1
            }
            Calendar::Day360 => y * 360 + (m - 1) * 30 + d - 1,
            Calendar::ProlepticGregorian => gregorian_to_jdn(y, m, d),
            Calendar::Julian => julian_to_jdn(y, m, d),
            Calendar::Standard | Calendar::Gregorian => {
                if (y, m, d) >= (1582, 10, 15) {
                    gregorian_to_jdn(y, m, d)
                } else {
                    julian_to_jdn(y, m, d)
                }
            }
        };
        Ok(number)
    }

    /// Inverse of [`Calendar::day_number`], returning `(year, month, day)`
    pub fn date_from_day_number(&self, number: i64) -> SeaIceResult<(i32, u32, u32)> {
        let (y, m, d) = match self {
            Calendar::NoLeap | Calendar::Day365 | Calendar::AllLeap | Calendar::Day366 => {
                let table = self.days_per_month()?;
                let year_length: i64 = table[1..].iter().map(|&v| v as i64).sum();
                let mut remaining = number.rem_euclid(year_length);
                let mut month = 1;
                while remaining >= table[month] as i64 {
                    remaining -= table[month] as i64;
                    month += 1;
                }
                (number.div_euclid(year_length), month as i64, remaining + 1)
            }
            Calendar::Day360 => {
                let remaining = number.rem_euclid(360);
                (number.div_euclid(360), remaining / 30 + 1, remaining % 30 + 1)
            }
            Calendar::ProlepticGregorian => jdn_to_gregorian(number),
            Calendar::Julian => jdn_to_julian(number),
            Calendar::Standard | Calendar::Gregorian => {
                if number >= GREGORIAN_REFORM_JDN {
                    jdn_to_gregorian(number)
                } else {
                    jdn_to_julian(number)
                }
            }
        };
        Ok((y as i32, m as u32, d as u32))
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Calendar {
    type Err = SeaIceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "noleap" => Ok(Calendar::NoLeap),
            "365_day" => Ok(Calendar::Day365),
            "standard" => Ok(Calendar::Standard),
            "gregorian" => Ok(Calendar::Gregorian),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "all_leap" => Ok(Calendar::AllLeap),
            "366_day" => Ok(Calendar::Day366),
            "360_day" => Ok(Calendar::Day360),
            "julian" => Ok(Calendar::Julian),
            other => Err(SeaIceError::UnknownCalendar(other.to_string())),
        }
    }
}

impl TryFrom<String> for Calendar {
    type Error = SeaIceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Calendar> for String {
    fn from(calendar: Calendar) -> String {
        calendar.name().to_string()
    }
}

/// Days per month for every tabulated calendar, index 0 unused
pub static DAYS_PER_MONTH: LazyLock<HashMap<Calendar, [u32; 13]>> = LazyLock::new(|| {
    let common = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let leap = [0, 31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let flat = [0, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30];

    HashMap::from([
        (Calendar::NoLeap, common),
        (Calendar::Day365, common),
        (Calendar::Standard, common),
        (Calendar::Gregorian, common),
        (Calendar::ProlepticGregorian, common),
        (Calendar::AllLeap, leap),
        (Calendar::Day366, leap),
        (Calendar::Day360, flat),
    ])
});

/// Determine if `year` is a leap year under `calendar`
///
/// Only `standard`, `gregorian`, `proleptic_gregorian` and `julian` ever report
/// leap years. Years divisible by 4 are leap years, except:
///
/// - `proleptic_gregorian`: centuries not divisible by 400
/// - `standard`/`gregorian`: centuries not divisible by 400 *before 1583*
///
/// Under the second exception 1900 is a leap year for `standard`, unlike the
/// historical calendar.
pub fn is_leap_year(year: i32, calendar: Calendar) -> bool {
    let candidate = matches!(
        calendar,
        Calendar::Standard | Calendar::Gregorian | Calendar::ProlepticGregorian | Calendar::Julian
    );
    if !candidate || year % 4 != 0 {
        return false;
    }

    let century_exception = year % 100 == 0 && year % 400 != 0;
    match calendar {
        Calendar::ProlepticGregorian if century_exception => false,
        Calendar::Standard | Calendar::Gregorian if century_exception && year < 1583 => false,
        _ => true,
    }
}

/// [`is_leap_year`] for a calendar given by name
///
/// Unrecognised names never report leap years.
pub fn is_leap_year_named(year: i32, calendar: &str) -> bool {
    calendar
        .parse::<Calendar>()
        .map(|c| is_leap_year(year, c))
        .unwrap_or(false)
}

/// Month length of each entry of `time`, in the same order
///
/// Each entry takes the tabulated length of its month, plus one if its year is
/// a leap year under `calendar` (see [`Calendar::month_length`]).
///
/// Fails with [`SeaIceError::UnknownCalendar`] when `calendar` has no
/// days-per-month table.
pub fn month_lengths(time: &TimeAxis, calendar: Calendar) -> SeaIceResult<Vec<u32>> {
    // Resolve the table up front so an empty axis still rejects the calendar
    calendar.days_per_month()?;
    time.iter()
        .map(|t| calendar.month_length(t.year, t.month))
        .collect()
}

fn gregorian_to_jdn(y: i64, m: i64, d: i64) -> i64 {
    let a = (14 - m) / 12;
    let y = y + 4800 - a;
    let m = m + 12 * a - 3;
    d + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)
        - 32045
}

fn julian_to_jdn(y: i64, m: i64, d: i64) -> i64 {
    let a = (14 - m) / 12;
    let y = y + 4800 - a;
    let m = m + 12 * a - 3;
    d + (153 * m + 2) / 5 + 365 * y + y.div_euclid(4) - 32083
}

fn jdn_to_gregorian(jdn: i64) -> (i64, i64, i64) {
    let a = jdn + 32044;
    let b = (4 * a + 3).div_euclid(146_097);
    let c = a - (146_097 * b).div_euclid(4);
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = 100 * b + d - 4800 + m / 10;
    (year, month, day)
}

fn jdn_to_julian(jdn: i64) -> (i64, i64, i64) {
    let c = jdn + 32082;
    let d = (4 * c + 3).div_euclid(1461);
    let e = c - (1461 * d).div_euclid(4);
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_axis::Timestamp;

    #[test]
    fn non_leap_calendars_never_leap() {
        for calendar in [
            Calendar::NoLeap,
            Calendar::Day365,
            Calendar::AllLeap,
            Calendar::Day366,
            Calendar::Day360,
        ] {
            for year in [1500, 1600, 1900, 2000, 2004] {
                assert!(!is_leap_year(year, calendar), "{calendar} {year}");
            }
        }
    }

    #[test]
    fn proleptic_gregorian_rules() {
        assert!(is_leap_year(2000, Calendar::ProlepticGregorian));
        assert!(is_leap_year(2004, Calendar::ProlepticGregorian));
        assert!(!is_leap_year(1900, Calendar::ProlepticGregorian));
        assert!(!is_leap_year(1500, Calendar::ProlepticGregorian));
        assert!(!is_leap_year(2001, Calendar::ProlepticGregorian));
    }

    #[test]
    fn standard_century_exception_only_before_1583() {
        for calendar in [Calendar::Standard, Calendar::Gregorian] {
            assert!(!is_leap_year(1500, calendar));
            assert!(!is_leap_year(1100, calendar));
            assert!(is_leap_year(1600, calendar));
            assert!(is_leap_year(1900, calendar));
            assert!(is_leap_year(2000, calendar));
            assert!(!is_leap_year(1901, calendar));
        }
    }

    #[test]
    fn julian_leaps_every_four_years() {
        assert!(is_leap_year(1900, Calendar::Julian));
        assert!(is_leap_year(1500, Calendar::Julian));
        assert!(!is_leap_year(1901, Calendar::Julian));
    }

    #[test]
    fn named_lookup() {
        assert!(is_leap_year_named(2000, "gregorian"));
        assert!(!is_leap_year_named(2000, "noleap"));
        assert!(!is_leap_year_named(2000, "tropical"));
    }

    #[test]
    fn parse_round_trips_names() {
        for calendar in Calendar::TABULATED.iter().chain([Calendar::Julian].iter()) {
            assert_eq!(calendar.name().parse::<Calendar>().unwrap(), *calendar);
        }
        assert!(matches!(
            "lunar".parse::<Calendar>(),
            Err(SeaIceError::UnknownCalendar(name)) if name == "lunar"
        ));
    }

    #[test]
    fn table_covers_tabulated_calendars() {
        for calendar in Calendar::TABULATED {
            let table = calendar.days_per_month().unwrap();
            assert_eq!(table[0], 0);
            assert!(table[1..].iter().all(|&d| (28..=31).contains(&d)));
        }
        assert!(Calendar::Julian.days_per_month().is_err());
    }

    #[test]
    fn days_in_month_extends_only_february() {
        assert_eq!(Calendar::Standard.days_in_month(2000, 2).unwrap(), 29);
        assert_eq!(Calendar::Standard.days_in_month(2001, 2).unwrap(), 28);
        assert_eq!(Calendar::Standard.days_in_month(2000, 1).unwrap(), 31);
        assert_eq!(Calendar::AllLeap.days_in_month(2001, 2).unwrap(), 29);
        assert_eq!(Calendar::NoLeap.days_in_month(2000, 2).unwrap(), 28);
        assert!(matches!(
            Calendar::NoLeap.days_in_month(2000, 13),
            Err(SeaIceError::InvalidMonth(13))
        ));
    }

    #[test]
    fn leap_years_extend_every_month() {
        assert_eq!(Calendar::Standard.month_length(2000, 1).unwrap(), 32);
        assert_eq!(Calendar::Standard.month_length(2000, 2).unwrap(), 30);
        assert_eq!(Calendar::Standard.month_length(2000, 4).unwrap(), 31);
        assert_eq!(Calendar::Standard.month_length(2001, 1).unwrap(), 31);
        assert_eq!(Calendar::ProlepticGregorian.month_length(1900, 3).unwrap(), 31);
        assert_eq!(Calendar::Gregorian.month_length(1900, 3).unwrap(), 32);
        // Tables that already hold leap Februaries are never incremented
        assert_eq!(Calendar::AllLeap.month_length(2000, 2).unwrap(), 29);
        assert_eq!(Calendar::Day360.month_length(2000, 1).unwrap(), 30);
        assert_eq!(Calendar::NoLeap.month_length(2000, 1).unwrap(), 31);
        assert!(matches!(
            Calendar::Standard.month_length(2000, 0),
            Err(SeaIceError::InvalidMonth(0))
        ));
        assert!(matches!(
            Calendar::Julian.month_length(2000, 1),
            Err(SeaIceError::UnknownCalendar(_))
        ));
    }

    #[test]
    fn month_lengths_follow_time_axis() {
        let time = TimeAxis::new(vec![
            Timestamp::new(1999, 12, 15),
            Timestamp::new(2000, 1, 15),
            Timestamp::new(2000, 2, 15),
            Timestamp::new(2001, 2, 15),
        ])
        .unwrap();

        assert_eq!(
            month_lengths(&time, Calendar::Standard).unwrap(),
            vec![31, 32, 30, 28]
        );
        assert_eq!(
            month_lengths(&time, Calendar::NoLeap).unwrap(),
            vec![31, 31, 28, 28]
        );
    }

    #[test]
    fn month_lengths_360_day_is_always_30() {
        let time = TimeAxis::new(
            (1..=48)
                .map(|i| Timestamp::new(1996 + (i - 1) / 12, ((i - 1) % 12 + 1) as u32, 1))
                .collect(),
        )
        .unwrap();
        let lengths = month_lengths(&time, Calendar::Day360).unwrap();
        assert_eq!(lengths.len(), 48);
        assert!(lengths.iter().all(|&d| d == 30));
    }

    #[test]
    fn month_lengths_rejects_julian() {
        let time = TimeAxis::new(vec![Timestamp::new(2000, 1, 1)]).unwrap();
        assert!(matches!(
            month_lengths(&time, Calendar::Julian),
            Err(SeaIceError::UnknownCalendar(name)) if name == "julian"
        ));
        assert!(month_lengths(&TimeAxis::default(), Calendar::Julian).is_err());
    }

    #[test]
    fn day_numbers_round_trip() {
        let dates = [(1582, 10, 4), (1582, 10, 15), (1850, 1, 1), (2000, 2, 29), (2024, 12, 31)];
        for calendar in [
            Calendar::Standard,
            Calendar::ProlepticGregorian,
            Calendar::Julian,
            Calendar::NoLeap,
            Calendar::AllLeap,
        ] {
            for &(y, m, d) in &dates {
                if d > calendar.days_per_month().map(|t| t[m as usize]).unwrap_or(31)
                    && !is_leap_year(y, calendar)
                {
                    continue;
                }
                let n = calendar.day_number(y, m, d).unwrap();
                assert_eq!(calendar.date_from_day_number(n).unwrap(), (y, m, d), "{calendar}");
            }
        }
    }

    #[test]
    fn standard_calendar_skips_reform_gap() {
        let calendar = Calendar::Standard;
        let before = calendar.day_number(1582, 10, 4).unwrap();
        let after = calendar.day_number(1582, 10, 15).unwrap();
        assert_eq!(after - before, 1);
        assert_eq!(after, GREGORIAN_REFORM_JDN);
    }

    #[test]
    fn fixed_length_years() {
        let noleap = Calendar::NoLeap;
        assert_eq!(
            noleap.day_number(2001, 1, 1).unwrap() - noleap.day_number(2000, 1, 1).unwrap(),
            365
        );
        let flat = Calendar::Day360;
        let start = flat.day_number(2000, 1, 1).unwrap();
        assert_eq!(flat.date_from_day_number(start + 59).unwrap(), (2000, 2, 30));
    }
}
