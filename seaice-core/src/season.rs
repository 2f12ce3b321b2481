//! Climatological seasons
//!
//! Months are grouped into quarters ending in November: December belongs to the
//! following winter's DJF season together with January and February.

use crate::errors::{SeaIceError, SeaIceResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three-month season
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    /// December, January, February
    #[serde(rename = "DJF")]
    Djf = 0,
    /// March, April, May
    #[serde(rename = "MAM")]
    Mam = 1,
    /// June, July, August
    #[serde(rename = "JJA")]
    Jja = 2,
    /// September, October, November
    #[serde(rename = "SON")]
    Son = 3,
}

impl Season {
    /// All seasons in output order
    pub const ALL: [Season; 4] = [Season::Djf, Season::Mam, Season::Jja, Season::Son];

    /// Season containing `month` (1-12)
    pub fn from_month(month: u32) -> SeaIceResult<Self> {
        match month {
            12 | 1 | 2 => Ok(Season::Djf),
            3..=5 => Ok(Season::Mam),
            6..=8 => Ok(Season::Jja),
            9..=11 => Ok(Season::Son),
            _ => Err(SeaIceError::InvalidMonth(month)),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Season::Djf => "DJF",
            Season::Mam => "MAM",
            Season::Jja => "JJA",
            Season::Son => "SON",
        }
    }

    /// Months of the season in chronological order
    pub const fn months(&self) -> [u32; 3] {
        match self {
            Season::Djf => [12, 1, 2],
            Season::Mam => [3, 4, 5],
            Season::Jja => [6, 7, 8],
            Season::Son => [9, 10, 11],
        }
    }
}

impl From<Season> for usize {
    fn from(s: Season) -> usize {
        s as usize
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Season {
    type Err = SeaIceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::ALL
            .into_iter()
            .find(|season| season.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SeaIceError::InvalidParameter(format!("unknown season {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_month_has_one_season() {
        for month in 1..=12 {
            let season = Season::from_month(month).unwrap();
            assert!(season.months().contains(&month));
            let owners = Season::ALL
                .iter()
                .filter(|s| s.months().contains(&month))
                .count();
            assert_eq!(owners, 1);
        }
    }

    #[test]
    fn december_is_winter() {
        assert_eq!(Season::from_month(12).unwrap(), Season::Djf);
        assert_eq!(Season::from_month(11).unwrap(), Season::Son);
        assert!(Season::from_month(0).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(Season::Jja.to_string(), "JJA");
        assert_eq!("son".parse::<Season>().unwrap(), Season::Son);
        assert!("XYZ".parse::<Season>().is_err());
        assert_eq!(usize::from(Season::Mam), 1);
    }
}
