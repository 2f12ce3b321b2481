//! Calendar-aware seasonal averaging
//!
//! Monthly means cannot simply be averaged into seasonal means: a 31-day month
//! covers more of the season than February does. Each time-axis entry is
//! therefore weighted by the length of its month relative to the total length
//! of all entries in the same season:
//!
//! $$ w_t = \frac{L_t}{\sum_{t' \in s(t)} L_{t'}} $$
//!
//! where $L_t$ is the month length of entry $t$ under the dataset's calendar and
//! $s(t)$ the set of entries sharing its season. The seasonal value is then
//! $\sum_{t \in s} w_t x_t$.
//!
//! Missing samples (NaN) contribute nothing to the weighted sum, so a cell
//! missing at every entry of a season reduces to zero.
//!
//! # Examples
//!
//! ```rust
//! use ndarray::Array3;
//! use seaice_core::averaging::season_mean;
//! use seaice_core::calendar::Calendar;
//! use seaice_core::grid::{GriddedField, LatLonGrid};
//! use seaice_core::season::Season;
//! use seaice_core::time_axis::{TimeAxis, Timestamp};
//!
//! let time = TimeAxis::new((1..=12).map(|m| Timestamp::new(2001, m, 15)).collect()).unwrap();
//! let grid = LatLonGrid::new(vec![75.0], vec![0.0]);
//! let field = GriddedField::new(grid, time, Array3::from_elem((12, 1, 1), 80.0)).unwrap();
//!
//! let seasonal = season_mean(&field, Calendar::NoLeap).unwrap();
//! assert_eq!(seasonal.seasons(), &Season::ALL);
//! assert!((seasonal.season(Season::Jja).unwrap()[[0, 0]] - 80.0).abs() < 1e-12);
//! ```

use crate::calendar::{month_lengths, Calendar};
use crate::errors::{SeaIceError, SeaIceResult};
use crate::grid::{GriddedDataset, GriddedField, SeasonalDataset, SeasonalField};
use crate::season::Season;
use crate::time_axis::TimeAxis;
use log::{debug, warn};
use ndarray::{Array2, Array3, ArrayView3, Axis, Zip};
use std::collections::BTreeMap;

/// Maximum deviation of a season's weight sum from 1
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-entry seasonal weights for a time axis
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalWeights {
    seasons: Vec<Season>,
    month_lengths: Vec<u32>,
    weights: Vec<f64>,
}

impl SeasonalWeights {
    /// Season of each time-axis entry
    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    /// Month length of each time-axis entry
    pub fn month_lengths(&self) -> &[u32] {
        &self.month_lengths
    }

    /// Weight of each time-axis entry
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Seasons represented on the time axis, in output order
    pub fn present_seasons(&self) -> Vec<Season> {
        Season::ALL
            .into_iter()
            .filter(|s| self.seasons.contains(s))
            .collect()
    }

    /// Sum of weights for each present season
    pub fn sums(&self) -> Vec<(Season, f64)> {
        self.present_seasons()
            .into_iter()
            .map(|season| {
                let sum: f64 = self
                    .seasons
                    .iter()
                    .zip(&self.weights)
                    .filter(|(s, _)| **s == season)
                    .map(|(_, w)| w)
                    .sum();
                (season, sum)
            })
            .collect()
    }

    /// Check that the weights of every present season sum to 1
    fn verify(&self) -> SeaIceResult<()> {
        for (season, sum) in self.sums() {
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(SeaIceError::InvariantViolation {
                    season: season.to_string(),
                    sum,
                });
            }
        }
        Ok(())
    }
}

/// Compute month-length weights for every entry of `time`
///
/// Fails with [`SeaIceError::UnknownCalendar`] if `calendar` has no
/// days-per-month table and with [`SeaIceError::InvariantViolation`] if any
/// season's weights do not sum to 1.
pub fn seasonal_weights(time: &TimeAxis, calendar: Calendar) -> SeaIceResult<SeasonalWeights> {
    let lengths = month_lengths(time, calendar)?;
    let seasons = time
        .iter()
        .map(|t| Season::from_month(t.month))
        .collect::<SeaIceResult<Vec<_>>>()?;

    let mut totals = [0.0_f64; 4];
    for (season, &length) in seasons.iter().zip(&lengths) {
        totals[usize::from(*season)] += length as f64;
    }

    let weights = seasons
        .iter()
        .zip(&lengths)
        .map(|(season, &length)| length as f64 / totals[usize::from(*season)])
        .collect();

    let weights = SeasonalWeights {
        seasons,
        month_lengths: lengths,
        weights,
    };
    weights.verify()?;

    debug!(
        "Computed {} seasonal weights under the {} calendar for seasons {:?}",
        weights.weights.len(),
        calendar,
        weights.present_seasons()
    );
    Ok(weights)
}

/// Weighted sum of `values` over the leading (time) axis, per season
///
/// Returns the seasons present and an array of shape `(seasons, lat, lon)`.
pub fn reduce_weighted(
    values: ArrayView3<'_, f64>,
    weights: &SeasonalWeights,
) -> SeaIceResult<(Vec<Season>, Array3<f64>)> {
    let (n_time, n_lat, n_lon) = values.dim();
    if n_time != weights.weights.len() {
        return Err(SeaIceError::ShapeMismatch {
            what: "time dimension".to_string(),
            expected: weights.weights.len(),
            actual: n_time,
        });
    }

    let present = weights.present_seasons();
    let mut output = Array3::<f64>::zeros((present.len(), n_lat, n_lon));

    for (t, slice) in values.axis_iter(Axis(0)).enumerate() {
        let season = weights.seasons[t];
        let w = weights.weights[t];
        // Present seasons always contain the season of every entry
        let Some(index) = present.iter().position(|&s| s == season) else {
            continue;
        };
        Zip::from(output.index_axis_mut(Axis(0), index))
            .and(&slice)
            .for_each(|out, &v| {
                if !v.is_nan() {
                    *out += w * v;
                }
            });
    }

    Ok((present, output))
}

/// Calendar-weighted seasonal mean of a gridded field
pub fn season_mean(field: &GriddedField, calendar: Calendar) -> SeaIceResult<SeasonalField> {
    let weights = seasonal_weights(field.time(), calendar)?;
    let (seasons, values) = reduce_weighted(field.values().view(), &weights)?;
    SeasonalField::new(field.grid().clone(), seasons, values)
}

/// Calendar-weighted seasonal mean of every variable in a dataset
///
/// The weights are computed once and shared by all variables.
pub fn season_mean_dataset(
    dataset: &GriddedDataset,
    calendar: Calendar,
) -> SeaIceResult<SeasonalDataset> {
    let weights = seasonal_weights(dataset.time(), calendar)?;
    let present = weights.present_seasons();

    let mut variables = BTreeMap::new();
    for (name, values) in dataset.variables() {
        debug!("Averaging variable {name} by season");
        let (_, reduced) = reduce_weighted(values.view(), &weights)?;
        variables.insert(name.to_string(), reduced);
    }

    Ok(SeasonalDataset::from_parts(
        dataset.grid().clone(),
        present,
        variables,
    ))
}

/// Arithmetic mean per season, giving every time-axis entry equal weight
///
/// Only used as a baseline for [`seasonal_difference`]. NaN samples are
/// skipped; cells without any finite sample in a season are NaN.
pub fn season_mean_unweighted(field: &GriddedField) -> SeaIceResult<SeasonalField> {
    let (seasons, values) = reduce_unweighted(field.values().view(), field.time())?;
    SeasonalField::new(field.grid().clone(), seasons, values)
}

/// Unweighted counterpart of [`reduce_weighted`]
pub fn reduce_unweighted(
    values: ArrayView3<'_, f64>,
    time: &TimeAxis,
) -> SeaIceResult<(Vec<Season>, Array3<f64>)> {
    let (n_time, n_lat, n_lon) = values.dim();
    if n_time != time.len() {
        return Err(SeaIceError::ShapeMismatch {
            what: "time dimension".to_string(),
            expected: time.len(),
            actual: n_time,
        });
    }

    let seasons = time
        .iter()
        .map(|t| Season::from_month(t.month))
        .collect::<SeaIceResult<Vec<_>>>()?;
    let present: Vec<Season> = Season::ALL
        .into_iter()
        .filter(|s| seasons.contains(s))
        .collect();

    let mut sums = Array3::<f64>::zeros((present.len(), n_lat, n_lon));
    let mut counts = Array3::<u32>::zeros((present.len(), n_lat, n_lon));

    for (slice, season) in values.axis_iter(Axis(0)).zip(&seasons) {
        let Some(index) = present.iter().position(|s| s == season) else {
            continue;
        };
        Zip::from(sums.index_axis_mut(Axis(0), index))
            .and(counts.index_axis_mut(Axis(0), index))
            .and(&slice)
            .for_each(|sum, count, &v| {
                if !v.is_nan() {
                    *sum += v;
                    *count += 1;
                }
            });
    }

    let empty_cells = counts.iter().filter(|&&c| c == 0).count();
    if empty_cells > 0 {
        warn!("{empty_cells} seasonal cells have no finite samples and are left as NaN");
    }

    Zip::from(&mut sums).and(&counts).for_each(|sum, &count| {
        *sum = if count == 0 {
            f64::NAN
        } else {
            *sum / count as f64
        };
    });

    Ok((present, sums))
}

/// Difference `weighted - unweighted` of two seasonal fields on the same grid
pub fn seasonal_difference(
    weighted: &SeasonalField,
    unweighted: &SeasonalField,
) -> SeaIceResult<SeasonalField> {
    if weighted.seasons() != unweighted.seasons() {
        return Err(SeaIceError::InvalidParameter(format!(
            "season sets differ: {:?} vs {:?}",
            weighted.seasons(),
            unweighted.seasons()
        )));
    }
    if weighted.grid() != unweighted.grid() {
        return Err(SeaIceError::InvalidParameter(
            "seasonal fields are on different grids".to_string(),
        ));
    }
    SeasonalField::new(
        weighted.grid().clone(),
        weighted.seasons().to_vec(),
        weighted.values() - unweighted.values(),
    )
}

/// Per-entry weights laid out as `(season, time)` for inspection
///
/// Row `s` holds the weights of entries belonging to the `s`-th present
/// season and zero elsewhere.
pub fn weight_matrix(weights: &SeasonalWeights) -> Array2<f64> {
    let present = weights.present_seasons();
    let mut matrix = Array2::zeros((present.len(), weights.weights.len()));
    for (t, (season, &w)) in weights.seasons.iter().zip(&weights.weights).enumerate() {
        if let Some(row) = present.iter().position(|s| s == season) {
            matrix[[row, t]] = w;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::LatLonGrid;
    use crate::time_axis::Timestamp;
    use is_close::is_close;

    fn monthly_axis(start_year: i32, n_months: usize) -> TimeAxis {
        TimeAxis::new(
            (0..n_months)
                .map(|i| Timestamp::new(start_year + (i / 12) as i32, (i % 12) as u32 + 1, 15))
                .collect(),
        )
        .unwrap()
    }

    fn constant_field(time: TimeAxis, value: f64) -> GriddedField {
        let n = time.len();
        GriddedField::new(
            LatLonGrid::new(vec![70.0, 75.0], vec![-10.0, 0.0, 10.0]),
            time,
            Array3::from_elem((n, 2, 3), value),
        )
        .unwrap()
    }

    #[test]
    fn weights_sum_to_one_per_season() {
        for calendar in Calendar::TABULATED {
            let weights = seasonal_weights(&monthly_axis(1999, 36), calendar).unwrap();
            let sums = weights.sums();
            assert_eq!(sums.len(), 4);
            for (season, sum) in sums {
                assert!((sum - 1.0).abs() < 1e-12, "{calendar} {season}: {sum}");
            }
        }
    }

    #[test]
    fn weights_follow_month_lengths() {
        // One year, noleap: DJF = 31 + 31 + 28 = 90 days
        let weights = seasonal_weights(&monthly_axis(2001, 12), Calendar::NoLeap).unwrap();
        assert!(is_close!(weights.weights()[0], 31.0 / 90.0));
        assert!(is_close!(weights.weights()[1], 28.0 / 90.0));
        assert!(is_close!(weights.weights()[11], 31.0 / 90.0));
        assert!(is_close!(weights.weights()[3], 30.0 / 92.0));
        assert_eq!(weights.month_lengths()[1], 28);
    }

    #[test]
    fn leap_year_extends_every_month() {
        // Standard 2000 is a leap year: DJF = 32 + 30 + 32 = 94 days
        let standard = seasonal_weights(&monthly_axis(2000, 12), Calendar::Standard).unwrap();
        let noleap = seasonal_weights(&monthly_axis(2000, 12), Calendar::NoLeap).unwrap();
        assert_eq!(standard.month_lengths()[..3], [32, 30, 32]);
        assert!(is_close!(standard.weights()[0], 32.0 / 94.0));
        assert!(is_close!(standard.weights()[1], 30.0 / 94.0));
        assert!(is_close!(standard.weights()[3], 31.0 / 95.0));
        assert!(is_close!(noleap.weights()[1], 28.0 / 90.0));
    }

    #[test]
    fn winter_spanning_into_leap_year() {
        let time = TimeAxis::new(vec![
            Timestamp::new(1999, 12, 15),
            Timestamp::new(2000, 1, 15),
            Timestamp::new(2000, 2, 15),
        ])
        .unwrap();
        let weights = seasonal_weights(&time, Calendar::Standard).unwrap();
        assert_eq!(weights.month_lengths(), &[31, 32, 30]);
        assert!(is_close!(weights.weights()[0], 31.0 / 93.0));
        assert!(is_close!(weights.weights()[1], 32.0 / 93.0));
        assert!(is_close!(weights.weights()[2], 30.0 / 93.0));
        let sums = weights.sums();
        assert_eq!(sums.len(), 1);
        assert_eq!(sums[0].0, Season::Djf);
        assert!(is_close!(sums[0].1, 1.0));
    }

    #[test]
    fn unknown_calendar_fails() {
        assert!(matches!(
            seasonal_weights(&monthly_axis(2000, 12), Calendar::Julian),
            Err(SeaIceError::UnknownCalendar(_))
        ));
    }

    #[test]
    fn constant_field_is_preserved() {
        let field = constant_field(monthly_axis(1979, 24), 62.5);
        let seasonal = season_mean(&field, Calendar::Standard).unwrap();
        assert_eq!(seasonal.seasons(), &Season::ALL);
        assert_eq!(seasonal.values().dim(), (4, 2, 3));
        for v in seasonal.values() {
            assert!((v - 62.5).abs() < 1e-9, "{v}");
        }
    }

    #[test]
    fn partial_year_keeps_only_present_seasons() {
        // June to September
        let time = TimeAxis::new((6..=9).map(|m| Timestamp::new(2000, m, 1)).collect()).unwrap();
        let seasonal = season_mean(&constant_field(time, 1.0), Calendar::NoLeap).unwrap();
        assert_eq!(seasonal.seasons(), &[Season::Jja, Season::Son]);
        assert!(is_close!(seasonal.season(Season::Son).unwrap()[[0, 0]], 1.0));
    }

    #[test]
    fn weighted_mean_of_ramp() {
        // Values equal to the month number, noleap, single year.
        // JJA: (6*30 + 7*31 + 8*31) / 92
        let time = monthly_axis(2001, 12);
        let mut values = Array3::zeros((12, 1, 1));
        for m in 0..12 {
            values[[m, 0, 0]] = (m + 1) as f64;
        }
        let grid = LatLonGrid::new(vec![80.0], vec![0.0]);
        let field = GriddedField::new(grid, time, values).unwrap();

        let weighted = season_mean(&field, Calendar::NoLeap).unwrap();
        let expected = (6.0 * 30.0 + 7.0 * 31.0 + 8.0 * 31.0) / 92.0;
        assert!(is_close!(weighted.season(Season::Jja).unwrap()[[0, 0]], expected));

        let unweighted = season_mean_unweighted(&field).unwrap();
        assert!(is_close!(unweighted.season(Season::Jja).unwrap()[[0, 0]], 7.0));

        let diff = seasonal_difference(&weighted, &unweighted).unwrap();
        assert!(is_close!(diff.season(Season::Jja).unwrap()[[0, 0]], expected - 7.0));
    }

    #[test]
    fn nan_samples_are_skipped() {
        let time = TimeAxis::new(vec![
            Timestamp::new(2001, 3, 1),
            Timestamp::new(2001, 4, 1),
            Timestamp::new(2001, 5, 1),
        ])
        .unwrap();
        let mut values = Array3::from_elem((3, 1, 2), 10.0);
        values[[1, 0, 0]] = f64::NAN;
        values.index_axis_mut(Axis(2), 1).fill(f64::NAN);
        let grid = LatLonGrid::new(vec![80.0], vec![0.0, 1.0]);
        let field = GriddedField::new(grid, time, values).unwrap();

        let weighted = season_mean(&field, Calendar::NoLeap).unwrap();
        let mam = weighted.season(Season::Mam).unwrap();
        // April (30 of 92 days) missing
        assert!(is_close!(mam[[0, 0]], 10.0 * 62.0 / 92.0));
        assert_eq!(mam[[0, 1]], 0.0);

        let unweighted = season_mean_unweighted(&field).unwrap();
        let mam = unweighted.season(Season::Mam).unwrap();
        assert!(is_close!(mam[[0, 0]], 10.0));
        assert!(mam[[0, 1]].is_nan());
    }

    #[test]
    fn dataset_shares_weights() {
        let time = monthly_axis(2000, 12);
        let grid = LatLonGrid::new(vec![80.0], vec![0.0, 1.0]);
        let ds = GriddedDataset::new(grid, time)
            .with_variable("seaice_conc", Array3::from_elem((12, 1, 2), 90.0))
            .unwrap()
            .with_variable("seaice_source", Array3::from_elem((12, 1, 2), 3.0))
            .unwrap();

        let seasonal = season_mean_dataset(&ds, Calendar::Gregorian).unwrap();
        assert_eq!(seasonal.seasons().len(), 4);
        let conc = seasonal.variable("seaice_conc").unwrap();
        let source = seasonal.variable("seaice_source").unwrap();
        assert!(conc.values().iter().all(|v| (v - 90.0).abs() < 1e-9));
        assert!(source.values().iter().all(|v| (v - 3.0).abs() < 1e-9));
    }

    #[test]
    fn difference_requires_matching_seasons() {
        let year = constant_field(monthly_axis(2000, 12), 1.0);
        let full = season_mean(&year, Calendar::NoLeap).unwrap();
        let time = TimeAxis::new(vec![Timestamp::new(2000, 1, 1)]).unwrap();
        let winter = season_mean(&constant_field(time, 1.0), Calendar::NoLeap).unwrap();
        assert!(seasonal_difference(&full, &winter).is_err());
    }

    #[test]
    fn reduce_checks_time_length() {
        let weights = seasonal_weights(&monthly_axis(2000, 12), Calendar::NoLeap).unwrap();
        let values = Array3::<f64>::zeros((11, 1, 1));
        assert!(matches!(
            reduce_weighted(values.view(), &weights),
            Err(SeaIceError::ShapeMismatch { expected: 12, actual: 11, .. })
        ));
    }

    #[test]
    fn weight_matrix_rows_sum_to_one() {
        let weights = seasonal_weights(&monthly_axis(2000, 24), Calendar::AllLeap).unwrap();
        let matrix = weight_matrix(&weights);
        assert_eq!(matrix.dim(), (4, 24));
        for row in matrix.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_axis_has_no_seasons() {
        let field = GriddedField::new(
            LatLonGrid::new(vec![80.0], vec![0.0]),
            TimeAxis::default(),
            Array3::zeros((0, 1, 1)),
        )
        .unwrap();
        let seasonal = season_mean(&field, Calendar::NoLeap).unwrap();
        assert!(seasonal.seasons().is_empty());
        assert_eq!(seasonal.values().dim(), (0, 1, 1));
    }
}
