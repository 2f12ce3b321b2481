//! Python bindings for the analysis routines
//!
//! Fields cross the boundary as numpy arrays of shape `(time, lat, lon)`; the
//! time axis is passed as parallel `years`/`months` sequences.

use crate::averaging::{reduce_unweighted, reduce_weighted, seasonal_weights};
use crate::calendar::{self, Calendar};
use crate::clustering::{self, SpectralParameters};
use crate::errors::SeaIceError;
use crate::season::Season;
use crate::time_axis::TimeAxis;
use numpy::{IntoPyArray, PyArray1, PyArray3, PyReadonlyArray1, PyReadonlyArray3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

impl From<SeaIceError> for PyErr {
    fn from(err: SeaIceError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

type SeasonalArrays<'py> = (Vec<String>, Bound<'py, PyArray3<f64>>);

fn season_names(seasons: &[Season]) -> Vec<String> {
    seasons.iter().map(|s| s.name().to_string()).collect()
}

/// Calendar-weighted seasonal mean
///
/// Returns the names of the seasons present and an array of shape
/// `(seasons, lat, lon)`.
#[pyfunction]
#[pyo3(signature = (years, months, values, calendar="noleap"))]
fn season_mean<'py>(
    py: Python<'py>,
    years: Vec<i32>,
    months: Vec<u32>,
    values: PyReadonlyArray3<'py, f64>,
    calendar: &str,
) -> PyResult<SeasonalArrays<'py>> {
    let calendar: Calendar = calendar.parse()?;
    let time = TimeAxis::from_year_months(&years, &months)?;
    let weights = seasonal_weights(&time, calendar)?;
    let (seasons, reduced) = reduce_weighted(values.as_array(), &weights)?;
    Ok((season_names(&seasons), reduced.into_pyarray_bound(py)))
}

/// Equal-weight seasonal mean, skipping NaN samples
#[pyfunction]
fn season_mean_unweighted<'py>(
    py: Python<'py>,
    years: Vec<i32>,
    months: Vec<u32>,
    values: PyReadonlyArray3<'py, f64>,
) -> PyResult<SeasonalArrays<'py>> {
    let time = TimeAxis::from_year_months(&years, &months)?;
    let (seasons, reduced) = reduce_unweighted(values.as_array(), &time)?;
    Ok((season_names(&seasons), reduced.into_pyarray_bound(py)))
}

#[pyfunction]
fn month_lengths(years: Vec<i32>, months: Vec<u32>, calendar: &str) -> PyResult<Vec<u32>> {
    let calendar: Calendar = calendar.parse()?;
    let time = TimeAxis::from_year_months(&years, &months)?;
    Ok(calendar::month_lengths(&time, calendar)?)
}

/// Leap-year predicate; unknown calendar names never leap
#[pyfunction]
fn is_leap_year(year: i32, calendar: &str) -> bool {
    calendar::is_leap_year_named(year, calendar)
}

/// Spectral clustering of the grid cells at one timestep
///
/// Returns one label per cell, flattened latitude-major.
#[pyfunction]
#[pyo3(signature = (
    timestep, latitude, longitude, values, n_clusters=10, gamma=1.0, n_init=10, seed=0
))]
#[allow(clippy::too_many_arguments)]
fn compute_clusters<'py>(
    py: Python<'py>,
    timestep: i64,
    latitude: PyReadonlyArray1<'py, f64>,
    longitude: PyReadonlyArray1<'py, f64>,
    values: PyReadonlyArray3<'py, f64>,
    n_clusters: usize,
    gamma: f64,
    n_init: usize,
    seed: u64,
) -> PyResult<Bound<'py, PyArray1<usize>>> {
    let params = SpectralParameters {
        n_clusters,
        gamma,
        n_init,
        seed,
        ..SpectralParameters::default()
    };
    let latitude = latitude.as_array().to_vec();
    let longitude = longitude.as_array().to_vec();
    let values = values.as_array();

    let labels = py.allow_threads(|| {
        clustering::compute_clusters(timestep, &latitude, &longitude, values, &params)
    })?;
    Ok(labels.into_vec().into_pyarray_bound(py))
}

#[pymodule]
pub fn core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(season_mean, m)?)?;
    m.add_function(wrap_pyfunction!(season_mean_unweighted, m)?)?;
    m.add_function(wrap_pyfunction!(month_lengths, m)?)?;
    m.add_function(wrap_pyfunction!(is_leap_year, m)?)?;
    m.add_function(wrap_pyfunction!(compute_clusters, m)?)?;
    Ok(())
}
