//! Gridded fields on a rectangular latitude/longitude grid
//!
//! All fields are stored as `(leading axis, latitude, longitude)` arrays. The
//! leading axis is time for [`GriddedField`] and season for [`SeasonalField`].
//! Grid cells are flattened latitude-major: cell `(i, j)` has index
//! `i * n_lon + j`.

use crate::errors::{SeaIceError, SeaIceResult};
use crate::season::Season;
use crate::time_axis::TimeAxis;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rectangular latitude/longitude grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLonGrid {
    latitude: Vec<f64>,
    longitude: Vec<f64>,
}

impl LatLonGrid {
    pub fn new(latitude: Vec<f64>, longitude: Vec<f64>) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> &[f64] {
        &self.latitude
    }

    pub fn longitude(&self) -> &[f64] {
        &self.longitude
    }

    pub fn n_lat(&self) -> usize {
        self.latitude.len()
    }

    pub fn n_lon(&self) -> usize {
        self.longitude.len()
    }

    /// Number of grid cells
    pub fn size(&self) -> usize {
        self.n_lat() * self.n_lon()
    }

    /// Flattened index of cell `(i, j)`, `None` outside the grid
    pub fn cell_index(&self, i: usize, j: usize) -> Option<usize> {
        (i < self.n_lat() && j < self.n_lon()).then(|| i * self.n_lon() + j)
    }

    /// Latitude and longitude indices of a flattened cell index
    ///
    /// Returns `None` when `index` is not a cell of the grid, which includes
    /// every index of a grid with an empty coordinate.
    pub fn cell_of(&self, index: usize) -> Option<(usize, usize)> {
        (index < self.size()).then(|| (index / self.n_lon(), index % self.n_lon()))
    }

    /// Check that `values` has shape `(leading, n_lat, n_lon)`
    fn check_shape(&self, values: &Array3<f64>, leading: usize, what: &str) -> SeaIceResult<()> {
        let (n0, n1, n2) = values.dim();
        for (axis, expected, actual) in [
            ("time", leading, n0),
            ("latitude", self.n_lat(), n1),
            ("longitude", self.n_lon(), n2),
        ] {
            if expected != actual {
                return Err(SeaIceError::ShapeMismatch {
                    what: format!("{what} {axis} dimension"),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// A physical quantity sampled on a time × latitude × longitude grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddedField {
    grid: LatLonGrid,
    time: TimeAxis,
    values: Array3<f64>,
}

impl GriddedField {
    pub fn new(grid: LatLonGrid, time: TimeAxis, values: Array3<f64>) -> SeaIceResult<Self> {
        grid.check_shape(&values, time.len(), "field")?;
        Ok(Self { grid, time, values })
    }

    pub fn grid(&self) -> &LatLonGrid {
        &self.grid
    }

    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    /// Values at a single time index
    pub fn at_time(&self, index: usize) -> Option<ArrayView2<'_, f64>> {
        (index < self.time.len()).then(|| self.values.index_axis(Axis(0), index))
    }
}

/// Named variables sharing one grid and time axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddedDataset {
    grid: LatLonGrid,
    time: TimeAxis,
    variables: BTreeMap<String, Array3<f64>>,
}

impl GriddedDataset {
    pub fn new(grid: LatLonGrid, time: TimeAxis) -> Self {
        Self {
            grid,
            time,
            variables: BTreeMap::new(),
        }
    }

    /// Add (or replace) a variable
    ///
    /// The variable must have shape `(time, latitude, longitude)`.
    pub fn insert_variable(&mut self, name: &str, values: Array3<f64>) -> SeaIceResult<()> {
        self.grid.check_shape(&values, self.time.len(), name)?;
        self.variables.insert(name.to_string(), values);
        Ok(())
    }

    /// Builder form of [`GriddedDataset::insert_variable`]
    pub fn with_variable(mut self, name: &str, values: Array3<f64>) -> SeaIceResult<Self> {
        self.insert_variable(name, values)?;
        Ok(self)
    }

    pub fn grid(&self) -> &LatLonGrid {
        &self.grid
    }

    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Array3<f64>)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn variable(&self, name: &str) -> SeaIceResult<&Array3<f64>> {
        self.variables
            .get(name)
            .ok_or_else(|| SeaIceError::MissingVariable(name.to_string()))
    }

    /// Copy a single variable out as a standalone field
    pub fn field(&self, name: &str) -> SeaIceResult<GriddedField> {
        GriddedField::new(
            self.grid.clone(),
            self.time.clone(),
            self.variable(name)?.clone(),
        )
    }
}

/// A field indexed by season instead of time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalField {
    grid: LatLonGrid,
    seasons: Vec<Season>,
    values: Array3<f64>,
}

impl SeasonalField {
    pub fn new(grid: LatLonGrid, seasons: Vec<Season>, values: Array3<f64>) -> SeaIceResult<Self> {
        grid.check_shape(&values, seasons.len(), "seasonal field")?;
        Ok(Self {
            grid,
            seasons,
            values,
        })
    }

    pub fn grid(&self) -> &LatLonGrid {
        &self.grid
    }

    /// Seasons present, in the order of the leading axis
    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    /// Values for a single season, if present
    pub fn season(&self, season: Season) -> Option<ArrayView2<'_, f64>> {
        self.seasons
            .iter()
            .position(|&s| s == season)
            .map(|i| self.values.index_axis(Axis(0), i))
    }

    /// Cells holding a finite value in the first season
    ///
    /// Used to blank out cells that carry no data before presenting a map.
    pub fn valid_mask(&self) -> Array2<bool> {
        match self.seasons.first() {
            Some(_) => self.values.index_axis(Axis(0), 0).mapv(f64::is_finite),
            None => Array2::from_elem((self.grid.n_lat(), self.grid.n_lon()), false),
        }
    }
}

/// Seasonal counterpart of [`GriddedDataset`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalDataset {
    grid: LatLonGrid,
    seasons: Vec<Season>,
    variables: BTreeMap<String, Array3<f64>>,
}

impl SeasonalDataset {
    pub(crate) fn from_parts(
        grid: LatLonGrid,
        seasons: Vec<Season>,
        variables: BTreeMap<String, Array3<f64>>,
    ) -> Self {
        Self {
            grid,
            seasons,
            variables,
        }
    }

    pub fn grid(&self) -> &LatLonGrid {
        &self.grid
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    /// Copy a single variable out as a standalone seasonal field
    pub fn variable(&self, name: &str) -> SeaIceResult<SeasonalField> {
        let values = self
            .variables
            .get(name)
            .ok_or_else(|| SeaIceError::MissingVariable(name.to_string()))?;
        SeasonalField::new(self.grid.clone(), self.seasons.clone(), values.clone())
    }
}
