//! Spatial clustering of a gridded field at a single timestep
//!
//! Every grid cell becomes a feature vector `(value, latitude, longitude)` and
//! the cells are partitioned with spectral clustering:
//!
//! 1. an RBF affinity graph is built over all pairs of feature vectors
//! 2. the graph is embedded using the eigenvectors of its normalised Laplacian
//! 3. the embedded points are grouped with k-means
//!
//! Features are used in their raw units. Latitude and longitude are in degrees
//! while the value is in the field's own unit (e.g. percent ice concentration),
//! so the relative influence of position and value depends on those units.
//!
//! # Cost
//!
//! The affinity matrix and the eigendecomposition are dense: memory grows with
//! the square of the number of grid cells and time with its cube. Callers should
//! subset the grid before clustering large domains.
//!
//! # Examples
//!
//! ```rust
//! use ndarray::Array3;
//! use seaice_core::clustering::{compute_clusters, SpectralParameters};
//!
//! let latitude = vec![80.0, 80.1];
//! let longitude = vec![0.0, 0.1, 0.2];
//! let values = Array3::from_elem((1, 2, 3), 95.0);
//!
//! let params = SpectralParameters::with_clusters(1);
//! let labels = compute_clusters(0, &latitude, &longitude, values.view(), &params).unwrap();
//! assert_eq!(labels.labels(), &[0, 0, 0, 0, 0, 0]);
//! ```

mod affinity;
mod embedding;
mod kmeans;

use crate::errors::{SeaIceError, SeaIceResult};
use crate::grid::GriddedField;
use log::{debug, warn};
use ndarray::{Array2, ArrayView3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of grid cells above which the dense affinity matrix is reported
pub const LARGE_GRID_CELLS: usize = 4096;

/// Parameters for spectral clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralParameters {
    /// Number of clusters to form
    ///
    /// Default: 10
    pub n_clusters: usize,
    /// RBF kernel coefficient
    ///
    /// Default: 1.0
    pub gamma: f64,
    /// Number of k-means restarts on the spectral embedding
    ///
    /// Default: 10
    pub n_init: usize,
    /// Maximum Lloyd iterations per k-means restart
    ///
    /// Default: 300
    pub max_iter: usize,
    /// Relative convergence tolerance for k-means
    ///
    /// Default: 1e-4
    pub tol: f64,
    /// Seed of the first k-means restart
    ///
    /// Default: 0
    pub seed: u64,
}

impl Default for SpectralParameters {
    fn default() -> Self {
        Self {
            n_clusters: 10,
            gamma: 1.0,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: 0,
        }
    }
}

impl SpectralParameters {
    /// Default parameters with `n_clusters` clusters
    pub fn with_clusters(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SeaIceResult<()> {
        if self.n_clusters == 0 {
            return Err(SeaIceError::InvalidClusterCount(self.n_clusters));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(SeaIceError::InvalidParameter(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if self.n_init == 0 || self.max_iter == 0 {
            return Err(SeaIceError::InvalidParameter(
                "n_init and max_iter must be at least 1".to_string(),
            ));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(SeaIceError::InvalidParameter(format!(
                "tol must be non-negative, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Cluster id of every grid cell at one timestep
///
/// Labels are flattened latitude-major: cell `(i, j)` is at `i * n_lon + j`.
/// Ids are only meaningful within a single labelling; the same id at another
/// timestep or with another cluster count does not denote the same region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLabels {
    labels: Vec<usize>,
    n_lat: usize,
    n_lon: usize,
}

impl ClusterLabels {
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Flattened index of cell `(i, j)`, `None` outside the grid
    pub fn cell_index(&self, i: usize, j: usize) -> Option<usize> {
        (i < self.n_lat && j < self.n_lon).then(|| i * self.n_lon + j)
    }

    /// Latitude and longitude indices of a flattened cell index
    pub fn cell_of(&self, index: usize) -> Option<(usize, usize)> {
        (index < self.labels.len()).then(|| (index / self.n_lon, index % self.n_lon))
    }

    /// Label of cell `(i, j)`
    pub fn get(&self, i: usize, j: usize) -> Option<usize> {
        self.cell_index(i, j).map(|index| self.labels[index])
    }

    /// Largest label plus one
    pub fn n_clusters_found(&self) -> usize {
        self.labels.iter().max().map_or(0, |&m| m + 1)
    }

    /// Number of cells carrying each label
    pub fn cluster_sizes(&self) -> BTreeMap<usize, usize> {
        let mut sizes = BTreeMap::new();
        for &label in &self.labels {
            *sizes.entry(label).or_insert(0) += 1;
        }
        sizes
    }

    /// Labels reshaped to `(n_lat, n_lon)`
    pub fn to_grid(&self) -> Array2<usize> {
        Array2::from_shape_fn((self.n_lat, self.n_lon), |(i, j)| {
            self.labels[i * self.n_lon + j]
        })
    }
}

/// Build the `(value, latitude, longitude)` feature matrix for one timestep
///
/// Row `i * n_lon + j` holds cell `(i, j)`.
pub fn build_features(
    timestep: usize,
    latitude: &[f64],
    longitude: &[f64],
    values: ArrayView3<'_, f64>,
) -> Array2<f64> {
    let n_lon = longitude.len();
    Array2::from_shape_fn((latitude.len() * n_lon, 3), |(row, feature)| {
        let (i, j) = (row / n_lon, row % n_lon);
        match feature {
            0 => values[[timestep, i, j]],
            1 => latitude[i],
            _ => longitude[j],
        }
    })
}

/// Partition the grid cells at `timestep` into `params.n_clusters` clusters
///
/// `values` has shape `(time, latitude.len(), longitude.len())`. Returns one
/// label per grid cell, see [`ClusterLabels`] for the layout.
///
/// # Errors
///
/// - [`SeaIceError::InvalidTimestep`] if `timestep` is negative or beyond the time dimension
/// - [`SeaIceError::InsufficientSamples`] if the grid has fewer cells than clusters
/// - [`SeaIceError::ShapeMismatch`] if the coordinates do not match `values`
/// - [`SeaIceError::NonFiniteFeature`] if a value at `timestep` is NaN or infinite
pub fn compute_clusters(
    timestep: i64,
    latitude: &[f64],
    longitude: &[f64],
    values: ArrayView3<'_, f64>,
    params: &SpectralParameters,
) -> SeaIceResult<ClusterLabels> {
    params.validate()?;

    let (n_time, n_lat, n_lon) = values.dim();
    for (what, expected, actual) in [
        ("latitude", n_lat, latitude.len()),
        ("longitude", n_lon, longitude.len()),
    ] {
        if expected != actual {
            return Err(SeaIceError::ShapeMismatch {
                what: what.to_string(),
                expected,
                actual,
            });
        }
    }

    let t = usize::try_from(timestep)
        .ok()
        .filter(|&t| t < n_time)
        .ok_or(SeaIceError::InvalidTimestep {
            timestep,
            len: n_time,
        })?;

    let n_samples = n_lat * n_lon;
    let k = params.n_clusters;
    if n_samples == 0 || n_samples < k {
        return Err(SeaIceError::InsufficientSamples {
            samples: n_samples,
            clusters: k,
        });
    }

    let labels = if k == 1 {
        vec![0; n_samples]
    } else {
        let features = build_features(t, latitude, longitude, values);
        if let Some(index) = features
            .rows()
            .into_iter()
            .position(|row| row.iter().any(|v| !v.is_finite()))
        {
            return Err(SeaIceError::NonFiniteFeature { index });
        }

        if n_samples > LARGE_GRID_CELLS {
            let mib = (n_samples * n_samples * std::mem::size_of::<f64>()) as f64 / 1048576.0;
            warn!(
                "Clustering {n_samples} grid cells needs a dense \
                 {n_samples}x{n_samples} affinity matrix ({mib:.1} MiB)"
            );
        }
        debug!("Spectral clustering of timestep {t}: {n_samples} cells into {k} clusters");

        let affinity = affinity::rbf_affinity(&features, params.gamma);
        let embedded = embedding::spectral_embedding(&affinity, k);
        kmeans::kmeans(
            &embedded,
            k,
            params.n_init,
            params.max_iter,
            params.tol,
            params.seed,
        )
        .labels
    };

    Ok(ClusterLabels {
        labels,
        n_lat,
        n_lon,
    })
}

/// [`compute_clusters`] for a [`GriddedField`]
pub fn cluster_field(
    field: &GriddedField,
    timestep: i64,
    params: &SpectralParameters,
) -> SeaIceResult<ClusterLabels> {
    compute_clusters(
        timestep,
        field.grid().latitude(),
        field.grid().longitude(),
        field.values().view(),
        params,
    )
}

/// Cluster several timesteps independently
///
/// Stops at the first failing timestep.
pub fn compute_clusters_many(
    timesteps: &[i64],
    latitude: &[f64],
    longitude: &[f64],
    values: ArrayView3<'_, f64>,
    params: &SpectralParameters,
) -> SeaIceResult<Vec<ClusterLabels>> {
    timesteps
        .iter()
        .map(|&t| compute_clusters(t, latitude, longitude, values, params))
        .collect()
}
