//! Reading gridded sea-ice datasets from NetCDF
//!
//! The file is expected to hold 1-D `latitude`, `longitude` and `time`
//! coordinate variables and one `(time, latitude, longitude)` variable for each
//! name in [`AnalysisConfig::variables`]. `lat`/`lon` are accepted as
//! coordinate aliases.
//!
//! The time coordinate is decoded from its `units` attribute. Its `calendar`
//! attribute, when present, takes precedence over [`AnalysisConfig::calendar`].
//! `_FillValue` and `missing_value` entries become NaN and packed variables are
//! unpacked with `scale_factor`/`add_offset`.

use crate::calendar::Calendar;
use crate::config::AnalysisConfig;
use crate::errors::{SeaIceError, SeaIceResult};
use crate::grid::{GriddedDataset, LatLonGrid};
use crate::time_axis::TimeAxis;
use log::{debug, info};
use ndarray::Array3;
use std::path::Path;

/// A dataset together with the calendar its time axis was decoded with
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub dataset: GriddedDataset,
    pub calendar: Calendar,
}

/// Read the configured variables of a NetCDF file
pub fn read_dataset(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> SeaIceResult<LoadedDataset> {
    let path = path.as_ref();
    let file = netcdf::open(path)?;

    let latitude = read_coord(&file, &["latitude", "lat"])?;
    let longitude = read_coord(&file, &["longitude", "lon"])?;

    let time_var = file
        .variable("time")
        .ok_or_else(|| SeaIceError::MissingVariable("time".to_string()))?;
    let offsets: Vec<f64> = time_var.get_values(..)?;
    let units = attribute_string(&time_var, "units")
        .ok_or_else(|| SeaIceError::InvalidTimeUnits(String::new()))?;
    let calendar = match attribute_string(&time_var, "calendar") {
        Some(name) => name.parse()?,
        None => config.calendar,
    };
    let time = TimeAxis::from_cf_offsets(&offsets, &units, calendar)?;

    info!(
        "Reading {} ({} times, {}x{} grid, calendar {calendar})",
        path.display(),
        time.len(),
        latitude.len(),
        longitude.len()
    );

    let shape = (time.len(), latitude.len(), longitude.len());
    let mut dataset = GriddedDataset::new(LatLonGrid::new(latitude, longitude), time);
    for name in config.variables() {
        let values = read_variable(&file, name, shape)?;
        dataset.insert_variable(name, values)?;
    }

    Ok(LoadedDataset { dataset, calendar })
}

fn read_coord(file: &netcdf::File, names: &[&str]) -> SeaIceResult<Vec<f64>> {
    for name in names {
        if let Some(var) = file.variable(name) {
            return Ok(var.get_values(..)?);
        }
    }
    Err(SeaIceError::MissingVariable(names.join(" or ")))
}

fn read_variable(
    file: &netcdf::File,
    name: &str,
    shape: (usize, usize, usize),
) -> SeaIceResult<Array3<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| SeaIceError::MissingVariable(name.to_string()))?;

    let scale = attribute_f64(&var, "scale_factor").unwrap_or(1.0);
    let offset = attribute_f64(&var, "add_offset").unwrap_or(0.0);
    let missing: Vec<f64> = ["_FillValue", "missing_value"]
        .into_iter()
        .filter_map(|attr| attribute_f64(&var, attr))
        .collect();

    let raw: Vec<f64> = var.get_values(..)?;
    let expected = shape.0 * shape.1 * shape.2;
    if raw.len() != expected {
        return Err(SeaIceError::ShapeMismatch {
            what: name.to_string(),
            expected,
            actual: raw.len(),
        });
    }
    debug!("{name}: scale={scale}, offset={offset}, missing={missing:?}");

    let values = raw
        .into_iter()
        .map(|v| {
            if missing.contains(&v) {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();

    Array3::from_shape_vec(shape, values).map_err(|_| SeaIceError::ShapeMismatch {
        what: name.to_string(),
        expected,
        actual: expected,
    })
}

fn attribute_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            netcdf::AttributeValue::Int(i) => Some(i as f64),
            netcdf::AttributeValue::Schar(b) => Some(b as f64),
            netcdf::AttributeValue::Uchar(b) => Some(b as f64),
            _ => None,
        })
}

fn attribute_string(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}
