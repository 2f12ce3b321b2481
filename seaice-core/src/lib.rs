pub mod averaging;
pub mod calendar;
pub mod clustering;
pub mod config;
pub mod errors;
pub mod grid;
#[cfg(feature = "netcdf")]
pub mod io;
#[cfg(feature = "python")]
pub mod python;
pub mod season;
pub mod time_axis;
