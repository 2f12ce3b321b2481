use thiserror::Error;

/// Error type for invalid analysis operations.
#[derive(Error, Debug)]
pub enum SeaIceError {
    #[error("Unknown calendar: {0}")]
    UnknownCalendar(String),
    #[error("Seasonal weights for {season} sum to {sum}, expected 1.0")]
    InvariantViolation { season: String, sum: f64 },
    #[error("Timestep {timestep} is out of range for a time dimension of length {len}")]
    InvalidTimestep { timestep: i64, len: usize },
    #[error("{samples} grid cells are not enough to form {clusters} clusters")]
    InsufficientSamples { samples: usize, clusters: usize },
    #[error("Number of clusters must be at least 1, got {0}")]
    InvalidClusterCount(usize),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid month: {0}. Must be 1-12")]
    InvalidMonth(u32),
    #[error("Could not parse time units {0:?}. Expected \"<unit> since <date>\"")]
    InvalidTimeUnits(String),
    #[error("Feature vector for grid cell {index} contains a non-finite value")]
    NonFiniteFeature { index: usize },
    #[error("Variable {0} not found")]
    MissingVariable(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),
}

/// Convenience type for `Result<T, SeaIceError>`.
pub type SeaIceResult<T> = Result<T, SeaIceError>;
