use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("elevation source failed at ({latitude}, {longitude}): {message}")]
pub struct SourceError {
    pub latitude: f64,
    pub longitude: f64,
    pub message: String,
}

impl SourceError {
    pub fn new<T: ToString>(latitude: f64, longitude: f64, message: T) -> Self {
        Self {
            latitude,
            longitude,
            message: message.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeodesicError {
    #[error("geodesic inverse did not converge between ({0}, {1}) and ({2}, {3})")]
    NoConvergence(f64, f64, f64, f64),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("lattice must be at least 2x2, got {width}x{height}")]
    InsufficientGrid { width: usize, height: usize },

    #[error("duplicate sample at ({latitude}, {longitude})")]
    DuplicateSample { latitude: f64, longitude: f64 },

    #[error(
        "sample at ({}, {}) does not sit on lattice row {row}, column {col}; expected ({}, {})",
        got.0, got.1, expected.0, expected.1
    )]
    IrregularLattice {
        row: usize,
        col: usize,
        expected: (f64, f64),
        got: (f64, f64),
    },

    #[error("lattice already holds all {expected} samples")]
    GridOverflow { expected: usize },

    #[error("lattice incomplete: expected {expected} samples, received {received}")]
    IncompleteGrid { expected: usize, received: usize },

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("mesh has zero extent, nothing to normalize")]
    DegenerateExtent,

    #[error(transparent)]
    Geodesic(#[from] GeodesicError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("table io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("table decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inconsistent tables: {0}")]
    Inconsistent(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Geodesic(#[from] GeodesicError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        Error::Mesh(MeshError::Source(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
