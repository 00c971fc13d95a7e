//! Error types for geoimage operations.

use thiserror::Error;

/// Result type alias using GeoImageError.
pub type GeoImageResult<T> = Result<T, GeoImageError>;

/// Coarse error category surfaced to callers of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable/unwritable file or unsupported format.
    Io,
    /// Invalid data encountered while executing a node.
    Value,
    /// Invalid configuration detected before execution.
    Configuration,
}

/// Primary error type for geoimage operations.
#[derive(Debug, Error)]
pub enum GeoImageError {
    // === I/O Errors ===
    #[error("Failed to read '{path}': {message}")]
    FileRead { path: String, message: String },

    #[error("Failed to write '{path}': {message}")]
    FileWrite { path: String, message: String },

    #[error("Unsupported raster format: {0}")]
    UnsupportedFormat(String),

    #[error("Profile does not match bands: {0}")]
    ProfileMismatch(String),

    // === Value Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid band selection: {0}")]
    InvalidBandSelection(String),

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Shape mismatch: expected {expected} rows, table has {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Value '{value}' in column '{column}' (row {row}) is not numeric")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Input shapes do not overlap raster: {0}")]
    NoOverlap(String),

    #[error("Point ({x}, {y}) resolves to pixel ({row}, {col}) outside the {height}x{width} grid")]
    OutOfGrid {
        x: f64,
        y: f64,
        row: i64,
        col: i64,
        height: usize,
        width: usize,
    },

    #[error("Non-invertible geotransform: {0}")]
    NonInvertibleTransform(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unsupported envelope version {found} (supported: {supported})")]
    UnsupportedEnvelopeVersion { found: u16, supported: String },

    #[error("Corrupt envelope: {0}")]
    CorruptEnvelope(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    // === Configuration Errors ===
    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Column '{column}' has type {actual}, expected {expected}")]
    WrongColumnType {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Unknown color map: {0}")]
    UnknownColormap(String),

    #[error("Unknown base map: {0}")]
    UnknownBasemap(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl GeoImageError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeoImageError::FileRead { .. }
            | GeoImageError::FileWrite { .. }
            | GeoImageError::UnsupportedFormat(_)
            | GeoImageError::ProfileMismatch(_) => ErrorKind::Io,

            GeoImageError::MissingColumn(_)
            | GeoImageError::WrongColumnType { .. }
            | GeoImageError::UnknownColormap(_)
            | GeoImageError::UnknownBasemap(_)
            | GeoImageError::InvalidConfiguration(_) => ErrorKind::Configuration,

            _ => ErrorKind::Value,
        }
    }

    /// Process exit code for this error (sysexits.h values).
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Io => 74,
            ErrorKind::Value => 65,
            ErrorKind::Configuration => 78,
        }
    }

    /// Create a FileRead error.
    pub fn file_read(path: impl AsRef<std::path::Path>, msg: impl ToString) -> Self {
        Self::FileRead {
            path: path.as_ref().display().to_string(),
            message: msg.to_string(),
        }
    }

    /// Create a FileWrite error.
    pub fn file_write(path: impl AsRef<std::path::Path>, msg: impl ToString) -> Self {
        Self::FileWrite {
            path: path.as_ref().display().to_string(),
            message: msg.to_string(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: msg.into(),
        }
    }

    /// Create a WrongColumnType error.
    pub fn wrong_column_type(
        column: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::WrongColumnType {
            column: column.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<serde_json::Error> for GeoImageError {
    fn from(err: serde_json::Error) -> Self {
        GeoImageError::InvalidParameter {
            param: "json".to_string(),
            message: err.to_string(),
        }
    }
}
