use std::path::PathBuf;

/// Errors surfaced by the store, the registry and the regression functions.
///
/// Row-level problems during a load (unparsable cells, unknown country codes)
/// are not represented here: they are skipped and counted in
/// [`crate::store::LoadReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum GeoStatError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("no data available for year {year}")]
    NoDataAvailable { year: i32 },

    #[error("fit undefined: {0}")]
    FitUndefined(&'static str),

    #[error("unknown {region_type} '{name}'")]
    UnknownRegion { region_type: String, name: String },

    #[error("paired query needs two distinct indicators, got '{0}' twice")]
    SameIndicator(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid country record: {0}")]
    InvalidRecord(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed file {}: {message}", .path.display())]
    MalformedFile { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GeoStatError>;
