/// Error types for map rendering
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    /// Boundary file does not exist
    #[error("Boundary file not found at {}", .0.display())]
    BoundaryFileMissing(PathBuf),

    /// Boundary file could not be read
    #[error("Failed to read boundary file {}: {source}", .path.display())]
    BoundaryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Boundary file is not a GeoJSON FeatureCollection
    #[error("Failed to parse boundary file: {0}")]
    BoundaryParse(String),

    /// No requested state has a boundary
    #[error("No valid state geometries found")]
    NoGeometry,

    /// No state asked for two or more years
    #[error("No comparative maps generated: insufficient years or data")]
    NoComparative,
}

pub type Result<T> = std::result::Result<T, MapError>;
