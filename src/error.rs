use thiserror::Error;

/// Errors raised while saving or loading drawing content
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize drawing: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to access drawing data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Drawing data is empty")]
    Empty,

    #[error("Invalid drawing name: {0}")]
    InvalidName(String),
}

/// Errors raised while fetching or decoding an image for an image component
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Failed to read image data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Request failed: {0}")]
    Request(#[from] Box<ureq::Error>),

    #[error("Image load was superseded by a newer request")]
    Superseded,

    #[error("Image download was cancelled")]
    Cancelled,
}

/// Errors raised while parsing a compact ink path string
#[derive(Debug, Error, PartialEq)]
pub enum PathParseError {
    #[error("Path {path} has an odd number of coordinates ({count})")]
    OddCoordinateCount { path: usize, count: usize },

    #[error("Path {path} has an invalid coordinate {value:?}")]
    InvalidNumber { path: usize, value: String },
}

/// Errors raised while producing a canvas snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Screenshot has no pixels inside the canvas")]
    EmptyImage,

    #[error("Snapshot request was dropped before the canvas painted")]
    Cancelled,
}

/// Errors raised while loading engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
pub type ImageLoadResult<T> = Result<T, ImageLoadError>;
pub type SnapshotResult<T> = Result<T, SnapshotError>;
