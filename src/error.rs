//! Error types for registry construction.
//!
//! Every failure aborts the registry: there is no partial result and no retry.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading layer data or assembling the layer list.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Embedded or external GeoJSON could not be parsed.
    #[error("Failed to parse GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Shapefile or dBase input could not be read.
    #[error("Failed to read shapefile: {0}")]
    Shapefile(String),

    /// CRS code not understood by this crate.
    #[error("Unsupported CRS code: {0}")]
    UnsupportedCrs(String),

    /// No layer with this identifier has been built.
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    /// Field metadata names an attribute the layer's features do not carry.
    #[error("Layer {layer} has no attribute named {field}")]
    UnknownField { layer: String, field: String },

    /// Field metadata only applies to vector layers.
    #[error("Layer {0} is not a vector layer")]
    NotAVectorLayer(String),

    /// A manifest or data file could not be read, or is not valid UTF-8.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest JSON is malformed or does not match the expected shape.
    #[error("Invalid manifest: {0}")]
    Manifest(#[source] serde_json::Error),

    /// The layer list or a layer's features could not be written as JSON.
    #[error("Failed to serialize: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl From<shapefile::Error> for LayerError {
    fn from(e: shapefile::Error) -> Self {
        LayerError::Shapefile(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
