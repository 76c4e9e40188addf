#![warn(clippy::all)]

//! Layer Registry - the layer list of an exported web map.
//!
//! Builds the ordered list of layers a web map viewer displays: an XYZ
//! satellite basemap, vector layers loaded from GeoJSON (or shapefiles) and
//! reprojected into the view CRS, and static georeferenced images. Each layer
//! carries its title and legend, opacity, visibility, style reference and the
//! attribute metadata used by the feature popup.
//!
//! ```ignore
//! let layers = layer_registry::export::build_registry()?;
//! println!("{}", layers.to_json(true)?);
//! ```

pub mod error;
pub mod export;
pub mod geo;
pub mod manifest;
pub mod registry;

pub use error::{LayerError, Result};
pub use registry::{LayerList, LayerRegistryBuilder};

/// Version of the crate, injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
