//! Geographic data for vector layers.
//!
//! This module provides coordinate reference systems, features loaded from
//! GeoJSON or shapefiles, and the vector sources that hold them once they
//! have been reprojected into the view CRS.

mod extent;
pub mod feature;
mod projection;
mod source;

pub use extent::Extent;
pub use feature::Feature;
pub use projection::{geographic_to_mercator, mercator_to_geographic, Crs};
pub use source::VectorSource;
