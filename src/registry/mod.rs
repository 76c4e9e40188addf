//! Layer registry: descriptors, field metadata and the ordered layer list.

mod builder;
mod layer;
mod list;
mod metadata;

pub use builder::LayerRegistryBuilder;
pub use layer::{
    CompositeOperation, LayerDescriptor, LayerId, LayerSource, LayerTitle, Legend, LegendEntry,
    Opacity, RenderHook, SourceKind, StaticImageSource, StyleRef, TileSource,
};
pub use list::LayerList;
pub use metadata::{FieldHints, FieldMetadata, LabelMode};
