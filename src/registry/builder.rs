//! Layer registry construction.
//!
//! The builder is a single linear pass: layers are appended in stacking
//! order, decorated by id, and handed over as a [`LayerList`] by
//! [`LayerRegistryBuilder::finalize`]. The first error aborts the build.

use super::{
    FieldMetadata, LabelMode, LayerDescriptor, LayerId, LayerList, LayerSource, LayerTitle,
    Opacity, RenderHook, StaticImageSource, StyleRef, TileSource,
};
use crate::error::{LayerError, Result};
use crate::geo::{Crs, Extent, VectorSource};

/// Builds the ordered layer list.
#[derive(Debug, Default)]
pub struct LayerRegistryBuilder {
    layers: Vec<LayerDescriptor>,
}

impl LayerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, title: LayerTitle, opacity: f64, source: LayerSource) -> LayerId {
        let id = LayerId::from_name(&title.text, self.layers.len());
        log::debug!("Adding {:?} layer {}", source.kind(), id);
        let layer = LayerDescriptor::new(id.clone(), title, Opacity::new(opacity), source);
        self.layers.push(layer);
        id
    }

    fn layer_mut(&mut self, id: &LayerId) -> Result<&mut LayerDescriptor> {
        self.layers
            .iter_mut()
            .find(|layer| &layer.id == id)
            .ok_or_else(|| LayerError::UnknownLayer(id.to_string()))
    }

    /// Returns a layer built so far.
    pub fn layer(&self, id: &LayerId) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|layer| &layer.id == id)
    }

    /// Adds an XYZ tile layer. The URL template is stored verbatim.
    pub fn build_tile_layer(
        &mut self,
        title: impl Into<LayerTitle>,
        opacity: f64,
        url_template: &str,
        attribution: &str,
    ) -> LayerId {
        let source = LayerSource::Tile(TileSource {
            url_template: url_template.to_string(),
            attribution: attribution.to_string(),
        });
        self.push(title.into(), opacity, source)
    }

    /// Parses GeoJSON, reprojects it from `data_crs` to `view_crs` and adds
    /// it as a vector layer.
    pub fn build_vector_layer(
        &mut self,
        raw_geojson: &str,
        data_crs: Crs,
        view_crs: Crs,
        style: StyleRef,
        title: impl Into<LayerTitle>,
        interactive: bool,
    ) -> Result<LayerId> {
        let source = VectorSource::from_geojson(raw_geojson, data_crs, view_crs)?;
        Ok(self.add_vector_source(source, style, title, interactive))
    }

    /// Adds a vector layer over features that are already in the view CRS.
    pub fn add_vector_source(
        &mut self,
        source: VectorSource,
        style: StyleRef,
        title: impl Into<LayerTitle>,
        interactive: bool,
    ) -> LayerId {
        let title = title.into();
        let popup_title = title.text.clone();
        log::info!("Loaded {} features for {}", source.len(), title.text);

        let id = self.push(title, 1.0, LayerSource::Vector(source));
        if let Some(layer) = self.layers.last_mut() {
            layer.style = Some(style);
            layer.interactive = interactive;
            layer.popup_title = Some(popup_title);
        }
        id
    }

    /// Adds a single image stretched over `extent`.
    ///
    /// The extent is stored unchanged; nothing checks that the image covers it.
    pub fn build_static_image_layer(
        &mut self,
        title: impl Into<LayerTitle>,
        url: &str,
        extent: Extent,
        projection: Crs,
        opacity: f64,
    ) -> LayerId {
        let source = LayerSource::StaticImage(StaticImageSource {
            url: url.to_string(),
            extent,
            projection,
            attribution: String::new(),
            always_in_range: true,
        });
        self.push(title.into(), opacity, source)
    }

    /// Records alias, label mode and widget hints for a vector layer's fields.
    ///
    /// Every field named must be an attribute of the layer's features.
    pub fn attach_field_metadata(
        &mut self,
        id: &LayerId,
        aliases: &[(&str, &str)],
        labels: &[(&str, LabelMode)],
        widgets: &[(&str, &str)],
    ) -> Result<()> {
        let metadata = FieldMetadata::from_parallel(aliases, labels, widgets);
        self.set_field_metadata(id, metadata)
    }

    /// Attaches an already assembled [`FieldMetadata`] after validating it.
    pub fn set_field_metadata(&mut self, id: &LayerId, metadata: FieldMetadata) -> Result<()> {
        let layer = self.layer_mut(id)?;
        let source = match &layer.source {
            LayerSource::Vector(source) => source,
            _ => return Err(LayerError::NotAVectorLayer(id.to_string())),
        };

        if let Some(field) = metadata.field_names().find(|name| !source.has_field(name)) {
            return Err(LayerError::UnknownField {
                layer: id.to_string(),
                field: field.to_string(),
            });
        }

        layer.field_metadata = Some(metadata);
        Ok(())
    }

    /// Sets the initial visibility flag. Nothing is rendered here.
    pub fn set_initial_visibility(&mut self, id: &LayerId, visible: bool) -> Result<()> {
        self.layer_mut(id)?.visible = visible;
        Ok(())
    }

    /// Records a render hook for the viewer to apply to this layer.
    pub fn set_render_hook(&mut self, id: &LayerId, hook: RenderHook) -> Result<()> {
        self.layer_mut(id)?.render_hook = Some(hook);
        Ok(())
    }

    pub fn set_popup_title(&mut self, id: &LayerId, title: impl Into<String>) -> Result<()> {
        self.layer_mut(id)?.popup_title = Some(title.into());
        Ok(())
    }

    pub fn set_declutter(&mut self, id: &LayerId, declutter: bool) -> Result<()> {
        self.layer_mut(id)?.declutter = declutter;
        Ok(())
    }

    pub fn set_attribution(&mut self, id: &LayerId, attribution: &str) -> Result<()> {
        match &mut self.layer_mut(id)?.source {
            LayerSource::Tile(tile) => tile.attribution = attribution.to_string(),
            LayerSource::Vector(source) => source.attribution = attribution.to_string(),
            LayerSource::StaticImage(image) => image.attribution = attribution.to_string(),
        }
        Ok(())
    }

    /// Returns the layers in the order they were built.
    pub fn finalize(self) -> LayerList {
        log::info!("Layer registry built with {} layers", self.layers.len());
        LayerList::new(self.layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CompositeOperation, SourceKind};

    const COUNTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"NOM": "a", "NUMPOINTS": 5},
             "geometry": {"type": "Point", "coordinates": [5.37, 43.30]}},
            {"type": "Feature", "properties": {"NOM": "b", "NUMPOINTS": 10},
             "geometry": {"type": "Point", "coordinates": [4.63, 43.68]}}
        ]
    }"#;

    fn build_counts(builder: &mut LayerRegistryBuilder) -> LayerId {
        builder
            .build_vector_layer(
                COUNTS,
                Crs::Wgs84,
                Crs::WebMercator,
                StyleRef::new("style_Point_counts_1"),
                "Point_counts",
                true,
            )
            .unwrap()
    }

    #[test]
    fn test_vector_layer_with_aliases() {
        let mut builder = LayerRegistryBuilder::new();
        let id = build_counts(&mut builder);
        let aliases = [("NOM", "NOM"), ("NUMPOINTS", "NUMPOINTS")];
        builder
            .attach_field_metadata(&id, &aliases, &[], &[])
            .unwrap();

        let list = builder.finalize();
        let layer = list.get(&id).unwrap();
        let metadata = layer.field_metadata().unwrap();
        assert_eq!(metadata.alias("NOM"), Some("NOM"));

        let source = layer.vector_source().unwrap();
        assert_eq!(source.len(), 2);
        let names: Vec<_> = source
            .features()
            .iter()
            .map(|f| f.property("NOM").cloned())
            .collect();
        assert_eq!(
            names,
            vec![Some(serde_json::json!("a")), Some(serde_json::json!("b"))]
        );
        assert!(layer.is_interactive());
        assert_eq!(layer.popup_title(), Some("Point_counts"));
    }

    #[test]
    fn test_static_image_layer_keeps_extent() {
        let mut builder = LayerRegistryBuilder::new();
        let extent = Extent::new(
            -620985.841593,
            5150243.688084,
            960284.595006,
            6644218.298817,
        );
        let projection: Crs = "EPSG:3857".parse().unwrap();
        let id = builder.build_static_image_layer(
            "Typologie des climats français",
            "./layers/Typologiedesclimatsfranais_3.png",
            extent,
            projection,
            1.0,
        );

        let list = builder.finalize();
        let layer = list.get(&id).unwrap();
        assert_eq!(layer.opacity(), 1.0);
        assert_eq!(layer.extent(), Some(extent));
        assert_eq!(layer.kind(), SourceKind::StaticImage);
    }

    #[test]
    fn test_finalize_preserves_build_order() {
        let mut builder = LayerRegistryBuilder::new();
        let tile = builder.build_tile_layer("Base", 1.0, "https://tiles/{z}/{x}/{y}", "");
        let counts = build_counts(&mut builder);
        let image = builder.build_static_image_layer(
            "Overlay",
            "overlay.png",
            Extent::new(0.0, 0.0, 1.0, 1.0),
            Crs::WebMercator,
            0.5,
        );

        let list = builder.finalize();
        let ids: Vec<&LayerId> = list.iter().map(|l| l.id()).collect();
        assert_eq!(ids, vec![&tile, &counts, &image]);
        assert_eq!(counts.as_str(), "lyr_Point_counts_1");
    }

    #[test]
    fn test_unknown_metadata_field_is_rejected() {
        let mut builder = LayerRegistryBuilder::new();
        let id = build_counts(&mut builder);

        let aliases = [("NOM", "NOM"), ("SURFACE", "SURFACE")];
        let result = builder.attach_field_metadata(&id, &aliases, &[], &[]);

        match result {
            Err(LayerError::UnknownField { field, .. }) => assert_eq!(field, "SURFACE"),
            other => panic!("expected UnknownField, got {:?}", other),
        }
        assert!(builder.layer(&id).unwrap().field_metadata().is_none());
    }

    #[test]
    fn test_metadata_on_tile_layer_is_rejected() {
        let mut builder = LayerRegistryBuilder::new();
        let id = builder.build_tile_layer("Base", 1.0, "https://tiles/{z}/{x}/{y}", "");

        let result = builder.attach_field_metadata(&id, &[("NOM", "NOM")], &[], &[]);
        assert!(matches!(result, Err(LayerError::NotAVectorLayer(_))));
    }

    #[test]
    fn test_unknown_layer_is_rejected() {
        let mut builder = LayerRegistryBuilder::new();
        let result = builder.set_initial_visibility(&LayerId::from("lyr_missing_0"), false);
        assert!(matches!(result, Err(LayerError::UnknownLayer(_))));
    }

    #[test]
    fn test_visibility_and_hook_are_recorded() {
        let mut builder = LayerRegistryBuilder::new();
        let id = build_counts(&mut builder);
        builder.set_initial_visibility(&id, false).unwrap();
        builder
            .set_render_hook(
                &id,
                RenderHook::Precompose {
                    composite: CompositeOperation::Normal,
                },
            )
            .unwrap();

        let layer = builder.layer(&id).unwrap();
        assert!(!layer.is_visible());
        assert!(layer.render_hook().is_some());
    }

    #[test]
    fn test_malformed_geojson_aborts() {
        let mut builder = LayerRegistryBuilder::new();
        let result = builder.build_vector_layer(
            "not json",
            Crs::Wgs84,
            Crs::WebMercator,
            StyleRef::new("style"),
            "Broken",
            true,
        );
        assert!(matches!(result, Err(LayerError::GeoJson(_))));
        assert!(builder.finalize().is_empty());
    }
}
