//! The exported map: basemap, fire counts, communes and the climate overlay.
//!
//! Data and literal values come from the export step; this module only
//! assembles them into a [`LayerList`].

use crate::error::Result;
use crate::geo::{Crs, Extent};
use crate::registry::{
    CompositeOperation, LabelMode, LayerList, LayerRegistryBuilder, LayerTitle, LegendEntry,
    RenderHook, StyleRef,
};

const POINT_COUNTS_GEOJSON: &str = include_str!("../data/Point_counts_1.geojson");
const COMMUNES_GEOJSON: &str = include_str!("../data/COMMUNE_BR_unique_2.geojson");

const SATELLITE_URL: &str = "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}";
const SATELLITE_ATTRIBUTION: &str = concat!(
    " &middot; <a href=\"https://www.google.at/permissions/geoguidelines/attr-guide.html\">",
    "Map data ©2015 Google</a>",
);

const CLIMATE_IMAGE: &str = "./layers/Typologiedesclimatsfranais_3.png";
const CLIMATE_EXTENT: [f64; 4] = [
    -620985.841593,
    5150243.688084,
    960284.595006,
    6644218.298817,
];

const COMMUNE_FIELDS: [&str; 17] = [
    "ID_GEOFLA",
    "CODE_COM",
    "INSEE_COM",
    "NOM_COM",
    "STATUT",
    "X_CHF_LIEU",
    "Y_CHF_LIEU",
    "X_CENTROID",
    "Y_CENTROID",
    "Z_MOYEN",
    "SUPERFICIE",
    "POPULATION",
    "CODE_ARR",
    "CODE_DEPT",
    "NOM_DEPT",
    "CODE_REG",
    "NOM_REG",
];

fn point_counts_title() -> LayerTitle {
    let classes = ["0 - 18", "18 - 60", "60 - 128", "128 - 232", "232 - 568"];
    let entries = classes
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let image = format!("styles/legend/Point_counts_1_{}.png", i);
            LegendEntry::new(image, *label)
        })
        .collect();
    LayerTitle::new("Point_counts").with_classes(entries)
}

/// Builds the exported layer list, bottom layer first.
pub fn build_registry() -> Result<LayerList> {
    let mut builder = LayerRegistryBuilder::new();

    let satellite = builder.build_tile_layer(
        "Google Satellite",
        1.0,
        SATELLITE_URL,
        SATELLITE_ATTRIBUTION,
    );

    let counts = builder.build_vector_layer(
        POINT_COUNTS_GEOJSON,
        Crs::Wgs84,
        Crs::WebMercator,
        StyleRef::new("style_Point_counts_1"),
        point_counts_title(),
        true,
    )?;
    builder.set_attribution(&counts, " ")?;

    let communes = builder.build_vector_layer(
        COMMUNES_GEOJSON,
        Crs::Wgs84,
        Crs::WebMercator,
        StyleRef::new("style_COMMUNE_BR_unique_2"),
        LayerTitle::new("COMMUNE_BR_unique").with_symbol("styles/legend/COMMUNE_BR_unique_2.png"),
        true,
    )?;
    builder.set_attribution(&communes, " ")?;

    let climate = builder.build_static_image_layer(
        "Typologie des climats français",
        CLIMATE_IMAGE,
        Extent::from(CLIMATE_EXTENT),
        Crs::WebMercator,
        1.0,
    );
    builder.set_attribution(&climate, " ")?;

    for layer in [&satellite, &counts, &communes, &climate] {
        builder.set_initial_visibility(layer, true)?;
    }

    builder.attach_field_metadata(
        &counts,
        &[("NOM", "NOM"), ("NUMPOINTS", "NUMPOINTS")],
        &[
            ("NOM", LabelMode::InlineWithData),
            ("NUMPOINTS", LabelMode::InlineWithData),
        ],
        &[("NOM", "TextEdit"), ("NUMPOINTS", "TextEdit")],
    )?;

    let aliases: Vec<(&str, &str)> = COMMUNE_FIELDS.iter().map(|f| (*f, *f)).collect();
    let labels: Vec<(&str, LabelMode)> = COMMUNE_FIELDS
        .iter()
        .map(|f| (*f, LabelMode::NoLabel))
        .collect();
    let widgets: Vec<(&str, &str)> = COMMUNE_FIELDS.iter().map(|f| (*f, "")).collect();
    builder.attach_field_metadata(&communes, &aliases, &labels, &widgets)?;

    // Supplied with the export for this layer only.
    builder.set_render_hook(
        &communes,
        RenderHook::Precompose {
            composite: CompositeOperation::Normal,
        },
    )?;

    Ok(builder.finalize())
}
