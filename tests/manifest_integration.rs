//! Builds registries from manifests on disk.

use std::fs;

use layer_registry::geo::Crs;
use layer_registry::manifest::RegistryManifest;
use layer_registry::registry::{LabelMode, SourceKind};
use layer_registry::LayerError;
use tempfile::TempDir;

const COUNTS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"NOM": "a", "NUMPOINTS": 5},
         "geometry": {"type": "Point", "coordinates": [5.37, 43.30]}},
        {"type": "Feature", "properties": {"NOM": "b", "NUMPOINTS": 10},
         "geometry": {"type": "Point", "coordinates": [4.63, 43.68]}}
    ]
}"#;

fn write_manifest(dir: &TempDir, manifest: &str) -> std::path::PathBuf {
    fs::write(dir.path().join("counts.geojson"), COUNTS).unwrap();
    let path = dir.path().join("layers.json");
    fs::write(&path, manifest).unwrap();
    path
}

#[test]
fn test_manifest_builds_vector_layer_with_metadata() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"{
            "layers": [
                {"kind": "tile", "title": {"text": "Google Satellite"},
                 "url": "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}"},
                {"kind": "vector",
                 "title": {"text": "Point_counts",
                           "legend": {"type": "symbol", "value": "styles/legend/p.png"}},
                 "data": "counts.geojson", "style": "style_Point_counts_1",
                 "fields": {
                     "aliases": {"NOM": "Commune", "NUMPOINTS": "Fires"},
                     "labels": {"NOM": "inline label - visible with data"},
                     "widgets": {"NOM": "TextEdit"}
                 },
                 "render_hook": {"event": "precompose", "composite": "normal"}}
            ]
        }"#,
    );

    let list = RegistryManifest::load(&path).unwrap().build().unwrap();

    assert_eq!(list.len(), 2);
    let counts = &list[1];
    assert_eq!(counts.id().as_str(), "lyr_Point_counts_1");
    assert_eq!(counts.kind(), SourceKind::Vector);
    assert!(counts.is_interactive());
    assert!(counts.render_hook().is_some());

    let source = counts.vector_source().unwrap();
    assert_eq!(source.len(), 2);
    assert_eq!(source.crs(), Crs::WebMercator);

    let metadata = counts.field_metadata().unwrap();
    let names: Vec<&str> = metadata.field_names().collect();
    assert_eq!(names, vec!["NOM", "NUMPOINTS"]);
    assert_eq!(metadata.alias("NUMPOINTS"), Some("Fires"));
    assert_eq!(metadata.label_mode("NOM"), Some(LabelMode::InlineWithData));
    // Hints the manifest leaves out stay unset.
    assert_eq!(metadata.label_mode("NUMPOINTS"), None);
    assert_eq!(metadata.widget("NUMPOINTS"), None);

    let html = counts.title().to_html();
    assert_eq!(html, "<img src=\"styles/legend/p.png\" /> Point_counts");
}

#[test]
fn test_manifest_rejects_metadata_for_missing_field() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"{"layers": [
            {"kind": "vector", "title": {"text": "Point_counts"},
             "data": "counts.geojson", "style": "style_Point_counts_1",
             "fields": {"aliases": {"POPULATION": "POPULATION"}}}
        ]}"#,
    );

    let result = RegistryManifest::load(&path).unwrap().build();
    match result {
        Err(LayerError::UnknownField { layer, field }) => {
            assert_eq!(layer, "lyr_Point_counts_0");
            assert_eq!(field, "POPULATION");
        }
        other => panic!("expected UnknownField, got {:?}", other),
    }
}

#[test]
fn test_manifest_keeps_data_crs_when_view_matches() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"{"layers": [
            {"kind": "vector", "title": {"text": "Raw"}, "data": "counts.geojson",
             "style": "style_raw", "view_crs": "EPSG:4326", "interactive": false}
        ]}"#,
    );

    let list = RegistryManifest::load(&path).unwrap().build().unwrap();
    let source = list[0].vector_source().unwrap();
    let extent = source.extent().unwrap();

    assert!((extent.min_x - 4.63).abs() < 1e-9);
    assert!((extent.max_y - 43.68).abs() < 1e-9);
    assert!(!list[0].is_interactive());
}

#[test]
fn test_viewer_json_round_trips_order() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"{"layers": [
            {"kind": "tile", "title": {"text": "A"}, "url": "https://a/{z}/{x}/{y}"},
            {"kind": "vector", "title": {"text": "B"}, "data": "counts.geojson", "style": "s"},
            {"kind": "static_image", "title": {"text": "C"}, "url": "c.png",
             "extent": [1, 2, 3, 4]}
        ]}"#,
    );

    let list = RegistryManifest::load(&path).unwrap().build().unwrap();
    let json: serde_json::Value = serde_json::from_str(&list.to_json(true).unwrap()).unwrap();

    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["lyr_A_0", "lyr_B_1", "lyr_C_2"]);
    assert_eq!(json[1]["source"]["featureCount"], 2);
    assert_eq!(json[2]["source"]["projection"], "EPSG:3857");
}

#[test]
fn test_invalid_utf8_aborts_instead_of_replacing() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"{"layers": [
            {"kind": "vector", "title": {"text": "Broken"}, "data": "broken.geojson",
             "style": "style_broken"}
        ]}"#,
    );
    let mut raw = br#"{"type":"Feature","properties":{"NOM":"Mar"#.to_vec();
    raw.push(0xFF);
    raw.extend_from_slice(br#"seille"},"geometry":null}"#);
    fs::write(dir.path().join("broken.geojson"), raw).unwrap();

    match RegistryManifest::load(&path).unwrap().build() {
        Err(LayerError::Io { path, source }) => {
            assert!(path.ends_with("broken.geojson"), "{}", path.display());
            assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
        }
        other => panic!("expected an Io error, got {:?}", other),
    }

    let manifest = dir.path().join("latin1.json");
    fs::write(&manifest, b"{\"layers\": [], \"note\": \"caf\xE9\"}").unwrap();
    assert!(matches!(
        RegistryManifest::load(&manifest),
        Err(LayerError::Io { .. })
    ));
}
