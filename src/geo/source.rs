//! Vector sources: feature sets loaded once and reprojected at load time.

use std::io::Cursor;

use geo_types::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use geojson::{FeatureCollection, GeoJson, JsonObject};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use shapefile::dbase::{FieldValue, Record};

use super::feature::{convert_geometry, for_each_coord};
use super::{Crs, Extent, Feature};
use crate::error::{LayerError, Result};

/// A set of features held in a single CRS.
///
/// Coordinates are reprojected into the view CRS when the source is built
/// and never transformed again afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSource {
    features: Vec<Feature>,
    crs: Crs,
    /// Attribution shown by the viewer for this source
    pub attribution: String,
}

impl VectorSource {
    /// Wraps features that are already expressed in `crs`.
    pub fn new(features: Vec<Feature>, crs: Crs) -> Self {
        Self {
            features,
            crs,
            attribution: String::new(),
        }
    }

    /// Parses GeoJSON and reprojects every feature from `data_crs` to `view_crs`.
    ///
    /// Accepts a FeatureCollection, a single Feature or a bare Geometry.
    /// Feature order and count are preserved, including features without
    /// geometry.
    pub fn from_geojson(raw: &str, data_crs: Crs, view_crs: Crs) -> Result<Self> {
        let geojson: GeoJson = raw.parse()?;

        let features: Vec<Feature> = match geojson {
            GeoJson::FeatureCollection(fc) => {
                fc.features.into_iter().map(Feature::from_geojson).collect()
            }
            GeoJson::Feature(f) => vec![Feature::from_geojson(f)],
            GeoJson::Geometry(g) => {
                let geometry = convert_geometry(&g.value);
                vec![Feature::new(Some(geometry), JsonObject::new())]
            }
        };

        log::debug!(
            "Parsed {} features, reprojecting {} -> {}",
            features.len(),
            data_crs,
            view_crs
        );

        Ok(Self::reprojected(features, data_crs, view_crs))
    }

    /// Loads features from a shapefile (.shp and optional .dbf bytes).
    ///
    /// Null shapes become features without geometry so that shapes and dBase
    /// records stay aligned by index.
    pub fn from_shapefile(
        shp_bytes: &[u8],
        dbf_bytes: Option<&[u8]>,
        data_crs: Crs,
        view_crs: Crs,
    ) -> Result<Self> {
        let mut shape_reader = shapefile::ShapeReader::new(Cursor::new(shp_bytes))?;

        let attributes: Vec<JsonObject> = match dbf_bytes {
            Some(bytes) => read_dbase_records(bytes)?,
            None => Vec::new(),
        };

        let mut features = Vec::new();
        for (idx, result) in shape_reader.iter_shapes().enumerate() {
            let shape = result?;
            let properties = attributes.get(idx).cloned().unwrap_or_default();
            features.push(Feature::new(convert_shape(&shape), properties));
        }

        if !attributes.is_empty() && attributes.len() != features.len() {
            log::warn!(
                "Shapefile has {} shapes but {} attribute records",
                features.len(),
                attributes.len()
            );
        }

        Ok(Self::reprojected(features, data_crs, view_crs))
    }

    fn reprojected(mut features: Vec<Feature>, data_crs: Crs, view_crs: Crs) -> Self {
        for feature in features.iter_mut() {
            feature.reproject(data_crs, view_crs);
        }
        Self::new(features, view_crs)
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    /// CRS the feature coordinates are expressed in.
    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns every attribute name carried by at least one feature, in
    /// first-seen order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for feature in &self.features {
            for key in feature.properties.keys() {
                if !names.contains(&key.as_str()) {
                    names.push(key.as_str());
                }
            }
        }
        names
    }

    /// Returns true if any feature carries an attribute with this name.
    pub fn has_field(&self, name: &str) -> bool {
        self.features
            .iter()
            .any(|f| f.properties.contains_key(name))
    }

    /// Bounding box of all geometries, or None when there are no coordinates.
    pub fn extent(&self) -> Option<Extent> {
        let mut extent: Option<Extent> = None;
        for geometry in self.features.iter().filter_map(|f| f.geometry.as_ref()) {
            for_each_coord(geometry, &mut |c| {
                if c.x.is_finite() && c.y.is_finite() {
                    extent = Some(match extent {
                        Some(e) => e.including(c.x, c.y),
                        None => Extent::new(c.x, c.y, c.x, c.y),
                    });
                }
            });
        }
        extent
    }

    /// Writes the features as a GeoJSON FeatureCollection in the source CRS.
    pub fn to_geojson(&self) -> GeoJson {
        GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features: self.features.iter().map(Feature::to_geojson).collect(),
            foreign_members: None,
        })
    }
}

impl Serialize for VectorSource {
    /// Serializes as the viewer expects: CRS, attribution and the features as
    /// an embedded GeoJSON FeatureCollection.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("VectorSource", 4)?;
        state.serialize_field("crs", &self.crs)?;
        state.serialize_field("attribution", &self.attribution)?;
        state.serialize_field("featureCount", &self.features.len())?;
        state.serialize_field("features", &self.to_geojson())?;
        state.end()
    }
}

fn read_dbase_records(bytes: &[u8]) -> Result<Vec<JsonObject>> {
    let mut reader = shapefile::dbase::Reader::new(Cursor::new(bytes))
        .map_err(|e| LayerError::Shapefile(format!("Failed to read dbf: {}", e)))?;
    let field_names: Vec<String> = reader
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();
    let records = reader
        .read()
        .map_err(|e| LayerError::Shapefile(format!("Failed to read dbf records: {}", e)))?;

    Ok(records
        .iter()
        .map(|record| record_properties(record, &field_names))
        .collect())
}

fn record_properties(record: &Record, field_names: &[String]) -> JsonObject {
    let mut properties = JsonObject::new();
    for name in field_names {
        if let Some(value) = record.get(name) {
            properties.insert(name.clone(), field_value_to_json(value));
        }
    }
    properties
}

fn field_value_to_json(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => JsonValue::from(s.trim()),
        FieldValue::Numeric(Some(n)) => JsonValue::from(*n),
        FieldValue::Float(Some(n)) => JsonValue::from(f64::from(*n)),
        FieldValue::Double(n) | FieldValue::Currency(n) => JsonValue::from(*n),
        FieldValue::Integer(n) => JsonValue::from(*n),
        FieldValue::Logical(Some(b)) => JsonValue::from(*b),
        _ => JsonValue::Null,
    }
}

fn to_coord(p: &shapefile::Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

fn convert_shape(shape: &shapefile::Shape) -> Option<Geometry<f64>> {
    match shape {
        shapefile::Shape::Point(p) => Some(Geometry::Point(Point(to_coord(p)))),
        shapefile::Shape::Multipoint(mp) => {
            let points = mp.points().iter().map(|p| Point(to_coord(p))).collect();
            Some(Geometry::MultiPoint(MultiPoint(points)))
        }
        shapefile::Shape::Polyline(pl) => {
            let mut lines: Vec<LineString<f64>> = pl
                .parts()
                .iter()
                .map(|part| LineString(part.iter().map(to_coord).collect()))
                .collect();
            if lines.len() == 1 {
                lines.pop().map(Geometry::LineString)
            } else {
                Some(Geometry::MultiLineString(MultiLineString(lines)))
            }
        }
        shapefile::Shape::Polygon(poly) => {
            // Shapefile polygons list outer rings each followed by the holes
            // that belong to it.
            use shapefile::PolygonRing;

            let mut polygons: Vec<Polygon<f64>> = Vec::new();
            for ring in poly.rings() {
                let coords = LineString(ring.points().iter().map(to_coord).collect());
                match ring {
                    PolygonRing::Outer(_) => polygons.push(Polygon::new(coords, Vec::new())),
                    PolygonRing::Inner(_) => match polygons.last_mut() {
                        Some(polygon) => polygon.interiors_push(coords),
                        None => log::warn!("Shapefile hole without an outer ring, skipping"),
                    },
                }
            }

            match polygons.len() {
                0 => None,
                1 => polygons.pop().map(Geometry::Polygon),
                _ => Some(Geometry::MultiPolygon(MultiPolygon(polygons))),
            }
        }
        shapefile::Shape::NullShape => None,
        other => {
            log::warn!(
                "Unsupported shape type {:?}, keeping feature without geometry",
                other.shapetype()
            );
            None
        }
    }
}
