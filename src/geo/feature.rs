//! Geographic features and their GeoJSON geometry conversion.

use geo_types::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use geojson::{feature::Id, JsonObject, Value};
use serde_json::Value as JsonValue;

use super::Crs;

/// One geometry plus its named attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature identifier, when the data carries one
    pub id: Option<Id>,
    /// Geometry (None for features without a location)
    pub geometry: Option<Geometry<f64>>,
    /// Attribute values keyed by field name, in source order
    pub properties: JsonObject,
}

impl Feature {
    pub fn new(geometry: Option<Geometry<f64>>, properties: JsonObject) -> Self {
        Self {
            id: None,
            geometry,
            properties,
        }
    }

    /// Returns the value of an attribute.
    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name)
    }

    /// Converts a parsed GeoJSON feature, keeping features without geometry.
    pub fn from_geojson(feature: geojson::Feature) -> Self {
        Self {
            id: feature.id,
            geometry: feature.geometry.map(|g| convert_geometry(&g.value)),
            properties: feature.properties.unwrap_or_default(),
        }
    }

    /// Converts back to a GeoJSON feature.
    pub fn to_geojson(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: self
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geometry_to_value(g))),
            id: self.id.clone(),
            properties: Some(self.properties.clone()),
            foreign_members: None,
        }
    }

    /// Reprojects every coordinate of this feature in place.
    pub fn reproject(&mut self, from: Crs, to: Crs) {
        if from == to {
            return;
        }
        if let Some(geometry) = self.geometry.as_mut() {
            map_coords(geometry, &|c| from.transform(c, to));
        }
    }
}

fn position(p: &[f64]) -> Coord<f64> {
    Coord {
        x: p.first().copied().unwrap_or(f64::NAN),
        y: p.get(1).copied().unwrap_or(f64::NAN),
    }
}

fn line(positions: &[Vec<f64>]) -> LineString<f64> {
    LineString(positions.iter().map(|p| position(p)).collect())
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Polygon<f64> {
    let mut rings = rings.iter().map(|ring| line(ring));
    let exterior = rings.next().unwrap_or_else(|| LineString(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

/// Converts a GeoJSON geometry value, keeping every part.
pub fn convert_geometry(value: &Value) -> Geometry<f64> {
    match value {
        Value::Point(p) => Geometry::Point(Point(position(p))),
        Value::MultiPoint(points) => {
            Geometry::MultiPoint(points.iter().map(|p| Point(position(p))).collect())
        }
        Value::LineString(coords) => Geometry::LineString(line(coords)),
        Value::MultiLineString(lines) => {
            Geometry::MultiLineString(MultiLineString(lines.iter().map(|l| line(l)).collect()))
        }
        Value::Polygon(rings) => Geometry::Polygon(polygon(rings)),
        Value::MultiPolygon(polygons) => {
            Geometry::MultiPolygon(MultiPolygon(polygons.iter().map(|p| polygon(p)).collect()))
        }
        Value::GeometryCollection(geometries) => {
            let parts = geometries.iter().map(|g| convert_geometry(&g.value));
            Geometry::GeometryCollection(parts.collect())
        }
    }
}

fn coord_position(c: &Coord<f64>) -> Vec<f64> {
    vec![c.x, c.y]
}

fn line_positions(l: &LineString<f64>) -> Vec<Vec<f64>> {
    l.0.iter().map(coord_position).collect()
}

fn polygon_rings(p: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(line_positions)
        .collect()
}

/// Converts a geometry to a GeoJSON value.
///
/// `Line`, `Rect` and `Triangle` have no GeoJSON counterpart and are written
/// as their equivalent line string or polygon.
pub fn geometry_to_value(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(p) => Value::Point(coord_position(&p.0)),
        Geometry::MultiPoint(mp) => {
            Value::MultiPoint(mp.iter().map(|p| coord_position(&p.0)).collect())
        }
        Geometry::Line(l) => {
            Value::LineString(vec![coord_position(&l.start), coord_position(&l.end)])
        }
        Geometry::LineString(l) => Value::LineString(line_positions(l)),
        Geometry::MultiLineString(ml) => {
            Value::MultiLineString(ml.iter().map(line_positions).collect())
        }
        Geometry::Polygon(p) => Value::Polygon(polygon_rings(p)),
        Geometry::MultiPolygon(mp) => Value::MultiPolygon(mp.iter().map(polygon_rings).collect()),
        Geometry::GeometryCollection(gc) => Value::GeometryCollection(
            gc.iter()
                .map(|g| geojson::Geometry::new(geometry_to_value(g)))
                .collect(),
        ),
        Geometry::Rect(r) => Value::Polygon(polygon_rings(&r.to_polygon())),
        Geometry::Triangle(t) => Value::Polygon(polygon_rings(&t.to_polygon())),
    }
}

/// Applies `f` to every coordinate of a geometry.
pub fn map_coords<F>(geometry: &mut Geometry<f64>, f: &F)
where
    F: Fn(Coord<f64>) -> Coord<f64>,
{
    fn map_line<F: Fn(Coord<f64>) -> Coord<f64>>(l: &mut LineString<f64>, f: &F) {
        for c in l.0.iter_mut() {
            *c = f(*c);
        }
    }

    fn map_polygon<F: Fn(Coord<f64>) -> Coord<f64>>(p: &mut Polygon<f64>, f: &F) {
        p.exterior_mut(|ring| map_line(ring, f));
        p.interiors_mut(|rings| {
            for ring in rings {
                map_line(ring, f);
            }
        });
    }

    match geometry {
        Geometry::Point(p) => p.0 = f(p.0),
        Geometry::MultiPoint(mp) => {
            for p in mp.0.iter_mut() {
                p.0 = f(p.0);
            }
        }
        Geometry::Line(l) => {
            l.start = f(l.start);
            l.end = f(l.end);
        }
        Geometry::LineString(l) => map_line(l, f),
        Geometry::MultiLineString(ml) => {
            for l in ml.0.iter_mut() {
                map_line(l, f);
            }
        }
        Geometry::Polygon(p) => map_polygon(p, f),
        Geometry::MultiPolygon(mp) => {
            for p in mp.0.iter_mut() {
                map_polygon(p, f);
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in gc.0.iter_mut() {
                map_coords(g, f);
            }
        }
        Geometry::Rect(r) => {
            // Rect is axis-aligned, so project its corners and rebuild.
            *r = geo_types::Rect::new(f(r.min()), f(r.max()));
        }
        Geometry::Triangle(t) => {
            *t = geo_types::Triangle::new(f(t.v1()), f(t.v2()), f(t.v3()));
        }
    }
}

/// Calls `f` for every coordinate of a geometry.
pub fn for_each_coord<F>(geometry: &Geometry<f64>, f: &mut F)
where
    F: FnMut(Coord<f64>),
{
    fn visit_line<F: FnMut(Coord<f64>)>(l: &LineString<f64>, f: &mut F) {
        for c in &l.0 {
            f(*c);
        }
    }

    match geometry {
        Geometry::Point(p) => f(p.0),
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| f(p.0)),
        Geometry::Line(l) => {
            f(l.start);
            f(l.end);
        }
        Geometry::LineString(l) => visit_line(l, f),
        Geometry::MultiLineString(ml) => {
            for l in &ml.0 {
                visit_line(l, f);
            }
        }
        Geometry::Polygon(p) => {
            visit_line(p.exterior(), f);
            for ring in p.interiors() {
                visit_line(ring, f);
            }
        }
        Geometry::MultiPolygon(mp) => {
            for p in &mp.0 {
                visit_line(p.exterior(), f);
                for ring in p.interiors() {
                    visit_line(ring, f);
                }
            }
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                for_each_coord(g, f);
            }
        }
        Geometry::Rect(r) => {
            f(r.min());
            f(r.max());
        }
        Geometry::Triangle(t) => {
            f(t.v1());
            f(t.v2());
            f(t.v3());
        }
    }
}
