//! Coordinate reference systems and coordinate transformation.
//!
//! Handles converting coordinates between the reference systems used by the
//! exported map: geographic WGS84 (the GeoJSON data projection), spherical
//! Web Mercator (the view projection) and Lambert-93 (the French national
//! grid the commune shapefile is delivered in).

use crate::error::LayerError;
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use std::str::FromStr;

/// Earth radius used by spherical Web Mercator, in meters.
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Web Mercator valid latitude range
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

// GRS80 ellipsoid
const GRS80_A: f64 = 6_378_137.0;
const GRS80_INV_F: f64 = 298.257_222_101;

// Lambert-93 projection parameters
const L93_LAT_1: f64 = 49.0;
const L93_LAT_2: f64 = 44.0;
const L93_LAT_0: f64 = 46.5;
const L93_LON_0: f64 = 3.0;
const L93_FALSE_EASTING: f64 = 700_000.0;
const L93_FALSE_NORTHING: f64 = 6_600_000.0;

/// A coordinate reference system supported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// EPSG:4326, longitude/latitude in degrees
    Wgs84,
    /// EPSG:3857, spherical Web Mercator in meters
    WebMercator,
    /// EPSG:2154, RGF93 / Lambert-93 in meters
    Lambert93,
}

impl Crs {
    /// Returns the EPSG code number.
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
            Crs::Lambert93 => 2154,
        }
    }

    /// Returns true if coordinates are angular (degrees) rather than meters.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    /// Transforms a coordinate from this CRS into `to`.
    ///
    /// Conversions go through geographic WGS84 degrees. RGF93 is treated as
    /// identical to WGS84, which holds to well under a meter.
    pub fn transform(&self, coord: Coord<f64>, to: Crs) -> Coord<f64> {
        if *self == to {
            return coord;
        }
        let geographic = match self {
            Crs::Wgs84 => coord,
            Crs::WebMercator => mercator_to_geographic(coord),
            Crs::Lambert93 => LAMBERT_93.inverse(coord),
        };
        match to {
            Crs::Wgs84 => geographic,
            Crs::WebMercator => geographic_to_mercator(geographic),
            Crs::Lambert93 => LAMBERT_93.forward(geographic),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = LayerError;

    /// Parses `EPSG:<code>` (prefix case-insensitive) or a bare code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("EPSG") => code,
            Some(_) => return Err(LayerError::UnsupportedCrs(s.to_string())),
            None => trimmed,
        };
        match code.trim().parse::<u32>() {
            Ok(4326) => Ok(Crs::Wgs84),
            Ok(3857) | Ok(900913) => Ok(Crs::WebMercator),
            Ok(2154) => Ok(Crs::Lambert93),
            _ => Err(LayerError::UnsupportedCrs(s.to_string())),
        }
    }
}

impl TryFrom<String> for Crs {
    type Error = LayerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// Converts geographic coordinates (lon, lat) to Web Mercator meters.
///
/// Latitude is clamped to the Web Mercator range so the poles stay finite.
pub fn geographic_to_mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    Coord {
        x: WEB_MERCATOR_RADIUS * coord.x.to_radians(),
        y: WEB_MERCATOR_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
    }
}

/// Converts Web Mercator meters to geographic coordinates (lon, lat).
pub fn mercator_to_geographic(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / WEB_MERCATOR_RADIUS).to_degrees(),
        y: (2.0 * (coord.y / WEB_MERCATOR_RADIUS).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

/// Lambert Conformal Conic with two standard parallels on an ellipsoid.
struct LambertConformal {
    a: f64,
    inv_f: f64,
    lat_1: f64,
    lat_2: f64,
    lat_0: f64,
    lon_0: f64,
    false_easting: f64,
    false_northing: f64,
}

/// Derived constants of a [`LambertConformal`] projection.
struct ConeConstants {
    e: f64,
    n: f64,
    scaled_f: f64,
    rho_0: f64,
}

const LAMBERT_93: LambertConformal = LambertConformal {
    a: GRS80_A,
    inv_f: GRS80_INV_F,
    lat_1: L93_LAT_1,
    lat_2: L93_LAT_2,
    lat_0: L93_LAT_0,
    lon_0: L93_LON_0,
    false_easting: L93_FALSE_EASTING,
    false_northing: L93_FALSE_NORTHING,
};

impl LambertConformal {
    fn eccentricity(&self) -> f64 {
        let f = 1.0 / self.inv_f;
        (2.0 * f - f * f).sqrt()
    }

    fn m(e: f64, phi: f64) -> f64 {
        phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
    }

    fn t(e: f64, phi: f64) -> f64 {
        let es = e * phi.sin();
        (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
    }

    fn constants(&self) -> ConeConstants {
        let e = self.eccentricity();
        let phi_1 = self.lat_1.to_radians();
        let phi_2 = self.lat_2.to_radians();
        let (m1, m2) = (Self::m(e, phi_1), Self::m(e, phi_2));
        let (t1, t2) = (Self::t(e, phi_1), Self::t(e, phi_2));
        let t0 = Self::t(e, self.lat_0.to_radians());

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let scaled_f = self.a * m1 / (n * t1.powf(n));
        ConeConstants {
            e,
            n,
            scaled_f,
            rho_0: scaled_f * t0.powf(n),
        }
    }

    /// Projects geographic degrees (lon, lat) to easting/northing.
    fn forward(&self, coord: Coord<f64>) -> Coord<f64> {
        let c = self.constants();
        let phi = coord.y.to_radians();
        let rho = c.scaled_f * Self::t(c.e, phi).powf(c.n);
        let theta = c.n * (coord.x - self.lon_0).to_radians();
        Coord {
            x: self.false_easting + rho * theta.sin(),
            y: self.false_northing + c.rho_0 - rho * theta.cos(),
        }
    }

    /// Inverts easting/northing back to geographic degrees (lon, lat).
    fn inverse(&self, coord: Coord<f64>) -> Coord<f64> {
        let c = self.constants();
        let dx = coord.x - self.false_easting;
        let dy = c.rho_0 - (coord.y - self.false_northing);
        let rho = c.n.signum() * (dx * dx + dy * dy).sqrt();
        let t = (rho / c.scaled_f).powf(1.0 / c.n);
        let theta = if c.n > 0.0 {
            dx.atan2(dy)
        } else {
            (-dx).atan2(-dy)
        };

        // Latitude has no closed form; iterate until it settles.
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..15 {
            let es = c.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(c.e / 2.0)).atan();
            let done = (next - phi).abs() < 1e-12;
            phi = next;
            if done {
                break;
            }
        }

        Coord {
            x: (theta / c.n).to_degrees() + self.lon_0,
            y: phi.to_degrees(),
        }
    }
}
