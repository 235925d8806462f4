//! Geographic to scene coordinate mapping for a terrain area.

use glam::DVec2;

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// A WGS84 position in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoCoord {
    pub lat: f64,
    pub lng: f64,
}

impl GeoCoord {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Geographic bounding box in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    pub fn contains(&self, coord: GeoCoord) -> bool {
        (self.south..=self.north).contains(&coord.lat)
            && (self.west..=self.east).contains(&coord.lng)
    }
}

/// Maps coordinates inside a request area onto the scene's XY plane.
///
/// The area is a square of `2 * radius_km` centered on `origin`, scaled so
/// its side spans `units_side` scene units. X points east, Y north, and the
/// origin lands at `(0, 0)`. Uses a local equirectangular approximation,
/// which is accurate for the few-kilometer areas terrain requests cover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainProjection {
    pub origin: GeoCoord,
    pub units_per_meter: f64,
    pub bbox: GeoBounds,
}

impl TerrainProjection {
    pub fn centered(origin: GeoCoord, radius_km: f64, units_side: f32) -> Self {
        let radius_m = radius_km * 1000.0;
        let units_per_meter = f64::from(units_side) / (2.0 * radius_m);

        let dlat = radius_m / METERS_PER_DEGREE;
        let dlng = radius_m / (METERS_PER_DEGREE * origin.lat.to_radians().cos());
        let bbox = GeoBounds {
            west: origin.lng - dlng,
            south: origin.lat - dlat,
            east: origin.lng + dlng,
            north: origin.lat + dlat,
        };

        Self {
            origin,
            units_per_meter,
            bbox,
        }
    }

    /// Geographic position to scene units.
    pub fn project(&self, coord: GeoCoord) -> DVec2 {
        let meters = DVec2::new(
            (coord.lng - self.origin.lng) * self.meters_per_degree_lng(),
            (coord.lat - self.origin.lat) * METERS_PER_DEGREE,
        );
        meters * self.units_per_meter
    }

    /// Scene units back to a geographic position.
    pub fn unproject(&self, point: DVec2) -> GeoCoord {
        let meters = point / self.units_per_meter;
        GeoCoord {
            lat: self.origin.lat + meters.y / METERS_PER_DEGREE,
            lng: self.origin.lng + meters.x / self.meters_per_degree_lng(),
        }
    }

    fn meters_per_degree_lng(&self) -> f64 {
        METERS_PER_DEGREE * self.origin.lat.to_radians().cos()
    }
}
