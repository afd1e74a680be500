//! WGS84 points and great-circle distance.

use crate::CoreError;

/// Mean Earth radius in kilometers, used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A complete WGS84 coordinate pair.
///
/// A position either exists with both coordinates or does not exist at all;
/// a partially populated point is unrepresentable by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    /// Build a point, validating coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CoordinateOutOfRange`] when the longitude is
    /// outside [-180, 180] or the latitude is outside [-90, 90].
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, CoreError> {
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::CoordinateOutOfRange {
                axis: "longitude",
                value: longitude,
            });
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::CoordinateOutOfRange {
                axis: "latitude",
                value: latitude,
            });
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Assemble an optional point from an optional coordinate pair.
    ///
    /// Both absent is a valid "no position" state, not an error. Exactly one
    /// present is a partial point and rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PartialPoint`] when only one coordinate is
    /// supplied, or [`CoreError::CoordinateOutOfRange`] when a value is
    /// outside its valid range.
    pub fn from_parts(
        longitude: Option<f64>,
        latitude: Option<f64>,
    ) -> Result<Option<Self>, CoreError> {
        match (longitude, latitude) {
            (Some(lon), Some(lat)) => Self::new(lon, lat).map(Some),
            (None, None) => Ok(None),
            _ => Err(CoreError::PartialPoint),
        }
    }
}

/// Great-circle distance between two points in kilometers.
///
/// Haversine on a spherical Earth of radius [`EARTH_RADIUS_KM`]. Accurate to
/// well under a kilometer at city scale, which is all the ranking needs.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
