use serde::{Deserialize, Serialize};

/// A WGS-ish point. Value equality only, no identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A predicted accident location. Only points where the prediction
/// actually fired participate in proximity checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccidentPoint {
    pub point: GeoPoint,
    pub is_accident: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
    NauticalMiles,
}

/// Great-circle distance via the spherical law of cosines.
///
/// The base result is in statute miles (1 degree of arc = 60 nautical
/// miles = 69.09 statute miles, hence the 60 * 1.1515 factor), converted
/// per `unit`. Non-finite coordinates propagate as NaN; callers validate.
pub fn great_circle_distance(a: GeoPoint, b: GeoPoint, unit: DistanceUnit) -> f64 {
    // acos is undefined outside [-1, 1]; coincident points can land
    // just outside it after rounding, so handle equality up front.
    if a == b {
        return 0.0;
    }

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lng = (a.lng - b.lng).to_radians();

    let cos_sum = (lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * d_lng.cos())
        .clamp(-1.0, 1.0);

    let miles = cos_sum.acos().to_degrees() * 60.0 * 1.1515;

    match unit {
        DistanceUnit::Miles => miles,
        DistanceUnit::Kilometers => miles * 1.609344,
        DistanceUnit::NauticalMiles => miles * 0.8684,
    }
}

/// True when `position` lies within `threshold_miles` (inclusive) of any
/// point whose prediction fired. First match wins; O(n) over the list.
///
/// Pure: no I/O, deterministic for given inputs.
pub fn is_near(position: GeoPoint, accident_points: &[AccidentPoint], threshold_miles: f64) -> bool {
    accident_points
        .iter()
        .filter(|candidate| candidate.is_accident)
        .any(|candidate| {
            great_circle_distance(position, candidate.point, DistanceUnit::Miles)
                <= threshold_miles
        })
}
