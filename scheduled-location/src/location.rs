use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

/// A "part" of a location
pub type LocationComponent = f64;

/// Mean radius of the earth in meters
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Some location in the world as gotten from a location service
pub struct Location {
    /// Latitude
    pub lat: LocationComponent,
    /// Longitude
    pub long: LocationComponent,
    /// Radius of uncertainty around the fix, in meters
    pub horizontal_accuracy: f64,
    /// Direction of travel in degrees, optional as GPS can't always determine
    pub heading: Option<LocationComponent>,
    /// When the service took this fix
    pub timestamp: UtcDT,
}

impl Location {
    pub fn new(lat: LocationComponent, long: LocationComponent, horizontal_accuracy: f64) -> Self {
        Self {
            lat,
            long,
            horizontal_accuracy,
            heading: None,
            timestamp: Utc::now(),
        }
    }

    /// Great-circle distance to `other` in meters (haversine, spherical earth)
    pub fn distance_to(&self, other: &Location) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = phi2 - phi1;
        let d_lambda = (other.long - self.long).to_radians();

        let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

/// A failure reported by a [LocationService], forwarded to the delegate as-is
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationError {
    /// The service could not get a fix right now but will keep trying
    #[error("Location is currently unknown")]
    LocationUnknown,
    /// Access to location has been denied
    #[error("Access to location services was denied")]
    Denied,
    /// Network related failure in the service
    #[error("Network error while determining location")]
    Network,
    /// Anything else the service reports
    #[error("Location service error: {0}")]
    Other(String),
}

pub trait LocationService: Send + Sync {
    /// Ask the service for the device's current position. A successful request may yield
    /// several fixes, ordered oldest to newest.
    fn request_location(
        &self,
    ) -> impl Future<Output = Result<Vec<Location>, LocationError>> + Send;
}
