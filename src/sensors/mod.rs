pub(crate) mod collector;
pub(crate) mod location;
pub(crate) mod pedometer;
pub(crate) mod producer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use collector::collect_sensors;
pub use location::{DistanceDelta, LocationIngestAdapter, METERS_TO_MILES, great_circle_distance};
pub use pedometer::StepCounter;
pub use producer::{MIN_SPEEDUP, MockSensorProducer, SensorProducer};

/// A single geographic fix reported by the location provider.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }
}

/// Location permission state as reported by the platform.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Denied,
    Restricted,
    Authorized,
}

impl AuthorizationStatus {
    /// Whether the location provider will deliver fixes in this state.
    pub fn allows_updates(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Events pushed by the platform sensor collaborators.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum SensorEvent {
    /// Non-empty in practice, oldest fix first.
    Positions(Vec<Position>),
    LocationError { description: String },
    /// Cumulative step count since the pedometer was started.
    Steps(u64),
    PedometerError { description: String },
    AuthorizationChanged(AuthorizationStatus),
}
