use log::{debug, info};
use uom::si::{f64::Length, length::meter};

use super::{AuthorizationStatus, Position};

pub const METERS_TO_MILES: f64 = 0.000621371;
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance travelled between the previous fix and `position`.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceDelta {
    pub miles: f64,
    pub position: Position,
}

/// Haversine distance between two fixes.
pub fn great_circle_distance(from: &Position, to: &Position) -> Length {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    // rounding can push antipodal points slightly past 1
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    Length::new::<meter>(EARTH_RADIUS_M * c)
}

/// Keeps the most recent fix and turns consecutive fixes into distance deltas.
///
/// The adapter is session agnostic: it tracks the last known position and emits
/// deltas whether or not a workout is running. Deciding what to do with a delta
/// is up to the caller.
#[derive(Debug, Default)]
pub struct LocationIngestAdapter {
    last_position: Option<Position>,
    authorization: AuthorizationStatus,
}

impl LocationIngestAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    pub fn authorization(&self) -> AuthorizationStatus {
        self.authorization
    }

    /// Takes the newest fix of `positions` as the current position.
    ///
    /// Returns a delta only when a previous fix was known. An empty batch is
    /// ignored and leaves the adapter untouched.
    pub fn on_position_update(&mut self, positions: &[Position]) -> Option<DistanceDelta> {
        let Some(newest) = positions.last() else {
            debug!("Ignoring empty position update");
            return None;
        };

        let previous = self.last_position.replace(newest.clone());
        previous.map(|previous| DistanceDelta {
            miles: great_circle_distance(&previous, newest).get::<meter>() * METERS_TO_MILES,
            position: newest.clone(),
        })
    }

    /// Records the new authorization status and returns whether it differs
    /// from the previous one.
    pub fn on_authorization_changed(&mut self, status: AuthorizationStatus) -> bool {
        if status == self.authorization {
            return false;
        }
        info!(
            "Location authorization changed from {:?} to {:?}",
            self.authorization, status
        );
        self.authorization = status;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn fix(latitude: f64, longitude: f64, second: i64) -> Position {
        Position::new(
            latitude,
            longitude,
            Utc.timestamp_opt(1_700_000_000 + second, 0).unwrap(),
        )
    }

    #[test]
    fn test_great_circle_distance_one_degree_of_longitude_at_equator() {
        let dist = great_circle_distance(&fix(0.0, 0.0, 0), &fix(0.0, 1.0, 1));
        assert!((dist.get::<meter>() - 111_195.0).abs() < 200.0);
    }

    #[test]
    fn test_first_fix_emits_no_delta() {
        let mut adapter = LocationIngestAdapter::new();
        assert!(adapter.on_position_update(&[fix(51.5, -0.12, 0)]).is_none());
        assert_eq!(adapter.last_position(), Some(&fix(51.5, -0.12, 0)));
    }

    #[test]
    fn test_empty_update_is_ignored() {
        let mut adapter = LocationIngestAdapter::new();
        adapter.on_position_update(&[fix(51.5, -0.12, 0)]);

        assert!(adapter.on_position_update(&[]).is_none());
        assert_eq!(adapter.last_position(), Some(&fix(51.5, -0.12, 0)));
    }

    #[test]
    fn test_only_newest_fix_of_batch_is_used() {
        let mut adapter = LocationIngestAdapter::new();
        adapter.on_position_update(&[fix(0.0, 0.0, 0)]);

        // the intermediate fix far away must not contribute any distance
        let delta = adapter
            .on_position_update(&[fix(10.0, 10.0, 1), fix(0.0, 1.0, 2)])
            .unwrap();

        let expected_miles = 111_195.0 * METERS_TO_MILES;
        assert!((delta.miles - expected_miles).abs() < 0.2);
        assert_eq!(delta.position, fix(0.0, 1.0, 2));
        assert_eq!(adapter.last_position(), Some(&fix(0.0, 1.0, 2)));
    }

    #[test]
    fn test_repeated_fix_yields_zero_delta() {
        let mut adapter = LocationIngestAdapter::new();
        adapter.on_position_update(&[fix(40.0, -74.0, 0)]);
        let delta = adapter.on_position_update(&[fix(40.0, -74.0, 5)]).unwrap();
        assert_eq!(delta.miles, 0.0);
    }

    #[test]
    fn test_authorization_changes() {
        let mut adapter = LocationIngestAdapter::new();
        assert_eq!(adapter.authorization(), AuthorizationStatus::NotDetermined);

        assert!(adapter.on_authorization_changed(AuthorizationStatus::Denied));
        assert_eq!(adapter.authorization(), AuthorizationStatus::Denied);
        assert!(!adapter.on_authorization_changed(AuthorizationStatus::Denied));

        assert!(adapter.on_authorization_changed(AuthorizationStatus::Authorized));
        assert_eq!(adapter.authorization(), AuthorizationStatus::Authorized);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_deltas_are_finite_and_non_negative(
            fixes in prop::collection::vec((-89.0f64..89.0, -179.0f64..179.0), 2..50),
        ) {
            let mut adapter = LocationIngestAdapter::new();
            for (i, (lat, lon)) in fixes.iter().enumerate() {
                if let Some(delta) = adapter.on_position_update(&[fix(*lat, *lon, i as i64)]) {
                    prop_assert!(delta.miles.is_finite());
                    prop_assert!(delta.miles >= 0.0);
                    // never more than half of the Earth's circumference
                    prop_assert!(delta.miles < 12_500.0);
                }
            }
        }
    }
}
