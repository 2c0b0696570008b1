pub(crate) mod history;
pub(crate) mod tracker;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uom::si::length::meter;
use uuid::Uuid;

use crate::sensors::{METERS_TO_MILES, Position, great_circle_distance};

pub use history::WorkoutHistory;
pub use tracker::{StartOutcome, WorkoutSessionTracker};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Active,
}

/// What `start_session` does when a workout is already running.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
pub enum RestartPolicy {
    /// Keep the running workout untouched.
    #[default]
    Ignore,
    /// Restart the clock and drop the accrued distance without archiving it.
    ResetInPlace,
    /// Archive the running workout, then start a new one.
    EndThenStart,
}

/// The workout currently in progress.
#[derive(Clone, Debug)]
pub struct WorkoutSession {
    pub start_time: DateTime<Utc>,
    pub accumulated_distance_miles: f64,
    pub tracked_positions: Arc<Vec<Position>>,
}

impl WorkoutSession {
    pub(crate) fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            accumulated_distance_miles: 0.,
            tracked_positions: Arc::new(Vec::new()),
        }
    }

    /// Seconds since the session started, never negative.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        ((now - self.start_time).num_milliseconds() as f64 / 1000.).max(0.)
    }

    /// Length of the recorded trail. Differs from the accumulated distance when
    /// the first fix arrived before the session started or the trail was capped.
    pub fn trail_distance_miles(&self) -> f64 {
        self.tracked_positions
            .iter()
            .tuple_windows()
            .map(|(a, b)| great_circle_distance(a, b).get::<meter>() * METERS_TO_MILES)
            .sum()
    }
}

/// A finished workout. Records are never modified once created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutRecord {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub distance_miles: f64,
    pub duration_seconds: f64,
    pub average_speed_mph: f64,
}

impl WorkoutRecord {
    pub fn new(
        date: DateTime<Utc>,
        distance_miles: f64,
        duration_seconds: f64,
        average_speed_mph: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            distance_miles,
            duration_seconds,
            average_speed_mph,
        }
    }

    /// Minutes per mile, `None` when the workout covered no distance.
    pub fn pace_minutes_per_mile(&self) -> Option<f64> {
        (self.average_speed_mph > 0.).then(|| 60. / self.average_speed_mph)
    }
}

/// Continuously updated state read by the presentation layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LiveMetrics {
    pub total_steps: u64,
    /// Lifetime distance, independent of workouts
    pub total_distance_miles: f64,
    pub current_average_speed_mph: f64,
    pub last_position: Option<Position>,
}
