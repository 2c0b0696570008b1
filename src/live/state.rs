use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    sensors::{AuthorizationStatus, LocationIngestAdapter, Position, SensorEvent, StepCounter},
    workout::{
        LiveMetrics, SessionState, StartOutcome, WorkoutHistory, WorkoutRecord,
        WorkoutSessionTracker,
    },
};

use super::{TrackerCommand, TrackerInput, config::TrackerConfig};

/// Progress of the running workout as seen by observers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionProgress {
    pub start_time: DateTime<Utc>,
    pub distance_miles: f64,
    pub elapsed_seconds: f64,
    /// Length of the path drawn by `trail`
    pub trail_distance_miles: f64,
    pub trail: Arc<Vec<Position>>,
}

/// Immutable copy of everything the presentation layer renders.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackerSnapshot {
    pub taken_at: DateTime<Utc>,
    pub state: SessionState,
    pub authorization: AuthorizationStatus,
    pub metrics: LiveMetrics,
    pub session: Option<SessionProgress>,
    pub history: Arc<Vec<WorkoutRecord>>,
}

/// Single owner of all mutable tracker state.
///
/// Inputs are applied one at a time; the caller is responsible for
/// serializing them, which the tracker actor does through its channel.
#[derive(Debug)]
pub struct LiveState {
    adapter: LocationIngestAdapter,
    steps: StepCounter,
    tracker: WorkoutSessionTracker,
    total_distance_miles: f64,
}

impl Default for LiveState {
    fn default() -> Self {
        Self::new(&TrackerConfig::default())
    }
}

impl LiveState {
    pub fn new(config: &TrackerConfig) -> Self {
        let history = match config.history_capacity {
            Some(capacity) => WorkoutHistory::with_capacity_bound(capacity),
            None => WorkoutHistory::new(),
        };
        Self {
            adapter: LocationIngestAdapter::new(),
            steps: StepCounter::new(),
            tracker: WorkoutSessionTracker::new(
                config.restart_policy,
                history,
                config.trail_capacity,
            ),
            total_distance_miles: 0.,
        }
    }

    pub fn tracker(&self) -> &WorkoutSessionTracker {
        &self.tracker
    }

    pub fn adapter(&self) -> &LocationIngestAdapter {
        &self.adapter
    }

    pub fn metrics(&self) -> LiveMetrics {
        LiveMetrics {
            total_steps: self.steps.total_steps(),
            total_distance_miles: self.total_distance_miles,
            current_average_speed_mph: self.tracker.current_average_speed_mph(),
            last_position: self.adapter.last_position().cloned(),
        }
    }

    /// Applies one input. Returns whether observers need a new snapshot.
    pub fn apply(&mut self, input: TrackerInput, now: DateTime<Utc>) -> bool {
        match input {
            TrackerInput::Sensor(event) => self.on_sensor_event(event, now),
            TrackerInput::Command(command) => self.on_command(command, now),
            // only the elapsed time moved
            TrackerInput::Tick => self.tracker.state() == SessionState::Active,
        }
    }

    fn on_sensor_event(&mut self, event: SensorEvent, now: DateTime<Utc>) -> bool {
        match event {
            SensorEvent::Positions(positions) => {
                if positions.is_empty() {
                    return false;
                }
                if let Some(delta) = self.adapter.on_position_update(&positions) {
                    self.total_distance_miles += delta.miles;
                    self.tracker.on_distance_delta(&delta, now);
                }
                true
            }
            SensorEvent::Steps(cumulative_steps) => self.steps.on_step_count(cumulative_steps),
            SensorEvent::AuthorizationChanged(status) => {
                self.adapter.on_authorization_changed(status)
            }
            SensorEvent::LocationError { description } => {
                debug!("Skipping location update: {}", description);
                false
            }
            SensorEvent::PedometerError { description } => {
                debug!("Skipping pedometer update: {}", description);
                false
            }
        }
    }

    fn on_command(&mut self, command: TrackerCommand, now: DateTime<Utc>) -> bool {
        match command {
            TrackerCommand::StartSession => {
                !matches!(self.tracker.start_session(now), StartOutcome::AlreadyActive)
            }
            TrackerCommand::EndSession => self.tracker.end_session(now).is_some(),
            TrackerCommand::ClearHistory => {
                let had_records = !self.tracker.history().is_empty();
                self.tracker.clear_history();
                had_records
            }
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> TrackerSnapshot {
        let session = self.tracker.session().map(|session| SessionProgress {
            start_time: session.start_time,
            distance_miles: session.accumulated_distance_miles,
            elapsed_seconds: session.elapsed_seconds(now),
            trail_distance_miles: session.trail_distance_miles(),
            trail: Arc::clone(&session.tracked_positions),
        });
        TrackerSnapshot {
            taken_at: now,
            state: self.tracker.state(),
            authorization: self.adapter.authorization(),
            metrics: self.metrics(),
            session,
            history: self.tracker.history().shared(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::RestartPolicy;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    fn fix(longitude: f64, seconds: i64) -> TrackerInput {
        TrackerInput::Sensor(SensorEvent::Positions(vec![Position::new(
            0.,
            longitude,
            t(seconds),
        )]))
    }

    fn command(command: TrackerCommand) -> TrackerInput {
        TrackerInput::Command(command)
    }

    #[test]
    fn test_lifetime_distance_accumulates_while_idle() {
        let mut state = LiveState::default();
        assert!(state.apply(fix(0., 0), t(0)));
        assert!(state.apply(fix(0.01, 10), t(10)));

        let metrics = state.metrics();
        assert!(metrics.total_distance_miles > 0.6);
        assert_eq!(metrics.current_average_speed_mph, 0.);
        assert_eq!(metrics.last_position.unwrap().longitude, 0.01);
        assert!(state.tracker().session().is_none());
    }

    #[test]
    fn test_session_distance_only_counts_deltas_while_active() {
        let mut state = LiveState::default();
        state.apply(fix(0., 0), t(0));
        state.apply(fix(0.01, 10), t(10));
        state.apply(command(TrackerCommand::StartSession), t(20));
        state.apply(fix(0.02, 30), t(30));

        let lifetime = state.metrics().total_distance_miles;
        let session = state.tracker().session().unwrap().accumulated_distance_miles;
        assert!((lifetime - 2. * session).abs() < 1e-6);
        assert!(state.metrics().current_average_speed_mph > 0.);
    }

    #[test]
    fn test_steps_survive_session_boundaries() {
        let mut state = LiveState::default();
        for step in 1..=250 {
            state.apply(TrackerInput::Sensor(SensorEvent::Steps(step)), t(0));
        }
        state.apply(command(TrackerCommand::StartSession), t(1));
        for step in 251..=500 {
            state.apply(TrackerInput::Sensor(SensorEvent::Steps(step)), t(2));
        }
        state.apply(command(TrackerCommand::EndSession), t(3));

        assert_eq!(state.metrics().total_steps, 500);
        assert_eq!(state.tracker().history().len(), 1);
    }

    #[test]
    fn test_sensor_errors_do_not_notify() {
        let mut state = LiveState::default();
        assert!(!state.apply(
            TrackerInput::Sensor(SensorEvent::LocationError {
                description: "gps lost".to_string()
            }),
            t(0)
        ));
        assert!(!state.apply(
            TrackerInput::Sensor(SensorEvent::PedometerError {
                description: "unavailable".to_string()
            }),
            t(0)
        ));
        assert!(!state.apply(TrackerInput::Sensor(SensorEvent::Positions(vec![])), t(0)));
        assert_eq!(state.metrics(), LiveMetrics::default());
    }

    #[test]
    fn test_no_op_commands_do_not_notify() {
        let mut state = LiveState::default();
        assert!(!state.apply(command(TrackerCommand::EndSession), t(0)));
        assert!(!state.apply(command(TrackerCommand::ClearHistory), t(0)));
        assert!(!state.apply(TrackerInput::Tick, t(0)));

        assert!(state.apply(command(TrackerCommand::StartSession), t(0)));
        assert!(!state.apply(command(TrackerCommand::StartSession), t(1)));
        assert!(state.apply(TrackerInput::Tick, t(2)));
    }

    #[test]
    fn test_snapshot_reflects_session_progress() {
        let mut state = LiveState::new(&TrackerConfig {
            restart_policy: RestartPolicy::ResetInPlace,
            ..Default::default()
        });
        state.apply(fix(0., 0), t(0));
        state.apply(command(TrackerCommand::StartSession), t(0));
        state.apply(fix(0.01, 60), t(60));

        let snapshot = state.snapshot(t(90));
        assert_eq!(snapshot.state, SessionState::Active);
        let progress = snapshot.session.clone().unwrap();
        assert_eq!(progress.elapsed_seconds, 90.);
        assert_eq!(progress.trail.len(), 1);
        assert_eq!(progress.trail_distance_miles, 0.);

        state.apply(command(TrackerCommand::EndSession), t(120));
        // an earlier snapshot is never touched by later updates
        assert_eq!(snapshot.state, SessionState::Active);
        assert!(snapshot.history.is_empty());
        assert_eq!(state.snapshot(t(120)).history.len(), 1);
    }

    #[test]
    fn test_trail_distance_excludes_fix_before_start() {
        let mut state = LiveState::default();
        state.apply(fix(0., 0), t(0));
        state.apply(fix(0.01, 10), t(10));
        state.apply(command(TrackerCommand::StartSession), t(10));
        state.apply(fix(0.02, 20), t(20));
        state.apply(fix(0.03, 30), t(30));

        let progress = state.snapshot(t(30)).session.unwrap();
        let leg = progress.distance_miles / 2.;
        assert_eq!(progress.trail.len(), 2);
        assert!((progress.trail_distance_miles - leg).abs() < 1e-9);
    }

    #[test]
    fn test_authorization_change_is_published() {
        let mut state = LiveState::default();
        let granted = TrackerInput::Sensor(SensorEvent::AuthorizationChanged(
            AuthorizationStatus::Authorized,
        ));
        assert!(state.apply(granted.clone(), t(0)));
        assert!(!state.apply(granted, t(1)));
        assert_eq!(
            state.snapshot(t(1)).authorization,
            AuthorizationStatus::Authorized
        );
    }

    #[test]
    fn test_history_capacity_from_config() {
        let mut state = LiveState::new(&TrackerConfig {
            history_capacity: Some(1),
            ..Default::default()
        });
        for i in 0..3 {
            state.apply(command(TrackerCommand::StartSession), t(i * 10));
            state.apply(command(TrackerCommand::EndSession), t(i * 10 + 5));
        }
        let history = state.tracker().history().records();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date, t(25));
    }
}
