use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::sensors::DistanceDelta;

use super::{
    RestartPolicy, SessionState, WorkoutHistory, WorkoutRecord, WorkoutSession,
};

/// Result of a `start_session` call.
#[derive(Clone, Debug, PartialEq)]
pub enum StartOutcome {
    Started,
    /// A workout was running and the restart policy left it alone.
    AlreadyActive,
    /// A workout was running and was reset without being archived.
    Rearmed,
    /// A workout was running, was archived, and a new one was started.
    Restarted(WorkoutRecord),
}

/// Owns the workout lifecycle: the running session, the live average speed and
/// the history of finished workouts.
///
/// All operations take the current time explicitly so the caller decides which
/// clock drives the tracker.
#[derive(Debug)]
pub struct WorkoutSessionTracker {
    session: Option<WorkoutSession>,
    current_average_speed_mph: f64,
    history: WorkoutHistory,
    restart_policy: RestartPolicy,
    trail_capacity: Option<usize>,
}

impl Default for WorkoutSessionTracker {
    fn default() -> Self {
        Self::new(RestartPolicy::default(), WorkoutHistory::new(), None)
    }
}

impl WorkoutSessionTracker {
    pub fn new(
        restart_policy: RestartPolicy,
        history: WorkoutHistory,
        trail_capacity: Option<usize>,
    ) -> Self {
        Self {
            session: None,
            current_average_speed_mph: 0.,
            history,
            restart_policy,
            trail_capacity,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.session {
            Some(_) => SessionState::Active,
            None => SessionState::Idle,
        }
    }

    pub fn session(&self) -> Option<&WorkoutSession> {
        self.session.as_ref()
    }

    pub fn current_average_speed_mph(&self) -> f64 {
        self.current_average_speed_mph
    }

    pub fn history(&self) -> &WorkoutHistory {
        &self.history
    }

    pub fn start_session(&mut self, now: DateTime<Utc>) -> StartOutcome {
        let outcome = if self.session.is_none() {
            StartOutcome::Started
        } else {
            match self.restart_policy {
                RestartPolicy::Ignore => {
                    debug!("Workout already active, ignoring start");
                    return StartOutcome::AlreadyActive;
                }
                RestartPolicy::ResetInPlace => {
                    warn!("Workout already active, discarding it and starting over");
                    StartOutcome::Rearmed
                }
                RestartPolicy::EndThenStart => match self.end_session(now) {
                    Some(record) => StartOutcome::Restarted(record),
                    None => StartOutcome::Started,
                },
            }
        };

        info!("Workout started at {}", now);
        self.session = Some(WorkoutSession::new(now));
        self.current_average_speed_mph = 0.;
        outcome
    }

    /// Adds `delta` to the running workout. Returns false while idle.
    pub fn on_distance_delta(&mut self, delta: &DistanceDelta, now: DateTime<Utc>) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !delta.miles.is_finite() || delta.miles < 0. {
            warn!("Rejecting invalid distance delta {}", delta.miles);
            return false;
        }

        session.accumulated_distance_miles += delta.miles;
        let trail = Arc::make_mut(&mut session.tracked_positions);
        trail.push(delta.position.clone());
        if let Some(capacity) = self.trail_capacity {
            if trail.len() > capacity {
                let dropped = trail.len() - capacity;
                trail.drain(..dropped);
            }
        }

        let elapsed_seconds = session.elapsed_seconds(now);
        if elapsed_seconds > 0. {
            self.current_average_speed_mph =
                session.accumulated_distance_miles / (elapsed_seconds / 3600.);
        }
        true
    }

    /// Finishes the running workout and appends its record to the history.
    /// Returns `None` while idle.
    pub fn end_session(&mut self, now: DateTime<Utc>) -> Option<WorkoutRecord> {
        let Some(session) = self.session.take() else {
            debug!("No active workout to end");
            return None;
        };

        let record = WorkoutRecord::new(
            now,
            session.accumulated_distance_miles,
            session.elapsed_seconds(now),
            self.current_average_speed_mph,
        );
        info!(
            "Workout ended: {:.2} mi in {:.0} s, {:.2} mph",
            record.distance_miles, record.duration_seconds, record.average_speed_mph
        );
        self.history.push(record.clone());
        self.current_average_speed_mph = 0.;
        Some(record)
    }

    pub fn clear_history(&mut self) {
        info!("Clearing {} workout record(s)", self.history.len());
        self.history.clear();
    }
}
