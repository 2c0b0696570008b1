use std::{path::PathBuf, thread, time::Duration};

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{
    PacerError,
    live::TrackerInput,
    replay::load_replay_jsonl,
};

use super::{AuthorizationStatus, SensorEvent};

/// Slowest accepted replay rate, a hundred times slower than real time.
pub const MIN_SPEEDUP: f64 = 0.01;

/// A source of platform sensor events.
///
/// Implementations wrap the device location provider and pedometer, or replay
/// recorded data for testing and offline runs.
///
/// # Lifecycle
///
/// 1. Call `start()` to request location authorization and start the pedometer
/// 2. Call `start_location_updates()` once authorization has been granted
/// 3. Call `next_event()` repeatedly until it returns `None`
pub trait SensorProducer {
    /// Request location authorization and start the pedometer from the app start
    /// epoch.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensors cannot be reached at all.
    fn start(&mut self) -> Result<(), PacerError>;

    /// Subscribe to position fixes. Called again whenever authorization is
    /// granted, since the platform drops the subscription on permission changes.
    fn start_location_updates(&mut self) -> Result<(), PacerError>;

    /// Blocks until the next sensor event is available.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    fn next_event(&mut self) -> Result<Option<SensorEvent>, PacerError>;
}

/// A sensor producer that replays pre-recorded or programmatically generated
/// events.
///
/// Position fixes are only delivered while the last authorization event it
/// yielded grants access and `start_location_updates()` was called since. A
/// revoked authorization also cancels the location subscription.
pub struct MockSensorProducer {
    cur_tick: usize,
    events: Vec<(DateTime<Utc>, SensorEvent)>,
    speedup: Option<f64>,
    started: bool,
    authorization: AuthorizationStatus,
    location_updates: bool,
    location_subscriptions: usize,
}

impl MockSensorProducer {
    /// Create a producer from events without timing information. Events are
    /// delivered back to back.
    pub fn from_events(events: Vec<SensorEvent>) -> Self {
        let now = Utc::now();
        Self::from_timed_events(events.into_iter().map(|event| (now, event)).collect())
    }

    pub fn from_timed_events(events: Vec<(DateTime<Utc>, SensorEvent)>) -> Self {
        Self {
            cur_tick: 0,
            events,
            speedup: None,
            started: false,
            authorization: AuthorizationStatus::default(),
            location_updates: false,
            location_subscriptions: 0,
        }
    }

    /// Load the sensor events of a replay file. Commands and ticks recorded in
    /// the file are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn from_file(file: &PathBuf) -> Result<Self, PacerError> {
        let events: Vec<_> = load_replay_jsonl(file)?
            .into_iter()
            .filter_map(|entry| match entry.input {
                TrackerInput::Sensor(event) => Some((entry.at, event)),
                _ => None,
            })
            .collect();
        info!("Loaded {} sensor events from {:?}", events.len(), file);
        Ok(Self::from_timed_events(events))
    }

    /// Sleep between events following the recorded timestamps, `speedup` times
    /// faster than real time.
    ///
    /// # Errors
    ///
    /// Returns an error if `speedup` is not finite or below [`MIN_SPEEDUP`].
    pub fn with_pacing(mut self, speedup: f64) -> Result<Self, PacerError> {
        if !speedup.is_finite() || speedup < MIN_SPEEDUP {
            return Err(PacerError::InvalidUserInput {
                field: "speedup".to_string(),
                reason: format!("must be a finite number of at least {}", MIN_SPEEDUP),
            });
        }
        self.speedup = Some(speedup);
        Ok(self)
    }

    /// How many times location updates were requested.
    pub fn location_subscriptions(&self) -> usize {
        self.location_subscriptions
    }

    fn pace(&self) {
        let Some(speedup) = self.speedup.filter(|s| *s > 0.) else {
            return;
        };
        if self.cur_tick == 0 {
            return;
        }
        let gap = self.events[self.cur_tick].0 - self.events[self.cur_tick - 1].0;
        let Ok(gap) = gap.to_std() else {
            return;
        };
        match Duration::try_from_secs_f64(gap.as_secs_f64() / speedup) {
            Ok(pause) => thread::sleep(pause),
            Err(e) => debug!("Not pacing event {}: {}", self.cur_tick, e),
        }
    }
}

impl SensorProducer for MockSensorProducer {
    fn start(&mut self) -> Result<(), PacerError> {
        self.started = true;
        Ok(())
    }

    fn start_location_updates(&mut self) -> Result<(), PacerError> {
        if !self.started {
            return Err(PacerError::SensorProducerError {
                description: "The sensors are not initialized, call start() first.".to_string(),
            });
        }
        self.location_updates = true;
        self.location_subscriptions += 1;
        Ok(())
    }

    fn next_event(&mut self) -> Result<Option<SensorEvent>, PacerError> {
        if !self.started {
            return Err(PacerError::SensorProducerError {
                description: "The sensors are not initialized, call start() first.".to_string(),
            });
        }

        while self.cur_tick < self.events.len() {
            self.pace();
            let event = self.events[self.cur_tick].1.clone();
            self.cur_tick += 1;

            match &event {
                SensorEvent::AuthorizationChanged(status) => {
                    self.authorization = *status;
                    if !status.allows_updates() {
                        self.location_updates = false;
                    }
                }
                SensorEvent::Positions(_)
                    if !self.authorization.allows_updates() || !self.location_updates =>
                {
                    debug!(
                        "Dropping position fix, authorization {:?}, updates started: {}",
                        self.authorization, self.location_updates
                    );
                    continue;
                }
                _ => {}
            }
            return Ok(Some(event));
        }
        Ok(None)
    }
}
