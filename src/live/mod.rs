pub(crate) mod clock;
pub(crate) mod config;
pub(crate) mod state;
pub(crate) mod ticker;

use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{PacerError, sensors::SensorEvent};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use state::{LiveState, SessionProgress, TrackerSnapshot};
pub use ticker::spawn_ticker;

pub(crate) const TICK_INTERVAL_MS: u64 = 1000;

/// User actions on the workout lifecycle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrackerCommand {
    StartSession,
    EndSession,
    ClearHistory,
}

/// Everything that can change the tracker state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum TrackerInput {
    Sensor(SensorEvent),
    Command(TrackerCommand),
    Tick,
}

/// Messages accepted by the tracker actor.
#[derive(Debug)]
pub enum TrackerMessage {
    Input(TrackerInput),
    /// Register an observer. It immediately receives the current snapshot.
    Subscribe(Sender<TrackerSnapshot>),
    /// Reply once with the current snapshot.
    Query(Sender<TrackerSnapshot>),
    Shutdown,
}

impl From<TrackerInput> for TrackerMessage {
    fn from(value: TrackerInput) -> Self {
        TrackerMessage::Input(value)
    }
}

/// Registered snapshot receivers. Observers that hung up are dropped on the
/// next notification.
#[derive(Default)]
struct Observers {
    senders: Vec<Sender<TrackerSnapshot>>,
}

impl Observers {
    fn register(&mut self, sender: Sender<TrackerSnapshot>, snapshot: TrackerSnapshot) {
        if sender.send(snapshot).is_ok() {
            self.senders.push(sender);
        }
    }

    fn notify(&mut self, snapshot: &TrackerSnapshot) {
        self.senders.retain(|sender| sender.send(snapshot.clone()).is_ok());
    }

    fn len(&self) -> usize {
        self.senders.len()
    }
}

fn run_tracker(
    mut state: LiveState,
    clock: impl Clock,
    receiver: Receiver<TrackerMessage>,
) -> LiveState {
    let mut observers = Observers::default();

    for message in receiver {
        match message {
            TrackerMessage::Input(input) => {
                let now = clock.now();
                if state.apply(input, now) {
                    observers.notify(&state.snapshot(now));
                }
            }
            TrackerMessage::Subscribe(sender) => {
                observers.register(sender, state.snapshot(clock.now()));
                debug!("{} observer(s) registered", observers.len());
            }
            TrackerMessage::Query(reply) => {
                let _ = reply.send(state.snapshot(clock.now()));
            }
            TrackerMessage::Shutdown => break,
        }
    }

    info!("Workout tracker stopped");
    state
}

/// Starts the tracker actor on its own thread.
///
/// Sensor events, commands and ticks all go through the same channel, so they
/// are applied strictly one after the other.
pub fn spawn_tracker(config: &TrackerConfig, clock: impl Clock + 'static) -> TrackerHandle {
    let (sender, receiver) = mpsc::channel();
    let state = LiveState::new(config);
    let thread = thread::spawn(move || run_tracker(state, clock, receiver));
    TrackerHandle { sender, thread }
}

/// Handle to a running tracker actor.
pub struct TrackerHandle {
    sender: Sender<TrackerMessage>,
    thread: JoinHandle<LiveState>,
}

impl TrackerHandle {
    /// A sender for sensor collectors and tickers.
    pub fn sender(&self) -> Sender<TrackerMessage> {
        self.sender.clone()
    }

    pub fn send(&self, input: TrackerInput) -> Result<(), PacerError> {
        Ok(self.sender.send(input.into())?)
    }

    pub fn start_session(&self) -> Result<(), PacerError> {
        self.send(TrackerInput::Command(TrackerCommand::StartSession))
    }

    pub fn end_session(&self) -> Result<(), PacerError> {
        self.send(TrackerInput::Command(TrackerCommand::EndSession))
    }

    pub fn clear_history(&self) -> Result<(), PacerError> {
        self.send(TrackerInput::Command(TrackerCommand::ClearHistory))
    }

    /// Returns a receiver that gets the current snapshot right away and a new
    /// one after every change.
    pub fn subscribe(&self) -> Result<Receiver<TrackerSnapshot>, PacerError> {
        let (tx, rx) = mpsc::channel();
        self.sender.send(TrackerMessage::Subscribe(tx))?;
        Ok(rx)
    }

    /// Current snapshot, after every input sent before this call was applied.
    pub fn snapshot(&self) -> Result<TrackerSnapshot, PacerError> {
        let (tx, rx) = mpsc::channel();
        self.sender.send(TrackerMessage::Query(tx))?;
        rx.recv().map_err(|_| PacerError::TrackerUnavailable)
    }

    /// Stops the actor and returns its final state.
    pub fn shutdown(self) -> Result<LiveState, PacerError> {
        // the actor may already be gone, joining tells us how it ended
        let _ = self.sender.send(TrackerMessage::Shutdown);
        self.thread
            .join()
            .map_err(|_| PacerError::TrackerThreadPanicked)
    }
}
