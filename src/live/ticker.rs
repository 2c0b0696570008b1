use std::{
    sync::mpsc::Sender,
    thread::{self, JoinHandle},
    time::Duration,
};

use log::debug;

use super::{TrackerInput, TrackerMessage};

/// Sends a `Tick` every `interval` until the tracker stops listening.
pub fn spawn_ticker(interval: Duration, tracker_sender: Sender<TrackerMessage>) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            thread::sleep(interval);
            if tracker_sender.send(TrackerInput::Tick.into()).is_err() {
                debug!("Workout tracker is gone, stopping ticker");
                break;
            }
        }
    })
}
