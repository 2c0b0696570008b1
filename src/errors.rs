// Error types for pacer

use crate::live::TrackerMessage;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum PacerError {
    // Errors while reading sensor data
    #[snafu(display("Sensor producer error: {description}"))]
    SensorProducerError { description: String },

    // Errors for the tracker actor
    #[snafu(display("Error sending input to the workout tracker"))]
    TrackerChannelClosed {
        source: Box<SendError<TrackerMessage>>,
    },
    #[snafu(display("The workout tracker stopped before replying"))]
    TrackerUnavailable,
    #[snafu(display("The workout tracker thread panicked"))]
    TrackerThreadPanicked,

    // Errors for the snapshot writer
    #[snafu(display("Error writing snapshot file"))]
    WriterError { source: io::Error },
    #[snafu(display("Error serializing snapshot"))]
    SnapshotSerializeError { source: serde_json::Error },

    // Replay errors
    #[snafu(display("Invalid replay file: {path}"))]
    InvalidReplayFile { path: String },
    #[snafu(display("Error loading replay file"))]
    ReplayLoaderError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error accessing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Error parsing config file"))]
    ConfigParseError { source: serde_json::Error },

    // CLI errors
    #[snafu(display("Error reading command from stdin"))]
    CommandInputError { source: io::Error },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },
}

impl From<SendError<TrackerMessage>> for PacerError {
    fn from(value: SendError<TrackerMessage>) -> Self {
        PacerError::TrackerChannelClosed {
            source: Box::new(value),
        }
    }
}
