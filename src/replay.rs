use std::{path::PathBuf, sync::mpsc::Sender};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    PacerError,
    live::{LiveState, TrackerConfig, TrackerInput, TrackerSnapshot},
};

/// One recorded input and the time it reached the tracker.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReplayEntry {
    pub at: DateTime<Utc>,
    pub input: TrackerInput,
}

impl ReplayEntry {
    pub fn new(at: DateTime<Utc>, input: TrackerInput) -> Self {
        Self { at, input }
    }
}

pub fn load_replay_jsonl(source_file: &PathBuf) -> Result<Vec<ReplayEntry>, PacerError> {
    if !source_file.exists() {
        return Err(PacerError::InvalidReplayFile {
            path: format!("{:?}", source_file),
        });
    }

    serde_jsonlines::json_lines(source_file)
        .map_err(|e| PacerError::ReplayLoaderError { source: e })?
        .collect::<Result<Vec<ReplayEntry>, std::io::Error>>()
        .map_err(|e| PacerError::ReplayLoaderError { source: e })
}

/// Runs `entries` through a fresh tracker, each at its recorded time.
///
/// Every snapshot that would have been pushed to observers is sent to
/// `snapshot_sender` when one is given.
pub fn replay(
    entries: impl IntoIterator<Item = ReplayEntry>,
    config: &TrackerConfig,
    snapshot_sender: Option<Sender<TrackerSnapshot>>,
) -> LiveState {
    let mut state = LiveState::new(config);
    let mut snapshot_sender = snapshot_sender;
    let mut last_at: Option<DateTime<Utc>> = None;
    let mut applied = 0usize;

    for entry in entries {
        if last_at.is_some_and(|last| entry.at < last) {
            warn!("Replay entry at {} is older than the previous one", entry.at);
        }
        last_at = Some(entry.at);
        applied += 1;

        if state.apply(entry.input, entry.at) {
            if let Some(sender) = &snapshot_sender {
                if sender.send(state.snapshot(entry.at)).is_err() {
                    warn!("Snapshot receiver hung up, continuing without it");
                    snapshot_sender = None;
                }
            }
        }
    }

    info!(
        "Replayed {} input(s), {} workout(s) in history",
        applied,
        state.tracker().history().len()
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{live::TrackerCommand, sensors::SensorEvent};
    use chrono::TimeZone;
    use std::{io::Write, sync::mpsc};
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_replay_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"at":"2024-10-16T08:00:00Z","input":{{"Command":"StartSession"}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"at":"2024-10-16T08:00:01Z","input":{{"Sensor":{{"Steps":12}}}}}}"#
        )
        .unwrap();
        writeln!(file, r#"{{"at":"2024-10-16T08:00:02Z","input":"Tick"}}"#).unwrap();
        file.flush().unwrap();

        let entries = load_replay_jsonl(&file.path().to_path_buf()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0].input,
            TrackerInput::Command(TrackerCommand::StartSession)
        );
        assert_eq!(entries[1].input, TrackerInput::Sensor(SensorEvent::Steps(12)));
        assert_eq!(entries[2].input, TrackerInput::Tick);
        assert_eq!(entries[2].at, Utc.with_ymd_and_hms(2024, 10, 16, 8, 0, 2).unwrap());
    }

    #[test]
    fn test_missing_file() {
        let result = load_replay_jsonl(&PathBuf::from("does/not/exist.jsonl"));
        assert!(matches!(result, Err(PacerError::InvalidReplayFile { .. })));
    }

    #[test]
    fn test_malformed_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"at":"yesterday"}}"#).unwrap();
        file.flush().unwrap();

        let result = load_replay_jsonl(&file.path().to_path_buf());
        assert!(matches!(result, Err(PacerError::ReplayLoaderError { .. })));
    }

    #[test]
    fn test_replay_uses_recorded_times() {
        let start = Utc.with_ymd_and_hms(2024, 10, 16, 8, 0, 0).unwrap();
        let entries = vec![
            ReplayEntry::new(start, TrackerInput::Command(TrackerCommand::StartSession)),
            ReplayEntry::new(
                start + chrono::Duration::minutes(20),
                TrackerInput::Command(TrackerCommand::EndSession),
            ),
        ];
        let (tx, rx) = mpsc::channel();

        let state = replay(entries, &TrackerConfig::default(), Some(tx));

        let record = &state.tracker().history().records()[0];
        assert_eq!(record.duration_seconds, 1200.);
        assert_eq!(rx.iter().count(), 2);
    }
}
