use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
    sync::mpsc::Receiver,
};

use log::error;

use crate::{PacerError, live::TrackerSnapshot};

/// Writes every received snapshot as one JSON line until the sender hangs up.
pub fn write_snapshots(
    file: &PathBuf,
    snapshot_receiver: Receiver<TrackerSnapshot>,
) -> Result<usize, PacerError> {
    let snapshot_file = File::create(file).map_err(|e| PacerError::WriterError { source: e })?;
    let mut snapshot_file_writer = BufWriter::new(snapshot_file);
    let mut written = 0;
    for snapshot in &snapshot_receiver {
        let line = serde_json::to_string(&snapshot)
            .map_err(|e| PacerError::SnapshotSerializeError { source: e })?;
        match writeln!(snapshot_file_writer, "{}", line) {
            Ok(()) => written += 1,
            Err(e) => error!("Error while writing snapshot to output file: {}", e),
        }
    }
    snapshot_file_writer
        .flush()
        .map_err(|e| PacerError::WriterError { source: e })?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveState;
    use chrono::{TimeZone, Utc};
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[test]
    fn test_writes_one_line_per_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("snapshots.jsonl");
        let state = LiveState::default();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let (tx, rx) = mpsc::channel();
        tx.send(state.snapshot(now)).unwrap();
        tx.send(state.snapshot(now)).unwrap();
        drop(tx);

        assert_eq!(write_snapshots(&path, rx).unwrap(), 2);

        let written: Vec<TrackerSnapshot> = serde_jsonlines::json_lines(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0], state.snapshot(now));
    }
}
