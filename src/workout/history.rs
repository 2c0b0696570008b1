use std::sync::Arc;

use log::debug;

use super::WorkoutRecord;

/// Append-only list of finished workouts, oldest first.
///
/// The list is shared copy-on-write with the snapshots handed to observers, so
/// a snapshot never sees records appended or cleared after it was taken.
#[derive(Clone, Debug, Default)]
pub struct WorkoutHistory {
    records: Arc<Vec<WorkoutRecord>>,
    capacity: Option<usize>,
}

impl WorkoutHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` records, evicting the oldest first.
    pub fn with_capacity_bound(capacity: usize) -> Self {
        Self {
            records: Arc::new(Vec::new()),
            capacity: Some(capacity),
        }
    }

    pub fn push(&mut self, record: WorkoutRecord) {
        let records = Arc::make_mut(&mut self.records);
        records.push(record);
        if let Some(capacity) = self.capacity {
            if records.len() > capacity {
                let evicted = records.len() - capacity;
                debug!("Evicting {} workout record(s) over capacity", evicted);
                records.drain(..evicted);
            }
        }
    }

    pub fn clear(&mut self) {
        self.records = Arc::new(Vec::new());
    }

    pub fn records(&self) -> &[WorkoutRecord] {
        &self.records
    }

    pub fn shared(&self) -> Arc<Vec<WorkoutRecord>> {
        Arc::clone(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
