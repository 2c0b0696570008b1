use log::debug;

/// Lifetime step counter fed by the pedometer's cumulative counts.
///
/// The pedometer is started once from the app start epoch and keeps counting
/// across workouts, so the total is never reset by session transitions.
#[derive(Debug, Default)]
pub struct StepCounter {
    total_steps: u64,
}

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Stores the latest cumulative count. Returns whether the total changed.
    pub fn on_step_count(&mut self, cumulative_steps: u64) -> bool {
        if cumulative_steps < self.total_steps {
            debug!(
                "Pedometer count went backwards from {} to {}",
                self.total_steps, cumulative_steps
            );
        }
        let changed = cumulative_steps != self.total_steps;
        self.total_steps = cumulative_steps;
        changed
    }
}
