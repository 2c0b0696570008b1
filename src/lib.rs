// Library interface for pacer
// This allows integration tests and embedding apps to access internal modules

pub mod errors;
pub mod live;
pub mod replay;
pub mod sensors;
pub mod workout;
pub mod writer;

// Re-export commonly used types
pub use errors::PacerError;
pub use live::{
    LiveState, TrackerCommand, TrackerConfig, TrackerHandle, TrackerInput, TrackerSnapshot,
    spawn_tracker,
};
pub use sensors::{AuthorizationStatus, Position, SensorEvent};
pub use workout::{LiveMetrics, RestartPolicy, SessionState, WorkoutRecord};
