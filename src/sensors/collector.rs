use std::sync::mpsc::Sender;

use log::{debug, info};

use crate::{
    PacerError,
    live::{TrackerInput, TrackerMessage},
};

use super::{SensorEvent, producer::SensorProducer};

/// Pumps events from `producer` into the tracker until the producer is
/// exhausted or the tracker goes away.
///
/// Location updates are started right away and again every time authorization
/// is granted.
pub fn collect_sensors(
    mut producer: impl SensorProducer,
    tracker_sender: Sender<TrackerMessage>,
) -> Result<(), PacerError> {
    producer.start()?;
    producer.start_location_updates()?;

    while let Some(event) = producer.next_event()? {
        if let SensorEvent::AuthorizationChanged(status) = &event {
            if status.allows_updates() {
                debug!("Authorization granted, restarting location updates");
                producer.start_location_updates()?;
            }
        }

        tracker_sender
            .send(TrackerInput::Sensor(event).into())
            .map_err(|e| {
                info!("Workout tracker is gone, stopping sensor collection");
                PacerError::from(e)
            })?;
    }

    info!("Sensor producer exhausted");
    Ok(())
}
