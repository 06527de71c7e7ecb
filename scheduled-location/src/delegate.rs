use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::location::{Location, LocationError};

/// Receiver of a [ScheduledLocationManager](crate::ScheduledLocationManager)'s callbacks.
///
/// The manager only holds a weak reference to its delegate, whoever registers the delegate
/// is responsible for keeping it alive.
pub trait ScheduledLocationDelegate: Send + Sync {
    /// The location service reported a failure
    fn did_fail_with_error(&self, error: &LocationError);
    /// The location service produced new fixes, ordered oldest to newest
    fn did_update_locations(&self, locations: &[Location]);
}

/// A single delegate callback as a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationEvent {
    Update(Vec<Location>),
    Failure(LocationError),
}

/// Delegate that turns callbacks into [LocationEvent]s on a channel
pub struct ChannelDelegate(mpsc::Sender<LocationEvent>);

impl ChannelDelegate {
    pub fn new(tx: mpsc::Sender<LocationEvent>) -> Self {
        Self(tx)
    }

    fn push(&self, event: LocationEvent) {
        if let Err(why) = self.0.try_send(event) {
            warn!("Dropping location event: {why}");
        }
    }
}

impl ScheduledLocationDelegate for ChannelDelegate {
    fn did_fail_with_error(&self, error: &LocationError) {
        self.push(LocationEvent::Failure(error.clone()));
    }

    fn did_update_locations(&self, locations: &[Location]) {
        self.push(LocationEvent::Update(locations.to_vec()));
    }
}
