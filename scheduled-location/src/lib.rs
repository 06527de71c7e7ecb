mod delegate;
mod filter;
mod location;
mod manager;
mod settings;

pub use delegate::{ChannelDelegate, LocationEvent, ScheduledLocationDelegate};
pub use filter::SignificanceFilter;
pub use location::{Location, LocationComponent, LocationError, LocationService, UtcDT};
pub use manager::{PollStats, ScheduledLocationManager};
pub use settings::{DEFAULT_INTERVAL_SECONDS, FilterSettings, ManagerSettings};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
