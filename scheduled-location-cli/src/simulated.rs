use std::sync::Mutex;

use chrono::Utc;
use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use scheduled_location::{Location, LocationError, LocationService};

/// Roughly 55m in degrees latitude
const MAX_STEP_DEGREES: f64 = 0.0005;

struct WalkState {
    rng: ChaCha20Rng,
    position: (f64, f64),
    requests: u64,
}

/// A location service that takes a seeded random walk around a starting point
pub struct SimulatedLocation {
    state: Mutex<WalkState>,
    fail_every: Option<u32>,
}

impl SimulatedLocation {
    pub fn new(seed: u64, start: (f64, f64), fail_every: Option<u32>) -> Self {
        Self {
            state: Mutex::new(WalkState {
                rng: ChaCha20Rng::seed_from_u64(seed),
                position: start,
                requests: 0,
            }),
            fail_every: fail_every.filter(|n| *n > 0),
        }
    }

    fn step(&self) -> Result<Vec<Location>, LocationError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LocationError::Other("Simulator state poisoned".to_string()))?;

        state.requests = state.requests.wrapping_add(1);

        if self
            .fail_every
            .is_some_and(|n| state.requests % u64::from(n) == 0)
        {
            return Err(LocationError::LocationUnknown);
        }

        let d_lat = state.rng.random_range(-MAX_STEP_DEGREES..MAX_STEP_DEGREES);
        let d_long = state.rng.random_range(-MAX_STEP_DEGREES..MAX_STEP_DEGREES);
        let accuracy = state.rng.random_range(3.0..150.0);
        let heading = state.rng.random_range(0.0..360.0);

        state.position.0 = (state.position.0 + d_lat).clamp(-90.0, 90.0);
        state.position.1 = (state.position.1 + d_long + 180.0).rem_euclid(360.0) - 180.0;

        let (lat, long) = state.position;
        trace!("Simulated fix {lat},{long} +/-{accuracy:.0}m");

        Ok(vec![Location {
            lat,
            long,
            horizontal_accuracy: accuracy,
            heading: Some(heading),
            timestamp: Utc::now(),
        }])
    }
}

impl LocationService for SimulatedLocation {
    async fn request_location(&self) -> Result<Vec<Location>, LocationError> {
        self.step()
    }
}
