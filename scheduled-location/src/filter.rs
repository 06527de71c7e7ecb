use log::trace;

use crate::{location::Location, settings::FilterSettings};

/// Drops fixes that are too inaccurate or too close to the last one reported
#[derive(Debug, Clone)]
pub struct SignificanceFilter {
    settings: FilterSettings,
    last: Option<Location>,
}

impl SignificanceFilter {
    pub fn new(settings: FilterSettings) -> Self {
        Self {
            settings,
            last: None,
        }
    }

    /// The last fix that made it through, or the baseline if nothing has yet
    pub fn last(&self) -> Option<&Location> {
        self.last.as_ref()
    }

    /// Keep the significant fixes of a batch, in order. The first accurate fix ever seen only
    /// sets the baseline and is not kept.
    pub fn apply(&mut self, locations: Vec<Location>) -> Vec<Location> {
        let mut kept = Vec::with_capacity(locations.len());

        for location in locations {
            if location.horizontal_accuracy > self.settings.max_horizontal_accuracy {
                trace!(
                    "Insignificant fix (accuracy {}m)",
                    location.horizontal_accuracy
                );
                continue;
            }

            let Some(last) = &self.last else {
                trace!("Baseline fix recorded");
                self.last = Some(location);
                continue;
            };

            let distance = last.distance_to(&location);
            if distance < self.settings.min_distance_meters {
                trace!("Insignificant fix ({distance:.1}m from last)");
                continue;
            }

            self.last = Some(location);
            kept.push(location);
        }

        kept
    }
}
