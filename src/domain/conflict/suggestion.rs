use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::domain::assignment::assignment::Assignment;
use crate::domain::resource::resource_trait::ResourceKind;
use crate::domain::time_window::TimeWindow;
use crate::domain::utils::id::{DriverId, SuggestionId, VehicleId};

/// What a suggestion changes on the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionKind {
    /// Keep vehicle and driver, move the trip behind the conflicting bookings of `resource`.
    DelayedSameResource { resource: ResourceKind, window: TimeWindow },

    /// Keep the window, swap the vehicle.
    AlternateVehicle { vehicle_id: VehicleId, window: TimeWindow },

    /// Keep the window, swap the driver.
    AlternateDriver { driver_id: DriverId, window: TimeWindow },
}

/// A pre-verified conflict-free alternative to a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub kind: SuggestionKind,
    pub label: String,
    pub rationale: String,
}

impl Suggestion {
    pub fn delayed(candidate: &Assignment, resource: ResourceKind, window: TimeWindow, busy_until: DateTime<Utc>) -> Self {
        let delay = window.start() - candidate.window.start();
        let (tag, holder) = match resource {
            ResourceKind::Vehicle => ("delay-vehicle", candidate.vehicle_id.to_string()),
            ResourceKind::Driver => ("delay-driver", candidate.driver_id.to_string()),
        };

        Suggestion {
            id: SuggestionId::new(format!("{}/{}", candidate.id, tag)),
            label: format!("Keep {} {} and start at {}", resource, holder, window.start().format("%H:%M")),
            rationale: format!(
                "{} {} is busy until {}; the trip moves to {} ({} later, same duration).",
                resource,
                holder,
                busy_until.format("%H:%M"),
                window,
                format_delay(delay)
            ),
            kind: SuggestionKind::DelayedSameResource { resource, window },
        }
    }

    pub fn alternate_vehicle(candidate: &Assignment, vehicle_id: VehicleId) -> Self {
        Suggestion {
            id: SuggestionId::new(format!("{}/alternate-vehicle/{}", candidate.id, vehicle_id)),
            label: format!("Use vehicle {} instead of {}", vehicle_id, candidate.vehicle_id),
            rationale: format!("Vehicle {} is free during {}; the trip keeps its time.", vehicle_id, candidate.window),
            kind: SuggestionKind::AlternateVehicle { vehicle_id, window: candidate.window },
        }
    }

    pub fn alternate_driver(candidate: &Assignment, driver_id: DriverId) -> Self {
        Suggestion {
            id: SuggestionId::new(format!("{}/alternate-driver/{}", candidate.id, driver_id)),
            label: format!("Use driver {} instead of {}", driver_id, candidate.driver_id),
            rationale: format!("Driver {} is free during {}; the trip keeps its time.", driver_id, candidate.window),
            kind: SuggestionKind::AlternateDriver { driver_id, window: candidate.window },
        }
    }

    pub fn window(&self) -> TimeWindow {
        match &self.kind {
            SuggestionKind::DelayedSameResource { window, .. } => *window,
            SuggestionKind::AlternateVehicle { window, .. } => *window,
            SuggestionKind::AlternateDriver { window, .. } => *window,
        }
    }

    /// The candidate with this suggestion's replacement values.
    pub fn apply_to(&self, candidate: &Assignment) -> Assignment {
        let mut replaced = candidate.clone();
        match &self.kind {
            SuggestionKind::DelayedSameResource { window, .. } => replaced.window = *window,
            SuggestionKind::AlternateVehicle { vehicle_id, window } => {
                replaced.vehicle_id = vehicle_id.clone();
                replaced.window = *window;
            }
            SuggestionKind::AlternateDriver { driver_id, window } => {
                replaced.driver_id = driver_id.clone();
                replaced.window = *window;
            }
        }
        replaced
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.rationale)
    }
}

fn format_delay(delay: Duration) -> String {
    let hours = delay.num_hours();
    let minutes = delay.num_minutes() - hours * 60;
    match (hours, minutes) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {} min", h, m),
    }
}
