use std::fmt;

use crate::domain::assignment::assignment::Assignment;
use crate::domain::resource::resource_trait::ResourceKind;
use crate::domain::time_window::overlaps;

/// Which shared resource(s) make an existing assignment collide with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    Vehicle,
    Driver,
    VehicleAndDriver,
}

impl ConflictKind {
    pub fn involves(&self, kind: ResourceKind) -> bool {
        match (self, kind) {
            (ConflictKind::VehicleAndDriver, _) => true,
            (ConflictKind::Vehicle, ResourceKind::Vehicle) => true,
            (ConflictKind::Driver, ResourceKind::Driver) => true,
            _ => false,
        }
    }
}

/// An existing assignment colliding with a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub existing: Assignment,
    pub kind: ConflictKind,
}

impl Conflict {
    pub fn shares_vehicle(&self) -> bool {
        self.kind.involves(ResourceKind::Vehicle)
    }

    pub fn shares_driver(&self) -> bool {
        self.kind.involves(ResourceKind::Driver)
    }

    /// Human readable explanation naming the colliding booking.
    pub fn describe(&self) -> String {
        let what = match self.kind {
            ConflictKind::Vehicle => format!("vehicle {}", self.existing.vehicle_id),
            ConflictKind::Driver => format!("driver {}", self.existing.driver_id),
            ConflictKind::VehicleAndDriver => {
                format!("vehicle {} and driver {}", self.existing.vehicle_id, self.existing.driver_id)
            }
        };
        let flagged = if self.existing.flagged { " (flagged)" } else { "" };
        format!("{} is already booked by {}{} during {}", what, self.existing.id, flagged, self.existing.window)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Existing assignments colliding with a candidate, in schedule order.
pub type ConflictSet = Vec<Conflict>;

fn classify(candidate: &Assignment, existing: &Assignment) -> Option<ConflictKind> {
    let same_vehicle = existing.vehicle_id == candidate.vehicle_id;
    let same_driver = existing.driver_id == candidate.driver_id;

    match (same_vehicle, same_driver) {
        (true, true) => Some(ConflictKind::VehicleAndDriver),
        (true, false) => Some(ConflictKind::Vehicle),
        (false, true) => Some(ConflictKind::Driver),
        (false, false) => None,
    }
}

/// Returns the assignments in `schedule` that collide with `candidate`.
///
/// A prior version of the candidate (same id) and cancelled assignments are skipped.
/// Flagged assignments still hold their resources and are reported.
/// Both resource ids of the candidate must have been validated beforehand.
pub fn detect_conflicts(candidate: &Assignment, schedule: &[Assignment]) -> ConflictSet {
    schedule
        .iter()
        .filter(|existing| existing.id != candidate.id)
        .filter(|existing| existing.holds_resources())
        .filter_map(|existing| {
            let kind = classify(candidate, existing)?;
            overlaps(&existing.window, &candidate.window).then(|| Conflict { existing: existing.clone(), kind })
        })
        .collect()
}

/// Every pair of assignments in `schedule` that double-books a resource.
///
/// With `include_flagged == false` this is exactly the set of violations of the
/// no-overlap invariant: flagged assignments are exempt from it.
pub fn conflicting_pairs(schedule: &[Assignment], include_flagged: bool) -> Vec<(&Assignment, &Assignment)> {
    let relevant: Vec<&Assignment> = schedule.iter().filter(|a| a.holds_resources()).filter(|a| include_flagged || !a.flagged).collect();

    let mut pairs = Vec::new();
    for (i, a) in relevant.iter().enumerate() {
        for b in relevant.iter().skip(i + 1) {
            if a.id != b.id && a.shares_resource_with(b) && overlaps(&a.window, &b.window) {
                pairs.push((*a, *b));
            }
        }
    }
    pairs
}
