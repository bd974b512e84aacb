use std::fmt;
use std::str::FromStr;

use crate::error::ConversionError;

/// The two kinds of resource an assignment binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Vehicle,
    Driver,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Vehicle => write!(f, "vehicle"),
            ResourceKind::Driver => write!(f, "driver"),
        }
    }
}

/// Current availability flag as reported by the fleet administration.
///
/// `Unavailable` covers maintenance for vehicles and leave for drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Availability {
    #[default]
    Available,
    OnDuty,
    Unavailable,
}

impl FromStr for Availability {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" | "Available" => Ok(Availability::Available),
            "onDuty" | "OnDuty" | "assigned" | "Assigned" => Ok(Availability::OnDuty),
            "unavailable" | "Unavailable" | "maintenance" | "Maintenance" | "leave" | "Leave" => Ok(Availability::Unavailable),
            _ => Err(ConversionError::UnknownAvailability(s.to_string())),
        }
    }
}

pub trait Resource: std::fmt::Debug {
    fn availability(&self) -> Availability;

    /// False while in maintenance or on leave.
    fn is_bookable(&self) -> bool {
        self.availability() != Availability::Unavailable
    }
}
