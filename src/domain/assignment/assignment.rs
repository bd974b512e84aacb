use chrono::{DateTime, Utc};
use std::str::FromStr;

use crate::api::schedule_dto::AssignmentDto;
use crate::domain::time_window::TimeWindow;
use crate::domain::utils::id::{AssignmentId, DriverId, VehicleId};
use crate::error::{ConversionError, Error, Result};

/// Lifecycle state of a booking.
///
/// Only `Cancelled` releases the vehicle and driver; every other state holds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentStatus {
    Planned,
    PendingApproval,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn holds_resources(&self) -> bool {
        *self != AssignmentStatus::Cancelled
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Planned => "planned",
            AssignmentStatus::PendingApproval => "pendingApproval",
            AssignmentStatus::Confirmed => "confirmed",
            AssignmentStatus::InProgress => "inProgress",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for AssignmentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "planned" => Ok(AssignmentStatus::Planned),
            "pendingApproval" | "pending" => Ok(AssignmentStatus::PendingApproval),
            "confirmed" | "approved" => Ok(AssignmentStatus::Confirmed),
            "inProgress" => Ok(AssignmentStatus::InProgress),
            "completed" => Ok(AssignmentStatus::Completed),
            "cancelled" | "rejected" => Ok(AssignmentStatus::Cancelled),
            _ => Err(ConversionError::UnknownStatus(s.to_string())),
        }
    }
}

/// A time-bound booking of one vehicle and one driver.
///
/// The same type is used for candidates (not yet committed) and for committed bookings.
/// Editing a committed booking produces a candidate carrying the same `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: AssignmentId,
    pub window: TimeWindow,
    pub vehicle_id: VehicleId,
    pub driver_id: DriverId,
    pub status: AssignmentStatus,
    pub passenger_count: u32,
    pub location: String,
    pub sharing_allowed: bool,
    pub notes: Option<String>,

    /// Knowingly committed despite an unresolved conflict. Never set by default.
    pub flagged: bool,
}

impl Assignment {
    pub fn new(
        id: impl Into<String>,
        window: TimeWindow,
        vehicle_id: impl Into<String>,
        driver_id: impl Into<String>,
        status: AssignmentStatus,
    ) -> Self {
        Assignment {
            id: AssignmentId::new(id),
            window,
            vehicle_id: VehicleId::new(vehicle_id),
            driver_id: DriverId::new(driver_id),
            status,
            passenger_count: 1,
            location: String::new(),
            sharing_allowed: false,
            notes: None,
            flagged: false,
        }
    }

    pub fn with_passengers(mut self, passenger_count: u32) -> Self {
        self.passenger_count = passenger_count;
        self
    }

    pub fn holds_resources(&self) -> bool {
        self.status.holds_resources()
    }

    /// True if both assignments bind the same vehicle or the same driver.
    pub fn shares_resource_with(&self, other: &Assignment) -> bool {
        self.vehicle_id == other.vehicle_id || self.driver_id == other.driver_id
    }
}

fn parse_timestamp(field: &str, value: &str) -> std::result::Result<DateTime<Utc>, ConversionError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc)).map_err(|e| ConversionError::InvalidTimestamp {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl TryFrom<AssignmentDto> for Assignment {
    type Error = Error;

    fn try_from(dto: AssignmentDto) -> Result<Self> {
        let start = parse_timestamp("start", &dto.start)?;
        let end = parse_timestamp("end", &dto.end)?;
        let window = TimeWindow::new(start, end)?;

        let id = match dto.id {
            Some(id) if !id.trim().is_empty() => AssignmentId::new(id),
            _ => AssignmentId::generate(),
        };

        let status = match dto.status {
            Some(status) => status.parse()?,
            None => AssignmentStatus::Planned,
        };

        Ok(Assignment {
            id,
            window,
            vehicle_id: VehicleId::new(dto.vehicle_id),
            driver_id: DriverId::new(dto.driver_id),
            status,
            passenger_count: dto.passenger_count.unwrap_or(1),
            location: dto.location.unwrap_or_default(),
            sharing_allowed: dto.sharing_allowed.unwrap_or(false),
            notes: dto.notes,
            flagged: dto.flagged.unwrap_or(false),
        })
    }
}

impl From<&Assignment> for AssignmentDto {
    fn from(assignment: &Assignment) -> Self {
        AssignmentDto {
            id: Some(assignment.id.to_string()),
            start: assignment.window.start().to_rfc3339(),
            end: assignment.window.end().to_rfc3339(),
            vehicle_id: assignment.vehicle_id.to_string(),
            driver_id: assignment.driver_id.to_string(),
            status: Some(assignment.status.as_str().to_string()),
            passenger_count: Some(assignment.passenger_count),
            location: Some(assignment.location.clone()),
            sharing_allowed: Some(assignment.sharing_allowed),
            notes: assignment.notes.clone(),
            flagged: Some(assignment.flagged),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(start: &str, end: &str) -> AssignmentDto {
        AssignmentDto {
            id: Some("A1".into()),
            start: start.into(),
            end: end.into(),
            vehicle_id: "V1".into(),
            driver_id: "D1".into(),
            status: Some("confirmed".into()),
            passenger_count: Some(3),
            location: Some("HQ".into()),
            sharing_allowed: None,
            notes: None,
            flagged: None,
        }
    }

    #[test]
    fn test_only_cancelled_releases_resources() {
        assert!(AssignmentStatus::Planned.holds_resources());
        assert!(AssignmentStatus::Completed.holds_resources());
        assert!(!AssignmentStatus::Cancelled.holds_resources());
        assert!(AssignmentStatus::Completed.is_terminal());
        assert!(!AssignmentStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_from_dto() {
        let assignment = Assignment::try_from(dto("2026-03-02T08:00:00Z", "2026-03-02T12:00:00+00:00")).unwrap();

        assert_eq!(assignment.id.as_str(), "A1");
        assert_eq!(assignment.status, AssignmentStatus::Confirmed);
        assert_eq!(assignment.passenger_count, 3);
        assert_eq!(assignment.window.duration(), chrono::Duration::hours(4));
        assert!(!assignment.flagged);
    }

    #[test]
    fn test_from_dto_rejects_inverted_window() {
        let result = Assignment::try_from(dto("2026-03-02T12:00:00Z", "2026-03-02T08:00:00Z"));
        assert!(matches!(result, Err(Error::InvalidTimeWindow { .. })));
    }

    #[test]
    fn test_from_dto_rejects_garbage_timestamp() {
        let result = Assignment::try_from(dto("tomorrow", "2026-03-02T08:00:00Z"));
        assert!(matches!(result, Err(Error::ConversionError(ConversionError::InvalidTimestamp { .. }))));
    }

    #[test]
    fn test_missing_id_is_generated() {
        let mut without_id = dto("2026-03-02T08:00:00Z", "2026-03-02T09:00:00Z");
        without_id.id = None;

        let assignment = Assignment::try_from(without_id).unwrap();
        assert!(!assignment.id.is_placeholder());
    }

    #[test]
    fn test_dto_round_trip_keeps_flag() {
        let mut assignment = Assignment::try_from(dto("2026-03-02T08:00:00Z", "2026-03-02T09:00:00Z")).unwrap();
        assignment.flagged = true;

        let back = Assignment::try_from(AssignmentDto::from(&assignment)).unwrap();
        assert_eq!(back, assignment);
    }
}
