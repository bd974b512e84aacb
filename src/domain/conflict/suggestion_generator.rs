use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;

use crate::api::policy_dto::PolicyDto;
use crate::domain::assignment::assignment::Assignment;
use crate::domain::conflict::conflict_detector::{Conflict, detect_conflicts};
use crate::domain::conflict::suggestion::Suggestion;
use crate::domain::resource::resource_catalog::ResourceCatalog;
use crate::domain::resource::resource_trait::{Resource, ResourceKind};
use crate::domain::resource::vehicle::Vehicle;
use crate::domain::time_window::TimeWindow;
use crate::error::ConversionError;

pub const DEFAULT_BUFFER_MINUTES: i64 = 15;

/// One week.
pub const MAX_BUFFER_MINUTES: i64 = 7 * 24 * 60;

/// How alternate resources are picked from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlternateRanking {
    /// First free entry in catalog order.
    #[default]
    CatalogOrder,

    /// Free vehicles that seat the passengers, smallest capacity first, catalog order
    /// on ties. Drivers are always taken in catalog order.
    CapacityFit,
}

impl FromStr for AlternateRanking {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "catalogOrder" | "CatalogOrder" => Ok(AlternateRanking::CatalogOrder),
            "capacityFit" | "CapacityFit" => Ok(AlternateRanking::CapacityFit),
            _ => Err(ConversionError::UnknownRanking(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionPolicy {
    /// Gap kept after the last conflicting booking before a delayed start.
    pub buffer: Duration,

    /// Skip alternates flagged `Unavailable` (maintenance, leave).
    pub skip_unavailable_alternates: bool,

    pub alternate_ranking: AlternateRanking,
}

impl Default for SuggestionPolicy {
    fn default() -> Self {
        SuggestionPolicy {
            buffer: Duration::minutes(DEFAULT_BUFFER_MINUTES),
            skip_unavailable_alternates: false,
            alternate_ranking: AlternateRanking::CatalogOrder,
        }
    }
}

impl TryFrom<PolicyDto> for SuggestionPolicy {
    type Error = ConversionError;

    fn try_from(dto: PolicyDto) -> Result<Self, Self::Error> {
        let defaults = SuggestionPolicy::default();

        let buffer = match dto.buffer_minutes {
            Some(minutes) if !(0..=MAX_BUFFER_MINUTES).contains(&minutes) => return Err(ConversionError::InvalidBuffer(minutes)),
            Some(minutes) => Duration::try_minutes(minutes).ok_or(ConversionError::InvalidBuffer(minutes))?,
            None => defaults.buffer,
        };

        let alternate_ranking = match dto.alternate_ranking {
            Some(ranking) => ranking.parse()?,
            None => defaults.alternate_ranking,
        };

        Ok(SuggestionPolicy {
            buffer,
            skip_unavailable_alternates: dto.skip_unavailable_alternates.unwrap_or(defaults.skip_unavailable_alternates),
            alternate_ranking,
        })
    }
}

/// Proposes alternatives to a conflicting candidate.
///
/// Rules run in a fixed order and each contributes at most one suggestion:
/// 1. delay behind the vehicle's conflicting bookings,
/// 2. delay behind the driver's conflicting bookings,
/// 3. first free alternate vehicle for the same window,
/// 4. first free alternate driver for the same window.
///
/// Every suggestion is applied to the candidate and re-checked against the whole
/// schedule; anything that would still conflict is dropped. The result may be empty.
/// Never mutates anything.
pub fn build_suggestions(
    candidate: &Assignment,
    conflicts: &[Conflict],
    schedule: &[Assignment],
    catalog: &ResourceCatalog,
    policy: &SuggestionPolicy,
) -> Vec<Suggestion> {
    if conflicts.is_empty() {
        return Vec::new();
    }

    let proposals = [
        delayed_same_resource(candidate, conflicts, ResourceKind::Vehicle, policy),
        delayed_same_resource(candidate, conflicts, ResourceKind::Driver, policy),
        alternate_vehicle(candidate, conflicts, schedule, catalog, policy),
        alternate_driver(candidate, conflicts, schedule, catalog, policy),
    ];

    let mut suggestions: Vec<Suggestion> = Vec::new();
    for suggestion in proposals.into_iter().flatten() {
        let applied = suggestion.apply_to(candidate);
        let remaining = detect_conflicts(&applied, schedule);
        if !remaining.is_empty() {
            log::debug!("Dropping suggestion {}: still collides with {} assignment(s).", suggestion.id, remaining.len());
            continue;
        }

        // Vehicle and driver delays coincide when the same booking blocks both.
        if suggestions.iter().any(|s| s.apply_to(candidate) == applied) {
            log::debug!("Dropping suggestion {}: same outcome as an earlier suggestion.", suggestion.id);
            continue;
        }
        suggestions.push(suggestion);
    }

    log::debug!("{} suggestion(s) for candidate {} with {} conflict(s).", suggestions.len(), candidate.id, conflicts.len());
    suggestions
}

fn latest_end(conflicts: &[Conflict], resource: ResourceKind) -> Option<DateTime<Utc>> {
    conflicts.iter().filter(|c| c.kind.involves(resource)).map(|c| c.existing.window.end()).max()
}

fn delayed_same_resource(candidate: &Assignment, conflicts: &[Conflict], resource: ResourceKind, policy: &SuggestionPolicy) -> Option<Suggestion> {
    let busy_until = latest_end(conflicts, resource)?;
    let start = busy_until.checked_add_signed(policy.buffer)?;
    let window = TimeWindow::from_duration(start, candidate.window.duration()).ok()?;

    Some(Suggestion::delayed(candidate, resource, window, busy_until))
}

/// True if no assignment other than the candidate's prior version holds the
/// resource selected by `holds` during `window`.
fn is_free<F>(schedule: &[Assignment], candidate: &Assignment, window: &TimeWindow, holds: F) -> bool
where
    F: Fn(&Assignment) -> bool,
{
    !schedule.iter().any(|a| a.id != candidate.id && a.holds_resources() && holds(a) && a.window.overlaps(window))
}

fn eligible<R: Resource>(resource: &R, policy: &SuggestionPolicy) -> bool {
    !policy.skip_unavailable_alternates || resource.is_bookable()
}

fn vehicles_in_ranking_order<'a>(catalog: &'a ResourceCatalog, candidate: &Assignment, ranking: AlternateRanking) -> Vec<&'a Vehicle> {
    match ranking {
        AlternateRanking::CatalogOrder => catalog.vehicles().iter().collect(),
        AlternateRanking::CapacityFit => {
            let mut fitting: Vec<&Vehicle> = catalog.vehicles().iter().filter(|v| v.can_seat(candidate.passenger_count)).collect();
            // stable sort keeps catalog order among equal capacities
            fitting.sort_by_key(|v| v.capacity);
            fitting
        }
    }
}

fn alternate_vehicle(
    candidate: &Assignment,
    conflicts: &[Conflict],
    schedule: &[Assignment],
    catalog: &ResourceCatalog,
    policy: &SuggestionPolicy,
) -> Option<Suggestion> {
    if !conflicts.iter().any(Conflict::shares_vehicle) {
        return None;
    }

    vehicles_in_ranking_order(catalog, candidate, policy.alternate_ranking)
        .into_iter()
        .filter(|v| v.id != candidate.vehicle_id)
        .filter(|v| eligible(*v, policy))
        .find(|v| is_free(schedule, candidate, &candidate.window, |a| a.vehicle_id == v.id))
        .map(|v| Suggestion::alternate_vehicle(candidate, v.id.clone()))
}

fn alternate_driver(
    candidate: &Assignment,
    conflicts: &[Conflict],
    schedule: &[Assignment],
    catalog: &ResourceCatalog,
    policy: &SuggestionPolicy,
) -> Option<Suggestion> {
    if !conflicts.iter().any(Conflict::shares_driver) {
        return None;
    }

    catalog
        .drivers()
        .iter()
        .filter(|d| d.id != candidate.driver_id)
        .filter(|d| eligible(*d, policy))
        .find(|d| is_free(schedule, candidate, &candidate.window, |a| a.driver_id == d.id))
        .map(|d| Suggestion::alternate_driver(candidate, d.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assignment::assignment::AssignmentStatus;
    use crate::domain::conflict::suggestion::SuggestionKind;
    use crate::domain::resource::driver::Driver;
    use crate::domain::resource::resource_trait::Availability;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    fn window(from: (u32, u32), to: (u32, u32)) -> TimeWindow {
        TimeWindow::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
    }

    fn booking(id: &str, from: (u32, u32), to: (u32, u32), vehicle: &str, driver: &str) -> Assignment {
        Assignment::new(id, window(from, to), vehicle, driver, AssignmentStatus::Confirmed)
    }

    fn catalog() -> ResourceCatalog {
        ResourceCatalog::new(
            vec![
                Vehicle::new("V1", "van", 8, Availability::Available),
                Vehicle::new("V2", "van", 8, Availability::Available),
                Vehicle::new("V3", "sedan", 4, Availability::Available),
            ],
            vec![
                Driver::new("D1", ["van"], Availability::Available),
                Driver::new("D2", ["van"], Availability::Available),
                Driver::new("D3", ["sedan"], Availability::Available),
            ],
        )
        .unwrap()
    }

    fn suggest(candidate: &Assignment, schedule: &[Assignment], policy: &SuggestionPolicy) -> Vec<Suggestion> {
        let conflicts = detect_conflicts(candidate, schedule);
        build_suggestions(candidate, &conflicts, schedule, &catalog(), policy)
    }

    fn assert_sound(candidate: &Assignment, schedule: &[Assignment], suggestions: &[Suggestion]) {
        for suggestion in suggestions {
            let applied = suggestion.apply_to(candidate);
            assert!(detect_conflicts(&applied, schedule).is_empty(), "suggestion {} still conflicts", suggestion.id);
        }
    }

    #[test]
    fn test_no_conflicts_no_suggestions() {
        let candidate = booking("C", (9, 0), (10, 0), "V1", "D1");
        assert!(build_suggestions(&candidate, &[], &[], &catalog(), &SuggestionPolicy::default()).is_empty());
    }

    #[test]
    fn test_vehicle_delay_uses_buffer_and_keeps_duration() {
        let schedule = vec![booking("A1", (8, 0), (12, 0), "V1", "D2")];
        let candidate = booking("C", (11, 0), (13, 0), "V1", "D1");

        let suggestions = suggest(&candidate, &schedule, &SuggestionPolicy::default());

        assert_eq!(
            suggestions[0].kind,
            SuggestionKind::DelayedSameResource { resource: ResourceKind::Vehicle, window: window((12, 15), (14, 15)) }
        );
        assert_eq!(suggestions[0].window().duration(), candidate.window.duration());
        assert_sound(&candidate, &schedule, &suggestions);
    }

    #[test]
    fn test_delay_uses_latest_conflicting_end() {
        let schedule = vec![booking("A1", (8, 0), (10, 0), "V1", "D2"), booking("A2", (10, 0), (11, 30), "V1", "D3")];
        let candidate = booking("C", (9, 0), (11, 0), "V1", "D1");

        let suggestions = suggest(&candidate, &schedule, &SuggestionPolicy::default());

        assert_eq!(suggestions[0].window(), window((11, 45), (13, 45)));
        assert_sound(&candidate, &schedule, &suggestions);
    }

    #[test]
    fn test_delay_dropped_when_slot_is_taken_later() {
        // V1 busy until 10:00 (conflict) and again from 10:00 (no conflict, back-to-back)
        let schedule = vec![booking("A1", (8, 0), (10, 0), "V1", "D2"), booking("A2", (10, 0), (17, 0), "V1", "D3")];
        let candidate = booking("C", (9, 0), (10, 0), "V1", "D1");

        let suggestions = suggest(&candidate, &schedule, &SuggestionPolicy::default());

        assert!(suggestions.iter().all(|s| !matches!(s.kind, SuggestionKind::DelayedSameResource { .. })));
        assert_sound(&candidate, &schedule, &suggestions);
    }

    #[test]
    fn test_driver_delay_for_driver_only_conflict() {
        let schedule = vec![booking("A1", (9, 0), (10, 30), "V2", "D1")];
        let candidate = booking("C", (9, 0), (10, 0), "V1", "D1");

        let suggestions = suggest(&candidate, &schedule, &SuggestionPolicy::default());
        let kinds: Vec<&SuggestionKind> = suggestions.iter().map(|s| &s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                &SuggestionKind::DelayedSameResource { resource: ResourceKind::Driver, window: window((10, 45), (11, 45)) },
                &SuggestionKind::AlternateDriver { driver_id: "D2".into(), window: candidate.window },
            ]
        );
        assert_sound(&candidate, &schedule, &suggestions);
    }

    #[test]
    fn test_identical_delays_are_merged() {
        let schedule = vec![booking("A1", (8, 0), (12, 0), "V1", "D1")];
        let candidate = booking("C", (11, 0), (13, 0), "V1", "D1");

        let suggestions = suggest(&candidate, &schedule, &SuggestionPolicy::default());
        let delays = suggestions.iter().filter(|s| matches!(s.kind, SuggestionKind::DelayedSameResource { .. })).count();

        assert_eq!(delays, 1);
        assert_sound(&candidate, &schedule, &suggestions);
    }

    #[test]
    fn test_alternate_vehicle_is_first_free_in_catalog_order() {
        let schedule = vec![booking("A1", (9, 30), (9, 45), "V2", "D1"), booking("A2", (8, 0), (11, 0), "V1", "D3")];
        let candidate = booking("C", (9, 0), (10, 0), "V2", "D2");

        let suggestions = suggest(&candidate, &schedule, &SuggestionPolicy::default());
        let alternate = suggestions.iter().find(|s| matches!(s.kind, SuggestionKind::AlternateVehicle { .. })).unwrap();

        assert_eq!(alternate.kind, SuggestionKind::AlternateVehicle { vehicle_id: "V3".into(), window: candidate.window });
        assert_sound(&candidate, &schedule, &suggestions);
    }

    #[test]
    fn test_alternate_dropped_when_driver_also_conflicts() {
        let schedule = vec![booking("A1", (9, 0), (10, 0), "V1", "D1")];
        let candidate = booking("C", (9, 0), (10, 0), "V1", "D1");

        let suggestions = suggest(&candidate, &schedule, &SuggestionPolicy::default());

        assert!(suggestions.iter().all(|s| matches!(s.kind, SuggestionKind::DelayedSameResource { .. })));
        assert_sound(&candidate, &schedule, &suggestions);
    }

    #[test]
    fn test_cancelled_bookings_do_not_block_alternates() {
        let mut cancelled = booking("X", (9, 0), (10, 0), "V1", "D3");
        cancelled.status = AssignmentStatus::Cancelled;
        let schedule = vec![booking("A1", (9, 0), (10, 0), "V2", "D1"), cancelled];
        let candidate = booking("C", (9, 0), (10, 0), "V2", "D2");

        let suggestions = suggest(&candidate, &schedule, &SuggestionPolicy::default());
        let alternate = suggestions.iter().find(|s| matches!(s.kind, SuggestionKind::AlternateVehicle { .. })).unwrap();

        assert_eq!(alternate.kind, SuggestionKind::AlternateVehicle { vehicle_id: "V1".into(), window: candidate.window });
    }

    #[test]
    fn test_skip_unavailable_alternates() {
        let catalog = ResourceCatalog::new(
            vec![
                Vehicle::new("V1", "van", 8, Availability::Available),
                Vehicle::new("V2", "van", 8, Availability::Unavailable),
                Vehicle::new("V3", "van", 8, Availability::Available),
            ],
            vec![Driver::new("D1", ["van"], Availability::Available), Driver::new("D2", ["van"], Availability::Available)],
        )
        .unwrap();
        let schedule = vec![booking("A1", (9, 0), (10, 0), "V1", "D2")];
        let candidate = booking("C", (9, 0), (10, 0), "V1", "D1");
        let conflicts = detect_conflicts(&candidate, &schedule);

        let first_fit = build_suggestions(&candidate, &conflicts, &schedule, &catalog, &SuggestionPolicy::default());
        let policy = SuggestionPolicy { skip_unavailable_alternates: true, ..SuggestionPolicy::default() };
        let available_only = build_suggestions(&candidate, &conflicts, &schedule, &catalog, &policy);

        let alternate_of = |suggestions: &[Suggestion]| {
            suggestions.iter().find_map(|s| match &s.kind {
                SuggestionKind::AlternateVehicle { vehicle_id, .. } => Some(vehicle_id.to_string()),
                _ => None,
            })
        };
        assert_eq!(alternate_of(&first_fit), Some("V2".to_string()));
        assert_eq!(alternate_of(&available_only), Some("V3".to_string()));
    }

    #[test]
    fn test_capacity_fit_prefers_smallest_seating_vehicle() {
        let schedule = vec![booking("A1", (9, 0), (10, 0), "V1", "D2")];
        let candidate = booking("C", (9, 0), (10, 0), "V1", "D1").with_passengers(3);
        let conflicts = detect_conflicts(&candidate, &schedule);
        let policy = SuggestionPolicy { alternate_ranking: AlternateRanking::CapacityFit, ..SuggestionPolicy::default() };

        let suggestions = build_suggestions(&candidate, &conflicts, &schedule, &catalog(), &policy);
        let alternate = suggestions.iter().find(|s| matches!(s.kind, SuggestionKind::AlternateVehicle { .. })).unwrap();

        assert_eq!(alternate.kind, SuggestionKind::AlternateVehicle { vehicle_id: "V3".into(), window: candidate.window });
    }

    #[test]
    fn test_output_is_deterministic() {
        let schedule = vec![booking("A1", (8, 0), (12, 0), "V1", "D2"), booking("A2", (10, 0), (11, 0), "V3", "D1")];
        let candidate = booking("C", (11, 0), (13, 0), "V1", "D1");

        let first = suggest(&candidate, &schedule, &SuggestionPolicy::default());
        let second = suggest(&candidate, &schedule, &SuggestionPolicy::default());

        assert_eq!(first, second);
        assert_sound(&candidate, &schedule, &first);
    }

    #[test]
    fn test_policy_from_dto() {
        let policy = SuggestionPolicy::try_from(PolicyDto {
            buffer_minutes: Some(30),
            skip_unavailable_alternates: None,
            alternate_ranking: Some("capacityFit".into()),
        })
        .unwrap();

        assert_eq!(policy.buffer, Duration::minutes(30));
        assert!(!policy.skip_unavailable_alternates);
        assert_eq!(policy.alternate_ranking, AlternateRanking::CapacityFit);
        assert_eq!(SuggestionPolicy::try_from(PolicyDto::default()).unwrap(), SuggestionPolicy::default());
        assert!(matches!(
            SuggestionPolicy::try_from(PolicyDto { buffer_minutes: Some(-5), ..PolicyDto::default() }),
            Err(ConversionError::InvalidBuffer(-5))
        ));
    }

    #[test]
    fn test_policy_rejects_buffer_beyond_a_week() {
        for minutes in [MAX_BUFFER_MINUTES + 1, i64::MAX] {
            let result = SuggestionPolicy::try_from(PolicyDto { buffer_minutes: Some(minutes), ..PolicyDto::default() });
            assert!(matches!(result, Err(ConversionError::InvalidBuffer(m)) if m == minutes));
        }

        let week = SuggestionPolicy::try_from(PolicyDto { buffer_minutes: Some(MAX_BUFFER_MINUTES), ..PolicyDto::default() }).unwrap();
        assert_eq!(week.buffer, Duration::weeks(1));
    }

    #[test]
    fn test_delay_past_the_calendar_end_is_dropped() {
        let schedule = vec![booking("A1", (8, 0), (12, 0), "V1", "D2")];
        let candidate = booking("C", (11, 0), (13, 0), "V1", "D1");
        let policy = SuggestionPolicy { buffer: Duration::days(100_000_000), ..SuggestionPolicy::default() };

        let suggestions = suggest(&candidate, &schedule, &policy);
        let kinds: Vec<&SuggestionKind> = suggestions.iter().map(|s| &s.kind).collect();

        assert_eq!(kinds, vec![&SuggestionKind::AlternateVehicle { vehicle_id: "V2".into(), window: candidate.window }]);
    }
}
