use std::sync::Arc;

use crate::domain::assignment::assignment::Assignment;
use crate::domain::conflict::resolution::{ConflictEpisode, Decision, ResolutionOutcome};
use crate::domain::utils::statistics::{StatParameter, StatisticEvent, StatsCollector};

/// Hooks fired by the resolution workflow on state transitions.
///
/// Used by the UI layer and by notification delivery. All methods default to no-ops.
pub trait ResolutionListener: std::fmt::Debug + Send + Sync {
    /// A candidate entered `ConflictPending` (initially or after a failed re-check).
    fn on_conflict_detected(&self, _episode: &ConflictEpisode) {}

    /// A candidate passed detection and was committed without an episode.
    fn on_committed(&self, _assignment: &Assignment) {}

    /// A decision on an episode was carried out.
    ///
    /// A `StillPending` outcome has already announced the reopened episode through
    /// `on_conflict_detected`.
    fn on_resolved(&self, _candidate: &Assignment, _decision: &Decision, _outcome: &ResolutionOutcome) {}
}

/// Writes every transition to the `log` facade.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl ResolutionListener for LoggingListener {
    fn on_conflict_detected(&self, episode: &ConflictEpisode) {
        log::warn!(
            "Assignment {} conflicts with {} booking(s), {} suggestion(s) offered.",
            episode.candidate.id,
            episode.conflicts.len(),
            episode.suggestions.len()
        );
        for conflict in &episode.conflicts {
            log::info!("  {}", conflict.describe());
        }
        for suggestion in &episode.suggestions {
            log::info!("  [{}] {}", suggestion.id, suggestion);
        }
    }

    fn on_committed(&self, assignment: &Assignment) {
        log::info!("Assignment {} committed without conflicts ({} / {}).", assignment.id, assignment.vehicle_id, assignment.driver_id);
    }

    fn on_resolved(&self, candidate: &Assignment, decision: &Decision, outcome: &ResolutionOutcome) {
        match outcome {
            ResolutionOutcome::Applied(assignment) => {
                log::info!("Assignment {} resolved by {}, committed for {}.", candidate.id, decision, assignment.window);
            }
            ResolutionOutcome::KeptFlagged(assignment) => {
                log::warn!("Assignment {} kept despite conflicts and flagged for reconciliation.", assignment.id);
            }
            ResolutionOutcome::Dismissed => {
                log::info!("Assignment {} dismissed, schedule unchanged.", candidate.id);
            }
            ResolutionOutcome::StillPending(episode) => {
                log::warn!("Assignment {} is still conflicting ({} booking(s)).", candidate.id, episode.conflicts.len());
            }
        }
    }
}

/// Records one CSV row per transition in a statistics collector.
#[derive(Debug)]
pub struct StatisticsListener {
    collector: Arc<StatsCollector>,
}

impl StatisticsListener {
    pub fn new(collector: Arc<StatsCollector>) -> Self {
        Self { collector }
    }

    fn candidate_event(description: &str, candidate: &Assignment) -> StatisticEvent {
        let mut event = StatisticEvent::new();
        event
            .set(StatParameter::LogDescription, description)
            .set(StatParameter::AssignmentId, candidate.id.to_string())
            .set(StatParameter::VehicleId, candidate.vehicle_id.to_string())
            .set(StatParameter::DriverId, candidate.driver_id.to_string())
            .set(StatParameter::WindowStart, candidate.window.start().to_rfc3339())
            .set(StatParameter::WindowEnd, candidate.window.end().to_rfc3339())
            .set(StatParameter::Flagged, candidate.flagged);
        event
    }
}

impl ResolutionListener for StatisticsListener {
    fn on_conflict_detected(&self, episode: &ConflictEpisode) {
        let mut event = Self::candidate_event("conflict detected", &episode.candidate);
        event
            .set(StatParameter::ConflictCount, episode.conflicts.len())
            .set(StatParameter::SuggestionCount, episode.suggestions.len())
            .set(StatParameter::EpisodeState, episode.state().to_string());
        self.collector.add_event(event);
    }

    fn on_committed(&self, assignment: &Assignment) {
        let mut event = Self::candidate_event("committed", assignment);
        event.set(StatParameter::ConflictCount, 0usize).set(StatParameter::EpisodeState, "Clean");
        self.collector.add_event(event);
    }

    fn on_resolved(&self, candidate: &Assignment, decision: &Decision, outcome: &ResolutionOutcome) {
        let subject = outcome.assignment().unwrap_or(candidate);
        let mut event = Self::candidate_event("resolved", subject);
        event
            .set(StatParameter::Decision, decision.short_name())
            .set(StatParameter::ConflictCount, outcome.conflicts().len())
            .set(StatParameter::EpisodeState, outcome.state().to_string());
        self.collector.add_event(event);
        self.collector.flush();
    }
}
