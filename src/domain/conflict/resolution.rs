use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::domain::assignment::assignment::Assignment;
use crate::domain::assignment::assignment_store::{ScheduleSnapshot, ScheduleStore};
use crate::domain::conflict::conflict_detector::{Conflict, ConflictSet, detect_conflicts};
use crate::domain::conflict::resolution_listener::ResolutionListener;
use crate::domain::conflict::suggestion::Suggestion;
use crate::domain::conflict::suggestion_generator::{SuggestionPolicy, build_suggestions};
use crate::domain::resource::resource_catalog::ResourceCatalog;
use crate::domain::time_window::TimeWindow;
use crate::domain::utils::id::{AssignmentId, SuggestionId};
use crate::error::{Error, Result};

/// How often a commit is retried when another session wins the race.
pub const MAX_COMMIT_ATTEMPTS: usize = 3;

/// Where a candidate stands in its resolution episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EpisodeState {
    Clean,
    ConflictPending,
    Applied,
    KeptFlagged,
    Dismissed,
}

impl fmt::Display for EpisodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EpisodeState::Clean => "Clean",
            EpisodeState::ConflictPending => "ConflictPending",
            EpisodeState::Applied => "Applied",
            EpisodeState::KeptFlagged => "KeptFlagged",
            EpisodeState::Dismissed => "Dismissed",
        };
        write!(f, "{}", name)
    }
}

/// A candidate waiting for the user's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEpisode {
    pub candidate: Assignment,
    pub conflicts: ConflictSet,
    pub suggestions: Vec<Suggestion>,

    /// Schedule version the conflicts and suggestions were computed against.
    pub snapshot_version: u64,
}

impl ConflictEpisode {
    pub fn state(&self) -> EpisodeState {
        EpisodeState::ConflictPending
    }

    pub fn suggestion(&self, id: &SuggestionId) -> Option<&Suggestion> {
        self.suggestions.iter().find(|s| &s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    ApplySuggestion(SuggestionId),
    KeepFlagged,
    Dismiss,
}

impl Decision {
    pub fn short_name(&self) -> &'static str {
        match self {
            Decision::ApplySuggestion(_) => "apply",
            Decision::KeepFlagged => "keep",
            Decision::Dismiss => "dismiss",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::ApplySuggestion(id) => write!(f, "suggestion {}", id),
            Decision::KeepFlagged => write!(f, "keeping the conflict"),
            Decision::Dismiss => write!(f, "dismissal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Committed(Assignment),
    Pending(ConflictEpisode),
}

impl SubmitOutcome {
    pub fn state(&self) -> EpisodeState {
        match self {
            SubmitOutcome::Committed(_) => EpisodeState::Clean,
            SubmitOutcome::Pending(episode) => episode.state(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Applied(Assignment),
    KeptFlagged(Assignment),
    Dismissed,

    /// The schedule changed under the episode; decide again on the reopened one.
    StillPending(ConflictEpisode),
}

impl ResolutionOutcome {
    pub fn state(&self) -> EpisodeState {
        match self {
            ResolutionOutcome::Applied(_) => EpisodeState::Applied,
            ResolutionOutcome::KeptFlagged(_) => EpisodeState::KeptFlagged,
            ResolutionOutcome::Dismissed => EpisodeState::Dismissed,
            ResolutionOutcome::StillPending(episode) => episode.state(),
        }
    }

    /// The committed assignment, if the decision wrote one.
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            ResolutionOutcome::Applied(assignment) | ResolutionOutcome::KeptFlagged(assignment) => Some(assignment),
            ResolutionOutcome::Dismissed | ResolutionOutcome::StillPending(_) => None,
        }
    }

    /// Conflicts still standing after the decision.
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            ResolutionOutcome::StillPending(episode) => &episode.conflicts,
            _ => &[],
        }
    }
}

/// A mutation requested by one of the UI entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateChange {
    /// A new booking from the create dialog. A placeholder id is replaced by a generated one,
    /// an id that is already taken is rejected.
    Create(Assignment),

    /// Replaces a committed booking with an edited copy carrying the same id.
    Edit(Assignment),

    /// Drag on the calendar: new start, duration kept.
    Move { id: AssignmentId, new_start: DateTime<Utc> },

    /// Resize on the calendar: new end, start kept.
    Resize { id: AssignmentId, new_end: DateTime<Utc> },
}

/// The single detect, suggest and apply pipeline shared by all entry points.
///
/// The catalog is injected and read-only. The store handle may be shared with
/// other workflows; every commit goes through its version check.
#[derive(Debug)]
pub struct ResolutionWorkflow {
    catalog: Arc<ResourceCatalog>,
    store: ScheduleStore,
    policy: SuggestionPolicy,
    listeners: Vec<Box<dyn ResolutionListener>>,
}

impl ResolutionWorkflow {
    pub fn new(catalog: Arc<ResourceCatalog>, store: ScheduleStore, policy: SuggestionPolicy) -> Self {
        ResolutionWorkflow { catalog, store, policy, listeners: Vec::new() }
    }

    pub fn with_listener(mut self, listener: Box<dyn ResolutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn ResolutionListener>) {
        self.listeners.push(listener);
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    /// Checks a candidate against the current schedule.
    ///
    /// A conflict-free candidate is committed right away. Otherwise the candidate
    /// opens an episode carrying the conflicts and the suggestions.
    pub fn submit(&self, candidate: Assignment) -> Result<SubmitOutcome> {
        self.catalog.validate_candidate(&candidate)?;

        let mut candidate = candidate;
        candidate.flagged = false;

        let mut attempt = 1;
        loop {
            let snapshot = self.store.snapshot();
            let conflicts = detect_conflicts(&candidate, &snapshot.assignments);
            if !conflicts.is_empty() {
                return Ok(SubmitOutcome::Pending(self.open_episode(candidate, conflicts, &snapshot)));
            }

            match self.store.commit(candidate.clone(), snapshot.version) {
                Ok(version) => {
                    log::debug!("Candidate {} committed at schedule version {}.", candidate.id, version);
                    for listener in &self.listeners {
                        listener.on_committed(&candidate);
                    }
                    return Ok(SubmitOutcome::Committed(candidate));
                }
                Err(e @ (Error::StaleCommit { .. } | Error::ConflictingCommit { .. })) if attempt < MAX_COMMIT_ATTEMPTS => {
                    log::debug!("Commit of {} lost a race ({}), re-checking (attempt {}).", candidate.id, e, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Turns a UI action into a candidate and submits it.
    pub fn propose(&self, change: CandidateChange) -> Result<SubmitOutcome> {
        let candidate = match change {
            CandidateChange::Create(mut assignment) => {
                if assignment.id.is_placeholder() {
                    assignment.id = AssignmentId::generate();
                } else if self.store.get(&assignment.id).is_some() {
                    return Err(Error::DuplicateAssignment(assignment.id.to_string()));
                }
                assignment
            }
            CandidateChange::Edit(assignment) => {
                self.committed(&assignment.id)?;
                assignment
            }
            CandidateChange::Move { id, new_start } => {
                let mut assignment = self.committed(&id)?;
                assignment.window = assignment.window.shifted_to(new_start)?;
                assignment
            }
            CandidateChange::Resize { id, new_end } => {
                let mut assignment = self.committed(&id)?;
                assignment.window = TimeWindow::new(assignment.window.start(), new_end)?;
                assignment
            }
        };

        self.submit(candidate)
    }

    /// Carries out the user's decision on an episode.
    pub fn apply_resolution(&self, episode: &ConflictEpisode, decision: Decision) -> Result<ResolutionOutcome> {
        let outcome = match &decision {
            Decision::ApplySuggestion(id) => {
                let suggestion = episode.suggestion(id).ok_or_else(|| Error::UnknownSuggestion(id.to_string()))?;
                self.apply_suggestion(episode, suggestion)
            }
            Decision::KeepFlagged => self.keep_flagged(&episode.candidate)?,
            Decision::Dismiss => ResolutionOutcome::Dismissed,
        };

        for listener in &self.listeners {
            listener.on_resolved(&episode.candidate, &decision, &outcome);
        }
        Ok(outcome)
    }

    fn committed(&self, id: &AssignmentId) -> Result<Assignment> {
        self.store.get(id).ok_or_else(|| Error::UnknownAssignment(id.to_string()))
    }

    fn open_episode(&self, candidate: Assignment, conflicts: ConflictSet, snapshot: &ScheduleSnapshot) -> ConflictEpisode {
        let suggestions = build_suggestions(&candidate, &conflicts, &snapshot.assignments, &self.catalog, &self.policy);
        let episode = ConflictEpisode { candidate, conflicts, suggestions, snapshot_version: snapshot.version };

        for listener in &self.listeners {
            listener.on_conflict_detected(&episode);
        }
        episode
    }

    /// Recomputes the episode for `candidate` from the current schedule.
    fn reopen(&self, candidate: &Assignment) -> ResolutionOutcome {
        let snapshot = self.store.snapshot();
        let conflicts = detect_conflicts(candidate, &snapshot.assignments);
        ResolutionOutcome::StillPending(self.open_episode(candidate.clone(), conflicts, &snapshot))
    }

    fn apply_suggestion(&self, episode: &ConflictEpisode, suggestion: &Suggestion) -> ResolutionOutcome {
        let applied = suggestion.apply_to(&episode.candidate);

        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let snapshot = self.store.snapshot();
            if snapshot.version != episode.snapshot_version {
                log::debug!("Schedule moved from version {} to {} since {} was suggested.", episode.snapshot_version, snapshot.version, suggestion.id);
            }

            let conflicts = detect_conflicts(&applied, &snapshot.assignments);
            if !conflicts.is_empty() {
                log::warn!("Suggestion {} no longer fits, {} new conflict(s). Reopening the episode.", suggestion.id, conflicts.len());
                return self.reopen(&episode.candidate);
            }

            match self.store.commit(applied.clone(), snapshot.version) {
                Ok(_) => return ResolutionOutcome::Applied(applied),
                Err(Error::StaleCommit { expected, actual }) => {
                    log::debug!("Commit of {} went stale ({} -> {}), attempt {}.", applied.id, expected, actual, attempt);
                }
                Err(e) => {
                    log::warn!("Commit of {} rejected: {}. Reopening the episode.", applied.id, e);
                    return self.reopen(&episode.candidate);
                }
            }
        }

        log::warn!("Could not commit {} after {} attempts. Reopening the episode.", applied.id, MAX_COMMIT_ATTEMPTS);
        self.reopen(&episode.candidate)
    }

    /// Commits the candidate flagged. If its conflicts are gone by now it is
    /// committed unflagged and reported as `Applied`.
    fn keep_flagged(&self, candidate: &Assignment) -> Result<ResolutionOutcome> {
        let mut attempt = 1;
        loop {
            let snapshot = self.store.snapshot();
            let mut kept = candidate.clone();
            kept.flagged = !detect_conflicts(candidate, &snapshot.assignments).is_empty();
            if !kept.flagged {
                log::info!("Assignment {} no longer conflicts, committing it unflagged.", kept.id);
            }

            match self.store.commit(kept.clone(), snapshot.version) {
                Ok(_) if kept.flagged => return Ok(ResolutionOutcome::KeptFlagged(kept)),
                Ok(_) => return Ok(ResolutionOutcome::Applied(kept)),
                Err(e @ (Error::StaleCommit { .. } | Error::ConflictingCommit { .. })) if attempt < MAX_COMMIT_ATTEMPTS => {
                    log::debug!("Commit of {} lost a race ({}), re-checking (attempt {}).", kept.id, e, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
