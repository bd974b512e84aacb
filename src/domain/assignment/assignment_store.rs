use chrono::Duration;
use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::api::schedule_dto::{AssignmentDto, ScheduleDto};
use crate::domain::assignment::assignment::{Assignment, AssignmentStatus};
use crate::domain::conflict::conflict_detector::{conflicting_pairs, detect_conflicts};
use crate::domain::time_window::TimeWindow;
use crate::domain::utils::id::AssignmentId;
use crate::error::{Error, Result};

new_key_type! {
    pub struct AssignmentKey;
}

/// A consistent copy of the schedule together with the version it was read at.
///
/// The version is the optimistic-concurrency token handed back on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub version: u64,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Assignment storage. Entries are never removed, so iteration follows insertion order.
    slots: SlotMap<AssignmentKey, Assignment>,

    /// Index lookup internal key (AssignmentKey) using the booking id (AssignmentId).
    id_index: HashMap<AssignmentId, AssignmentKey>,

    /// Bumped on every successful mutation.
    version: u64,
}

impl StoreInner {
    fn assignments(&self) -> Vec<Assignment> {
        self.slots.values().cloned().collect()
    }
}

/// The authoritative collection of committed assignments.
///
/// Cloning the store clones the handle, all clones share the same schedule.
/// Writes are serialized by a single lock and validated against the version the
/// writer read, so two sessions racing on a stale snapshot cannot both commit.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(StoreInner::default())) }
    }

    /// Loads already committed assignments as they are, without any conflict check.
    ///
    /// Collisions between loaded non-flagged assignments are reported as warnings.
    pub fn from_assignments(assignments: Vec<Assignment>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.inner.write().expect("RwLock poisoned");
            for assignment in assignments {
                let id = assignment.id.clone();
                match guard.id_index.get(&id).copied() {
                    Some(key) => {
                        log::warn!("Assignment {} listed twice while loading, keeping the last entry.", id);
                        guard.slots[key] = assignment;
                    }
                    None => {
                        let key = guard.slots.insert(assignment);
                        guard.id_index.insert(id, key);
                    }
                }
            }
        }

        for (a, b) in store.invariant_violations() {
            log::warn!("Loaded schedule already double-books a resource: {} and {}.", a, b);
        }
        store
    }

    pub fn version(&self) -> u64 {
        self.inner.read().expect("RwLock poisoned").version
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("RwLock poisoned").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &AssignmentId) -> Option<Assignment> {
        let guard = self.inner.read().expect("RwLock poisoned");
        let key = guard.id_index.get(id)?;
        guard.slots.get(*key).cloned()
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        let guard = self.inner.read().expect("RwLock poisoned");
        ScheduleSnapshot { version: guard.version, assignments: guard.assignments() }
    }

    /// Snapshot scoped to the assignments touching `window` widened by `margin`.
    ///
    /// The margin must cover the longest booking that could still reach into the
    /// window, otherwise same-resource conflicts can be missed.
    pub fn snapshot_around(&self, window: &TimeWindow, margin: Duration) -> Result<ScheduleSnapshot> {
        let scope = window.widened(margin)?;
        let guard = self.inner.read().expect("RwLock poisoned");
        let assignments = guard.slots.values().filter(|a| a.window.overlaps(&scope)).cloned().collect();
        Ok(ScheduleSnapshot { version: guard.version, assignments })
    }

    /// Persists `assignment`, replacing any prior version with the same id.
    ///
    /// Rejected with `StaleCommit` if the schedule changed since `expected_version`
    /// was read. A non-flagged assignment is also re-checked against the stored
    /// schedule under the write lock and rejected with `ConflictingCommit` if it
    /// collides. Returns the new schedule version.
    pub fn commit(&self, assignment: Assignment, expected_version: u64) -> Result<u64> {
        let mut guard = self.inner.write().expect("RwLock poisoned");

        if guard.version != expected_version {
            log::debug!("Commit of {} rejected: version {} expected, store is at {}.", assignment.id, expected_version, guard.version);
            return Err(Error::StaleCommit { expected: expected_version, actual: guard.version });
        }

        if !assignment.flagged && assignment.holds_resources() {
            let current = guard.assignments();
            let conflicts = detect_conflicts(&assignment, &current);
            if !conflicts.is_empty() {
                log::warn!("Commit of {} rejected: collides with {} committed assignment(s).", assignment.id, conflicts.len());
                return Err(Error::ConflictingCommit { id: assignment.id.to_string(), count: conflicts.len() });
            }
        }

        let id = assignment.id.clone();
        match guard.id_index.get(&id).copied() {
            Some(key) => guard.slots[key] = assignment,
            None => {
                let key = guard.slots.insert(assignment);
                guard.id_index.insert(id.clone(), key);
            }
        }

        guard.version += 1;
        log::debug!("Assignment {} committed, schedule version is now {}.", id, guard.version);
        Ok(guard.version)
    }

    /// Moves an assignment along its lifecycle (e.g. to `Completed` or `Cancelled`).
    ///
    /// A non-flagged assignment that takes its resources back (e.g. `Cancelled` to
    /// `Confirmed`) is re-checked like a commit and rejected with `ConflictingCommit`
    /// if someone else booked them in the meantime.
    pub fn set_status(&self, id: &AssignmentId, status: AssignmentStatus) -> Result<u64> {
        let mut guard = self.inner.write().expect("RwLock poisoned");
        let key = *guard.id_index.get(id).ok_or_else(|| Error::UnknownAssignment(id.to_string()))?;

        let current = &guard.slots[key];
        if !current.holds_resources() && status.holds_resources() && !current.flagged {
            let mut reinstated = current.clone();
            reinstated.status = status;
            let conflicts = detect_conflicts(&reinstated, &guard.assignments());
            if !conflicts.is_empty() {
                log::warn!("Status change of {} to {:?} rejected: collides with {} committed assignment(s).", id, status, conflicts.len());
                return Err(Error::ConflictingCommit { id: id.to_string(), count: conflicts.len() });
            }
        }

        let assignment = &mut guard.slots[key];
        if assignment.status.is_terminal() && assignment.status != status {
            log::warn!("Assignment {} leaves terminal status {:?} for {:?}.", id, assignment.status, status);
        }
        assignment.status = status;

        guard.version += 1;
        Ok(guard.version)
    }

    /// Assignments committed despite a known conflict, kept for manual reconciliation.
    pub fn flagged(&self) -> Vec<Assignment> {
        let guard = self.inner.read().expect("RwLock poisoned");
        guard.slots.values().filter(|a| a.flagged).cloned().collect()
    }

    /// Pairs of non-cancelled, non-flagged assignments that double-book a resource.
    ///
    /// Empty whenever the schedule is consistent.
    pub fn invariant_violations(&self) -> Vec<(AssignmentId, AssignmentId)> {
        let assignments = self.snapshot().assignments;
        conflicting_pairs(&assignments, false).into_iter().map(|(a, b)| (a.id.clone(), b.id.clone())).collect()
    }

    pub fn to_dto(&self) -> ScheduleDto {
        let guard = self.inner.read().expect("RwLock poisoned");
        ScheduleDto { assignments: guard.slots.values().map(AssignmentDto::from).collect() }
    }
}

impl TryFrom<ScheduleDto> for ScheduleStore {
    type Error = Error;

    fn try_from(dto: ScheduleDto) -> Result<Self> {
        let assignments = dto.assignments.into_iter().map(Assignment::try_from).collect::<Result<Vec<_>>>()?;
        Ok(ScheduleStore::from_assignments(assignments))
    }
}
