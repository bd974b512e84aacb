use thiserror::Error;

use crate::domain::resource::resource_trait::ResourceKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse fleet JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to write statistics: {0}")]
    StatisticsError(#[from] csv::Error),

    #[error("Failed to build internal domain model: {0}")]
    ConversionError(#[from] ConversionError),

    /// Rejected before any conflict check, the caller has to re-prompt.
    #[error("Invalid time window: start {start} is not before end {end}")]
    InvalidTimeWindow { start: String, end: String },

    #[error("Time window starting at {start} cannot be moved by {offset} minutes")]
    TimeOutOfRange { start: String, offset: i64 },

    #[error("Unknown {kind} '{id}' is not part of the resource catalog")]
    UnknownResource { kind: ResourceKind, id: String },

    #[error("Candidate has no {0} assigned")]
    MissingResource(ResourceKind),

    #[error("{kind} '{id}' is listed more than once in the resource catalog")]
    DuplicateResource { kind: ResourceKind, id: String },

    /// The schedule moved since the snapshot the candidate was checked against.
    #[error("Stale commit: schedule version is {actual}, expected {expected}")]
    StaleCommit { expected: u64, actual: u64 },

    /// Authoritative re-check under the store lock found a collision.
    #[error("Commit of assignment '{id}' rejected: it collides with {count} committed assignment(s)")]
    ConflictingCommit { id: String, count: usize },

    #[error("Assignment '{0}' already exists in the schedule")]
    DuplicateAssignment(String),

    #[error("Assignment '{0}' does not exist in the schedule")]
    UnknownAssignment(String),

    #[error("Suggestion '{0}' is not part of the pending conflict episode")]
    UnknownSuggestion(String),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Invalid timestamp '{value}' for field '{field}': {reason}")]
    InvalidTimestamp { field: String, value: String, reason: String },

    #[error("Unknown assignment status: {0}")]
    UnknownStatus(String),

    #[error("Unknown availability: {0}")]
    UnknownAvailability(String),

    #[error("Unknown alternate ranking: {0}")]
    UnknownRanking(String),

    #[error("Invalid buffer of {0} minutes, must be between 0 and 10080 (one week)")]
    InvalidBuffer(i64),
}

pub type Result<T> = std::result::Result<T, Error>;
