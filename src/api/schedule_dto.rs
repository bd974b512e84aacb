use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDto {
    pub assignments: Vec<AssignmentDto>,
}

/// Timestamps are RFC 3339 strings, e.g. `2026-03-02T08:00:00Z`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDto {
    pub id: Option<String>,
    pub start: String,
    pub end: String,
    pub vehicle_id: String,
    pub driver_id: String,
    pub status: Option<String>,
    pub passenger_count: Option<u32>,
    pub location: Option<String>,
    pub sharing_allowed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub flagged: Option<bool>,
}
