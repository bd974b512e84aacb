use serde::{Deserialize, Serialize};

/// Tunables of the suggestion generator. Every field is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDto {
    /// Gap between the end of the last conflicting booking and a delayed proposal.
    pub buffer_minutes: Option<i64>,

    pub skip_unavailable_alternates: Option<bool>,

    /// "catalogOrder" or "capacityFit".
    pub alternate_ranking: Option<String>,
}
