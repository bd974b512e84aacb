use std::sync::Arc;

use crate::api::fleet_dto::FleetDto;
use crate::api::policy_dto::PolicyDto;
use crate::api::schedule_dto::ScheduleDto;
use crate::domain::assignment::assignment_store::ScheduleStore;
use crate::domain::conflict::resolution::ResolutionWorkflow;
use crate::domain::conflict::suggestion_generator::SuggestionPolicy;
use crate::domain::resource::resource_catalog::ResourceCatalog;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

pub use crate::domain::assignment::assignment::{Assignment, AssignmentStatus};
pub use crate::domain::conflict::conflict_detector::{Conflict, ConflictKind, ConflictSet, detect_conflicts};
pub use crate::domain::conflict::resolution::{CandidateChange, ConflictEpisode, Decision, EpisodeState, ResolutionOutcome, SubmitOutcome};
pub use crate::domain::conflict::suggestion::{Suggestion, SuggestionKind};
pub use crate::domain::conflict::suggestion_generator::build_suggestions;
pub use crate::domain::time_window::TimeWindow;

/// Everything loaded from the configuration files, ready to build workflows from.
#[derive(Debug, Clone)]
pub struct FleetModel {
    pub catalog: Arc<ResourceCatalog>,
    pub store: ScheduleStore,
    pub policy: SuggestionPolicy,
}

impl FleetModel {
    /// A workflow over this model. Workflows created from the same model share the store.
    pub fn workflow(&self) -> ResolutionWorkflow {
        ResolutionWorkflow::new(self.catalog.clone(), self.store.clone(), self.policy.clone())
    }
}

/// Loads the fleet catalog, the committed schedule and an optional suggestion policy.
pub fn generate_fleet_model(fleet_path: &str, schedule_path: &str, policy_path: Option<&str>) -> Result<FleetModel> {
    logger::init();
    log::info!("Logger initialized. Starting FleetModel construction.");

    let fleet_dto: FleetDto = parse_json_file(fleet_path)?;
    let catalog = ResourceCatalog::try_from(fleet_dto)?;
    log::info!("Resource catalog loaded: {} vehicle(s), {} driver(s).", catalog.vehicles().len(), catalog.drivers().len());

    let schedule_dto: ScheduleDto = parse_json_file(schedule_path)?;
    let store = ScheduleStore::try_from(schedule_dto)?;
    log::info!("Schedule loaded: {} assignment(s).", store.len());

    let policy = match policy_path {
        Some(path) => {
            let policy_dto: PolicyDto = parse_json_file(path)?;
            SuggestionPolicy::try_from(policy_dto)?
        }
        None => SuggestionPolicy::default(),
    };
    log::info!("Suggestion policy: {:?}.", policy);

    Ok(FleetModel { catalog: Arc::new(catalog), store, policy })
}
