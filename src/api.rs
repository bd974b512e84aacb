pub mod fleet_dto;
pub mod policy_dto;
pub mod schedule_dto;
