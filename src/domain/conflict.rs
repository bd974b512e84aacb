pub mod conflict_detector;
pub mod resolution;
pub mod resolution_listener;
pub mod suggestion;
pub mod suggestion_generator;
