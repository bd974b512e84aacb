pub mod assignment;
pub mod assignment_store;
