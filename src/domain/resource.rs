pub mod driver;
pub mod resource_catalog;
pub mod resource_trait;
pub mod vehicle;
