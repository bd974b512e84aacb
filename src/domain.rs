pub mod assignment;
pub mod conflict;
pub mod resource;
pub mod time_window;
pub mod utils;
