pub mod comm;
pub mod handler;
pub mod model;
