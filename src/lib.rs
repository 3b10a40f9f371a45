// Library crate exposing modules for integration tests and the binary

pub mod config;
pub mod model;
pub mod repository;
pub mod util;
