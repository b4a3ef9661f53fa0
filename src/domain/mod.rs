// Domain layer - Core business logic

pub mod config;
pub mod errors;
pub mod model;
pub mod rules;
