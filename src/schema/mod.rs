//! Schema module - Configuration types for races and evolution.

mod config;
mod evolution;

pub use config::*;
pub use evolution::*;
