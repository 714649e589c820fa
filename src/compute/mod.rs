//! Compute module - Networks, vehicle dynamics and evolution.

mod matrix;
mod network;
mod sensor;
mod track;
mod vehicle;

pub mod evolution;

pub use matrix::*;
pub use network::*;
pub use sensor::*;
pub use track::*;
pub use vehicle::*;
