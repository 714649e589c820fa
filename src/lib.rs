//! Neuro Racer - Neuroevolution of car controllers on a bitmap track.
//!
//! Populations of small feedforward networks steer simulated cars around a
//! track. Each generation every car drives until it leaves the track or
//! completes a lap, and the next generation is bred from the best drivers.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Configuration types for tracks, sensors, dynamics and evolution
//! - `compute`: Matrices, networks, the track mask, vehicles and the evolution engine
//!
//! # Example
//!
//! ```rust,no_run
//! use neuro_racer::{compute::evolution::RaceEngine, schema::RaceConfig};
//!
//! let config = RaceConfig::default();
//! let mut engine = RaceEngine::new(config).unwrap();
//!
//! // A renderer polls the handle from its own thread.
//! let handle = engine.handle();
//! let report = engine.run_generation().unwrap();
//!
//! println!("Generation {}: {} cars on the board", report.generation, handle.vehicles().len());
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EngineHandle, GenerationReport, RaceEngine};
pub use compute::{Network, Track, Vehicle};
pub use schema::RaceConfig;
