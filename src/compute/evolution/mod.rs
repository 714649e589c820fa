//! Neuroevolution of car controllers.
//!
//! Each group of agents evolves independently: every generation all agents
//! drive until they crash or finish, each group is ranked, and the next
//! generation is bred by averaging parents from the better and worse halves
//! of the ranking.
//!
//! # Overview
//!
//! - **Rollout** (`rollout`): Per-agent driving loop with kill and deadline checks
//! - **Fitness** (`fitness`): Total order over vehicle outcomes
//! - **Reproduction** (`reproduction`): Deterministic parent pairing and crossover
//! - **Board** (`board`): Lock-free vehicle state for a renderer
//! - **Handshake** (`handshake`): Generation release protocol
//! - **Engine** (`engine`): The generation loop tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use neuro_racer::schema::RaceConfig;
//! use neuro_racer::compute::evolution::RaceEngine;
//!
//! let mut config = RaceConfig::default();
//! config.evolution.max_generations = Some(10);
//!
//! let mut engine = RaceEngine::new(config).unwrap();
//! let summary = engine.run_with_callback(|report| {
//!     for group in &report.groups {
//!         println!("Generation {} group {}: {} finished",
//!             report.generation, group.group, group.finished);
//!     }
//! });
//! println!("Best lap: {:?}", summary.best_finish_time);
//! ```

mod board;
mod engine;
mod fitness;
mod handshake;
mod reproduction;
mod rollout;

pub use board::{VehicleBoard, VehicleSnapshot};
pub use engine::{
    EngineError, EngineHandle, GenerationReport, Group, GroupReport, RaceEngine, RunSummary,
    StopReason,
};
pub use fitness::{FitnessRecord, compare, progress_angle, rank_records, rank_vehicles};
pub use handshake::{GenerationPhase, Handshake, Release};
pub use reproduction::{Breeder, parent_pairs};
pub use rollout::{SimContext, drive};
