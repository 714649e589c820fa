//! Evolution configuration types.
//!
//! Groups evolve independently: each has its own topology and never mixes
//! genetic material with another group.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// One independently evolving sub-population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Number of agents. Fixed for the lifetime of the engine.
    pub size: usize,
    /// Hidden layer sizes. Input and output sizes are derived from the
    /// sensor and dynamics configuration.
    #[serde(default)]
    pub hidden_layers: Vec<usize>,
}

/// Reproduction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionSettings {
    /// Half-width of the uniform noise added to every averaged parameter.
    #[serde(default = "default_mutation_max")]
    pub mutation_max: f32,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Stop after this many generations. Runs until shut down when `None`.
    #[serde(default)]
    pub max_generations: Option<u64>,
}

fn default_mutation_max() -> f32 {
    0.01
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            mutation_max: default_mutation_max(),
            random_seed: None,
            max_generations: None,
        }
    }
}

impl EvolutionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mutation_max.is_finite() || self.mutation_max < 0.0 {
            return Err(ConfigError::InvalidMutation);
        }
        Ok(())
    }
}
