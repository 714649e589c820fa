//! Configuration types for the track, sensors and vehicle dynamics.

use std::f32::consts::FRAC_PI_2;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{EvolutionSettings, GroupConfig};

/// Top-level race configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Track the population drives on.
    pub track: TrackConfig,
    /// Ray-cast sensor parameters.
    #[serde(default)]
    pub sensor: SensorConfig,
    /// Vehicle kinematics and start pose.
    #[serde(default)]
    pub dynamics: DynamicsConfig,
    /// Independently evolving groups. Each group has its own topology.
    pub groups: Vec<GroupConfig>,
    /// Reproduction parameters.
    #[serde(default)]
    pub evolution: EvolutionSettings,
    /// Rollout limits and presentation handshake.
    #[serde(default)]
    pub rollout: RolloutConfig,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            track: TrackConfig::default(),
            sensor: SensorConfig::default(),
            dynamics: DynamicsConfig::default(),
            groups: vec![
                GroupConfig {
                    size: 20,
                    hidden_layers: vec![64, 256, 128],
                },
                GroupConfig {
                    size: 20,
                    hidden_layers: vec![64, 36, 24],
                },
            ],
            evolution: EvolutionSettings::default(),
            rollout: RolloutConfig::default(),
        }
    }
}

impl RaceConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: RaceConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of network inputs: one per ray plus the feedback channels.
    pub fn input_size(&self) -> usize {
        let steering = usize::from(self.dynamics.steering == SteeringMode::Incremental);
        let speed = usize::from(self.dynamics.control_speed);
        self.sensor.rays + steering + speed
    }

    /// Number of network outputs: turning command, plus acceleration if speed is controlled.
    pub fn output_size(&self) -> usize {
        1 + usize::from(self.dynamics.control_speed)
    }

    /// Full layer sizes for a group, input and output layers included.
    pub fn topology(&self, group: &GroupConfig) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(group.hidden_layers.len() + 2);
        sizes.push(self.input_size());
        sizes.extend_from_slice(&group.hidden_layers);
        sizes.push(self.output_size());
        sizes
    }

    /// Total number of agents across all groups.
    pub fn population_size(&self) -> usize {
        self.groups.iter().map(|g| g.size).sum()
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.track.validate()?;
        self.sensor.validate()?;
        self.dynamics.validate()?;
        self.rollout.validate()?;
        self.evolution.validate()?;

        if self.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        for (i, group) in self.groups.iter().enumerate() {
            if group.size < 2 {
                return Err(ConfigError::GroupTooSmall {
                    group: i,
                    size: group.size,
                });
            }
            if group.hidden_layers.contains(&0) {
                return Err(ConfigError::EmptyLayer { group: i });
            }
        }
        Ok(())
    }
}

/// Track bitmap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Procedural shape used to rasterize the mask.
    #[serde(default)]
    pub shape: TrackShape,
    /// Pixels whose red channel is below this value are walls.
    #[serde(default = "default_off_track_threshold")]
    pub off_track_threshold: u8,
}

fn default_off_track_threshold() -> u8 {
    10
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            shape: TrackShape::default(),
            off_track_threshold: default_off_track_threshold(),
        }
    }
}

impl TrackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidTrackDimensions);
        }
        if let TrackShape::Oval { outer, inner } = self.shape
            && (inner.0 >= outer.0 || inner.1 >= outer.1 || inner.0 < 0.0 || inner.1 < 0.0)
        {
            return Err(ConfigError::InvalidOval);
        }
        Ok(())
    }
}

/// Procedural track shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackShape {
    /// Elliptical ring centered in the image. Semi-axes are in pixels.
    Oval {
        outer: (f32, f32),
        inner: (f32, f32),
    },
    /// Every pixel is drivable.
    Open,
}

impl Default for TrackShape {
    fn default() -> Self {
        Self::Oval {
            outer: (850.0, 480.0),
            inner: (450.0, 200.0),
        }
    }
}

/// Ray-cast sensor parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Number of rays in the fan.
    pub rays: usize,
    /// Distance advanced per ray step, in pixels.
    pub step_length: f32,
    /// Maximum distance a ray can see, in pixels.
    pub sight_distance: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            rays: 19,
            step_length: 0.2,
            sight_distance: 100.0,
        }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rays == 0 {
            return Err(ConfigError::NoRays);
        }
        if !(self.step_length > 0.0) {
            return Err(ConfigError::InvalidStepLength);
        }
        if !(self.sight_distance >= self.step_length) {
            return Err(ConfigError::InvalidSightDistance);
        }
        Ok(())
    }
}

/// How output channel 0 drives the angular rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SteeringMode {
    /// Output is the angular rate.
    #[default]
    Direct,
    /// Output is a turning acceleration integrated into the angular rate.
    /// The current rate is fed back as an extra input.
    Incremental,
}

/// Pose every vehicle is reset to at the start of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPose {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    /// Heading in radians, screen coordinates (y grows downwards).
    pub heading: f32,
}

impl Default for StartPose {
    fn default() -> Self {
        Self {
            x: 1550.0,
            y: 550.0,
            speed: 50.0,
            heading: -FRAC_PI_2,
        }
    }
}

/// Vehicle kinematics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicsConfig {
    #[serde(default)]
    pub start: StartPose,
    /// Minimum speed in pixels per second.
    pub v_min: f32,
    /// Maximum speed in pixels per second.
    pub v_max: f32,
    /// Angular rate bound in radians per second.
    pub w_max: f32,
    /// Simulated seconds per step.
    pub dt: f32,
    #[serde(default)]
    pub steering: SteeringMode,
    /// Let output channel 1 accelerate the vehicle and feed speed back as an input.
    #[serde(default = "default_control_speed")]
    pub control_speed: bool,
}

fn default_control_speed() -> bool {
    true
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            start: StartPose::default(),
            v_min: 10.0,
            v_max: 60.0,
            w_max: 3.0,
            dt: 1.0 / 144.0,
            steering: SteeringMode::default(),
            control_speed: default_control_speed(),
        }
    }
}

impl DynamicsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.v_min >= 0.0 && self.v_min <= self.v_max && self.v_max > 0.0) {
            return Err(ConfigError::InvalidSpeedRange);
        }
        if !(self.w_max > 0.0) {
            return Err(ConfigError::InvalidTurnRate);
        }
        if !(self.dt > 0.0) {
            return Err(ConfigError::InvalidTimeStep);
        }
        Ok(())
    }
}

/// Rollout limits and presentation handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Simulated seconds after which a running vehicle is forced to crash.
    #[serde(default = "default_max_sim_time")]
    pub max_sim_time: Option<f32>,
    /// Wall-clock seconds after which every running vehicle is forced to crash.
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: Option<f32>,
    /// Wait for the presentation layer to acknowledge each generation.
    #[serde(default)]
    pub await_release: bool,
}

fn default_max_sim_time() -> Option<f32> {
    Some(120.0)
}

fn default_generation_timeout() -> Option<f32> {
    Some(30.0)
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            max_sim_time: default_max_sim_time(),
            generation_timeout_secs: default_generation_timeout(),
            await_release: false,
        }
    }
}

impl RolloutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |limit: Option<f32>| limit.is_none_or(|t| t.is_finite() && t > 0.0);
        if !positive(self.max_sim_time) || !positive(self.generation_timeout_secs) {
            return Err(ConfigError::InvalidTimeLimit);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Track dimensions must be non-zero")]
    InvalidTrackDimensions,
    #[error("Oval inner semi-axes must be non-negative and smaller than the outer ones")]
    InvalidOval,
    #[error("Sensor needs at least one ray")]
    NoRays,
    #[error("Sensor step length must be positive")]
    InvalidStepLength,
    #[error("Sight distance must be at least one step long")]
    InvalidSightDistance,
    #[error("Speed range must satisfy 0 <= v_min <= v_max with v_max > 0")]
    InvalidSpeedRange,
    #[error("Angular rate bound must be positive")]
    InvalidTurnRate,
    #[error("Time step must be positive")]
    InvalidTimeStep,
    #[error("Rollout time limits must be positive")]
    InvalidTimeLimit,
    #[error("Mutation magnitude must be finite and non-negative")]
    InvalidMutation,
    #[error("At least one group is required")]
    NoGroups,
    #[error("Group {group} has {size} agents, at least 2 are required")]
    GroupTooSmall { group: usize, size: usize },
    #[error("Group {group} has a hidden layer of size zero")]
    EmptyLayer { group: usize },
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
