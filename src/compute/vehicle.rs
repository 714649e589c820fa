//! Vehicle state and kinematics.
//!
//! A vehicle is driven by one network. Each step senses the track, runs the
//! network, applies its commands and integrates the pose. Lap progress is
//! tracked against the track's midlines: crossing to the left half marks
//! the half lap, returning to the upper-right quadrant afterwards finishes.

use crate::schema::{DynamicsConfig, SteeringMode, StartPose};

use super::{Network, Sensor, Track};

/// Lifecycle of a vehicle within a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleStatus {
    Running,
    Crashed,
    Finished,
}

/// Kinematic state of one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    /// Position in track pixels.
    pub x: f32,
    pub y: f32,
    /// Speed in pixels per second.
    pub speed: f32,
    /// Heading in radians.
    pub heading: f32,
    /// Angular rate in radians per second.
    pub angular_rate: f32,
    /// Simulated seconds since the start. Frozen at the finish time once finished.
    pub time: f32,
    pub crashed: bool,
    pub half_lap: bool,
    pub finished: bool,
    /// Set when a deadline or kill request forced the crash.
    pub forced: bool,
}

impl Vehicle {
    /// Fresh vehicle at the start pose.
    pub fn at_start(start: &StartPose) -> Self {
        Self {
            x: start.x,
            y: start.y,
            speed: start.speed,
            heading: start.heading,
            angular_rate: 0.0,
            time: 0.0,
            crashed: false,
            half_lap: false,
            finished: false,
            forced: false,
        }
    }

    /// Reset to the start pose.
    pub fn reset(&mut self, start: &StartPose) {
        *self = Self::at_start(start);
    }

    pub fn status(&self) -> VehicleStatus {
        if self.finished {
            VehicleStatus::Finished
        } else if self.crashed {
            VehicleStatus::Crashed
        } else {
            VehicleStatus::Running
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.crashed || self.finished
    }

    /// Crash a running vehicle from outside its own dynamics.
    pub fn force_crash(&mut self) {
        if !self.is_terminal() {
            self.crashed = true;
            self.forced = true;
        }
    }

    /// Advance one simulation step. Terminal vehicles are left untouched.
    pub fn step(
        &mut self,
        network: &mut Network,
        track: &Track,
        sensor: &Sensor,
        dynamics: &DynamicsConfig,
    ) {
        if self.is_terminal() {
            return;
        }
        let dt = dynamics.dt;

        let input = network.input_mut();
        sensor.cast(track, self.x, self.y, self.heading, input);
        let last = input.len() - 1;
        if dynamics.control_speed {
            input[last] = self.speed / dynamics.v_max;
        }
        if dynamics.steering == SteeringMode::Incremental {
            input[last - usize::from(dynamics.control_speed)] = self.angular_rate;
        }

        network.forward();
        let output = network.output();
        let turn = output[0];
        let accel = if dynamics.control_speed { output[1] } else { 0.0 };

        let rate = match dynamics.steering {
            SteeringMode::Direct => turn,
            SteeringMode::Incremental => self.angular_rate + turn * dt,
        };
        self.angular_rate = rate.clamp(-dynamics.w_max, dynamics.w_max);
        if dynamics.control_speed {
            self.speed = (self.speed + accel * dt).clamp(dynamics.v_min, dynamics.v_max);
        }

        self.x += self.speed * self.heading.cos() * dt;
        self.y += self.speed * self.heading.sin() * dt;
        self.time += dt;

        if track.is_off_track(self.x, self.y) {
            self.crashed = true;
            return;
        }

        let (cx, cy) = track.center();
        if self.x < cx {
            self.half_lap = true;
        }
        if self.half_lap && self.x > cx && self.y < cy {
            self.finished = true;
            return;
        }

        self.heading += self.angular_rate * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{Layer, Matrix};
    use crate::schema::SensorConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sensor() -> Sensor {
        Sensor::new(&SensorConfig {
            rays: 5,
            step_length: 1.0,
            sight_distance: 30.0,
        })
    }

    /// Network whose outputs are fixed by its biases: zero weights, biases
    /// chosen so the activation yields the requested values.
    fn constant_network(inputs: usize, outputs: &[f32]) -> Network {
        let biases: Vec<f32> = outputs
            .iter()
            .map(|&o| ((1.0 + o) / (1.0 - o)).ln())
            .collect();
        Network::from_layers(vec![
            Layer {
                weights: None,
                biases: None,
                activations: Matrix::zeros(inputs, 1),
            },
            Layer {
                weights: Some(Matrix::zeros(outputs.len(), inputs)),
                biases: Some(Matrix::from_vec(outputs.len(), 1, biases)),
                activations: Matrix::zeros(outputs.len(), 1),
            },
        ])
    }

    fn dynamics(start: StartPose) -> DynamicsConfig {
        DynamicsConfig {
            start,
            ..Default::default()
        }
    }

    #[test]
    fn test_open_track_never_crashes() {
        let track = Track::open(1920, 1080).unwrap();
        let dynamics = DynamicsConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut network = Network::new(&[6, 12, 2], &mut rng);
        let mut vehicle = Vehicle::at_start(&dynamics.start);

        for _ in 0..500 {
            vehicle.step(&mut network, &track, &sensor(), &dynamics);
            assert_ne!(vehicle.status(), VehicleStatus::Crashed);
        }
        assert!(vehicle.time > 3.0);
    }

    #[test]
    fn test_off_track_start_crashes_immediately() {
        let track = Track::from_red_channel(100, 100, &[0u8; 100 * 100], 10).unwrap();
        let dynamics = dynamics(StartPose {
            x: 50.0,
            y: 50.0,
            speed: 20.0,
            heading: 0.0,
        });
        let mut network = constant_network(6, &[0.0, 0.0]);
        let mut vehicle = Vehicle::at_start(&dynamics.start);

        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        assert_eq!(vehicle.status(), VehicleStatus::Crashed);
        assert!(!vehicle.forced);
    }

    #[test]
    fn test_speed_clamped() {
        let track = Track::open(400, 400).unwrap();
        let dynamics = dynamics(StartPose {
            x: 200.0,
            y: 200.0,
            speed: 59.99,
            heading: 0.0,
        });
        let mut network = constant_network(6, &[0.0, 0.9]);
        let mut vehicle = Vehicle::at_start(&dynamics.start);
        for _ in 0..10 {
            vehicle.step(&mut network, &track, &sensor(), &dynamics);
        }
        assert_eq!(vehicle.speed, dynamics.v_max);

        let mut network = constant_network(6, &[0.0, -0.9]);
        vehicle.speed = dynamics.v_min + 0.001;
        for _ in 0..10 {
            vehicle.step(&mut network, &track, &sensor(), &dynamics);
        }
        assert_eq!(vehicle.speed, dynamics.v_min);
    }

    #[test]
    fn test_incremental_steering_clamped() {
        let track = Track::open(2000, 2000).unwrap();
        let mut dynamics = dynamics(StartPose {
            x: 1000.0,
            y: 1000.0,
            speed: 10.0,
            heading: 0.0,
        });
        dynamics.steering = SteeringMode::Incremental;
        dynamics.control_speed = false;
        dynamics.dt = 0.1;
        dynamics.w_max = 0.5;
        let mut network = constant_network(6, &[0.9]);
        let mut vehicle = Vehicle::at_start(&dynamics.start);

        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        assert!((vehicle.angular_rate - 0.09).abs() < 1e-5);
        // Angular rate is fed back in the last channel.
        for _ in 0..20 {
            vehicle.step(&mut network, &track, &sensor(), &dynamics);
        }
        assert_eq!(vehicle.angular_rate, 0.5);
        assert!((network.input()[5] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_incremental_steering_with_speed_feedback() {
        let track = Track::open(1000, 1000).unwrap();
        let mut dynamics = dynamics(StartPose {
            x: 500.0,
            y: 500.0,
            speed: 30.0,
            heading: 0.0,
        });
        dynamics.steering = SteeringMode::Incremental;
        // 5 rays, angular rate, speed.
        let mut network = constant_network(7, &[0.5, 0.0]);
        let mut vehicle = Vehicle::at_start(&dynamics.start);

        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        let len = network.input().len();
        assert_eq!(network.input()[len - 2], 0.0);
        assert!((network.input()[len - 1] - 30.0 / 60.0).abs() < 1e-6);
        let rate = vehicle.angular_rate;
        assert!((rate - 0.5 * dynamics.dt).abs() < 1e-6);

        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        assert!((network.input()[len - 2] - rate).abs() < 1e-7);
        assert!((network.input()[len - 1] - 30.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_crash_step_does_not_credit_half_lap() {
        // Left half of the image is wall.
        let red: Vec<u8> = (0..100 * 200)
            .map(|i| if i % 200 < 100 { 0 } else { 255 })
            .collect();
        let track = Track::from_red_channel(200, 100, &red, 10).unwrap();
        let mut dynamics = dynamics(StartPose {
            x: 100.5,
            y: 50.0,
            speed: 60.0,
            heading: std::f32::consts::PI,
        });
        dynamics.dt = 0.05;
        let mut network = constant_network(6, &[0.0, 0.0]);
        let mut vehicle = Vehicle::at_start(&dynamics.start);

        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        assert!(vehicle.x < 100.0);
        assert_eq!(vehicle.status(), VehicleStatus::Crashed);
        assert!(!vehicle.half_lap);
        assert_eq!(vehicle.heading, std::f32::consts::PI);
    }

    #[test]
    fn test_direct_steering_and_feedback() {
        let track = Track::open(1000, 1000).unwrap();
        let dynamics = dynamics(StartPose {
            x: 500.0,
            y: 500.0,
            speed: 30.0,
            heading: 0.0,
        });
        let mut network = constant_network(6, &[0.5, 0.0]);
        let mut vehicle = Vehicle::at_start(&dynamics.start);
        vehicle.step(&mut network, &track, &sensor(), &dynamics);

        assert!((vehicle.angular_rate - 0.5).abs() < 1e-5);
        assert!((vehicle.heading - 0.5 * dynamics.dt).abs() < 1e-6);
        assert!((vehicle.x - (500.0 + 30.0 * dynamics.dt)).abs() < 1e-3);
        assert!((network.input()[5] - 30.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_lap_progress() {
        let track = Track::open(200, 100).unwrap();
        let dynamics = dynamics(StartPose {
            x: 150.0,
            y: 60.0,
            speed: 10.0,
            heading: 0.0,
        });
        let mut network = constant_network(6, &[0.0, 0.0]);
        let mut vehicle = Vehicle::at_start(&dynamics.start);

        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        assert!(!vehicle.half_lap);

        // Teleport through the left half, then back into the upper-right quadrant.
        vehicle.x = 50.0;
        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        assert!(vehicle.half_lap);
        assert!(!vehicle.finished);

        vehicle.x = 150.0;
        vehicle.y = 40.0;
        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        assert_eq!(vehicle.status(), VehicleStatus::Finished);

        let time = vehicle.time;
        vehicle.step(&mut network, &track, &sensor(), &dynamics);
        assert_eq!(vehicle.time, time);
    }

    #[test]
    fn test_force_crash() {
        let mut vehicle = Vehicle::at_start(&StartPose::default());
        vehicle.force_crash();
        assert_eq!(vehicle.status(), VehicleStatus::Crashed);
        assert!(vehicle.forced);

        let mut finished = Vehicle::at_start(&StartPose::default());
        finished.finished = true;
        finished.force_crash();
        assert_eq!(finished.status(), VehicleStatus::Finished);
        assert!(!finished.forced);
    }
}
