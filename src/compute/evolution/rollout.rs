//! Per-agent rollout loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::compute::{Network, Sensor, Track, Vehicle};
use crate::schema::DynamicsConfig;

/// Deadline checks read the clock only every this many steps.
const DEADLINE_CHECK_INTERVAL: u32 = 64;

/// Read-only state shared by every task of a generation.
#[derive(Clone, Copy)]
pub struct SimContext<'a> {
    pub track: &'a Track,
    pub sensor: &'a Sensor,
    pub dynamics: &'a DynamicsConfig,
    /// Simulated-time limit per vehicle.
    pub max_sim_time: Option<f32>,
    /// Wall-clock limit for the whole generation.
    pub deadline: Option<Instant>,
    /// Raised by the presentation layer to end the generation early.
    pub kill: &'a AtomicBool,
}

impl SimContext<'_> {
    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Drive one vehicle until it crashes or finishes.
///
/// `publish` sees the vehicle after every step. Returns the number of steps.
pub fn drive(
    network: &mut Network,
    vehicle: &mut Vehicle,
    ctx: &SimContext<'_>,
    mut publish: impl FnMut(&Vehicle),
) -> u32 {
    let mut steps: u32 = 0;
    publish(vehicle);

    while !vehicle.is_terminal() {
        if ctx.kill.load(Ordering::Acquire)
            || (steps % DEADLINE_CHECK_INTERVAL == 0 && ctx.past_deadline())
        {
            vehicle.force_crash();
            publish(vehicle);
            break;
        }

        vehicle.step(network, ctx.track, ctx.sensor, ctx.dynamics);
        steps = steps.wrapping_add(1);

        if let Some(limit) = ctx.max_sim_time
            && vehicle.time >= limit
        {
            vehicle.force_crash();
        }
        publish(vehicle);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::VehicleStatus;
    use crate::schema::{SensorConfig, StartPose};
    use crate::compute::{Layer, Matrix};

    struct Fixture {
        track: Track,
        sensor: Sensor,
        dynamics: DynamicsConfig,
        kill: AtomicBool,
        network: Network,
    }

    fn fixture() -> Fixture {
        let sensor_config = SensorConfig {
            rays: 5,
            step_length: 1.0,
            sight_distance: 20.0,
        };
        let dynamics = DynamicsConfig {
            start: StartPose {
                x: 500.0,
                y: 500.0,
                speed: 10.0,
                heading: 0.0,
            },
            v_min: 10.0,
            v_max: 10.0,
            dt: 0.1,
            ..Default::default()
        };
        // Zero weights and biases: no steering, no acceleration.
        let network = Network::from_layers(vec![
            Layer {
                weights: None,
                biases: None,
                activations: Matrix::zeros(6, 1),
            },
            Layer {
                weights: Some(Matrix::zeros(2, 6)),
                biases: Some(Matrix::zeros(2, 1)),
                activations: Matrix::zeros(2, 1),
            },
        ]);
        Fixture {
            track: Track::open(1000, 1000).unwrap(),
            sensor: Sensor::new(&sensor_config),
            dynamics,
            kill: AtomicBool::new(false),
            network,
        }
    }

    fn context(f: &Fixture) -> SimContext<'_> {
        SimContext {
            track: &f.track,
            sensor: &f.sensor,
            dynamics: &f.dynamics,
            max_sim_time: None,
            deadline: None,
            kill: &f.kill,
        }
    }

    #[test]
    fn test_sim_time_limit_forces_crash() {
        let f = fixture();
        let mut ctx = context(&f);
        ctx.max_sim_time = Some(2.0);
        let mut network = f.network.clone();
        let mut vehicle = Vehicle::at_start(&f.dynamics.start);

        let mut published = 0;
        let steps = drive(&mut network, &mut vehicle, &ctx, |_| published += 1);

        assert_eq!(vehicle.status(), VehicleStatus::Crashed);
        assert!(vehicle.forced);
        assert!((19..=21).contains(&steps));
        assert_eq!(published, steps + 1);
    }

    #[test]
    fn test_kill_stops_immediately() {
        let f = fixture();
        f.kill.store(true, Ordering::Release);
        let mut network = f.network.clone();
        let mut vehicle = Vehicle::at_start(&f.dynamics.start);

        let steps = drive(&mut network, &mut vehicle, &context(&f), |_| {});
        assert_eq!(steps, 0);
        assert!(vehicle.forced);
        assert_eq!(vehicle.x, f.dynamics.start.x);
    }

    #[test]
    fn test_expired_deadline_forces_crash() {
        let f = fixture();
        let mut ctx = context(&f);
        ctx.deadline = Some(Instant::now());
        let mut network = f.network.clone();
        let mut vehicle = Vehicle::at_start(&f.dynamics.start);

        drive(&mut network, &mut vehicle, &ctx, |_| {});
        assert!(vehicle.forced);
    }

    #[test]
    fn test_natural_crash_not_forced() {
        let f = fixture();
        let mut network = f.network.clone();
        let mut vehicle = Vehicle::at_start(&f.dynamics.start);
        // Heading straight for the right edge at constant speed.
        vehicle.x = 990.0;

        let steps = drive(&mut network, &mut vehicle, &context(&f), |_| {});
        assert_eq!(vehicle.status(), VehicleStatus::Crashed);
        assert!(!vehicle.forced);
        assert!(steps > 0);
    }
}
