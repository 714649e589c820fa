//! Ray-cast distance sensor.
//!
//! Rays fan out from `heading - π/2` to `heading + π/2` and march in fixed
//! steps until they hit a wall or run out of sight. Distances are reported
//! normalized to [0, 1].

use std::f32::consts::{FRAC_PI_2, PI};

use crate::schema::SensorConfig;

use super::Track;

/// Precomputed sensor parameters.
#[derive(Debug, Clone)]
pub struct Sensor {
    rays: usize,
    step_length: f32,
    sight_distance: f32,
    max_steps: usize,
}

impl Sensor {
    pub fn new(config: &SensorConfig) -> Self {
        Self {
            rays: config.rays,
            step_length: config.step_length,
            sight_distance: config.sight_distance,
            max_steps: (config.sight_distance / config.step_length) as usize,
        }
    }

    #[inline]
    pub fn rays(&self) -> usize {
        self.rays
    }

    #[inline]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Angle of ray `index` relative to the heading.
    #[inline]
    pub fn ray_offset(&self, index: usize) -> f32 {
        if self.rays == 1 {
            0.0
        } else {
            -FRAC_PI_2 + index as f32 * PI / (self.rays - 1) as f32
        }
    }

    /// Cast every ray from (x, y) and write normalized distances into `out`.
    ///
    /// `out` must hold at least `rays` values; extra values are left alone.
    pub fn cast(&self, track: &Track, x: f32, y: f32, heading: f32, out: &mut [f32]) {
        assert!(out.len() >= self.rays, "sensor output buffer too small");
        for (ray, distance) in out.iter_mut().take(self.rays).enumerate() {
            let steps = self.march(track, x, y, heading + self.ray_offset(ray));
            *distance = steps as f32 * self.step_length / self.sight_distance;
        }
    }

    /// Number of steps a single ray travels before hitting a wall.
    pub fn march(&self, track: &Track, x: f32, y: f32, angle: f32) -> usize {
        let (dx, dy) = (angle.cos() * self.step_length, angle.sin() * self.step_length);
        let (mut px, mut py) = (x, y);
        let mut steps = 0;
        while steps < self.max_steps {
            px += dx;
            py += dy;
            if track.is_off_track(px, py) {
                break;
            }
            steps += 1;
        }
        steps
    }
}
