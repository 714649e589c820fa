//! Lock-free vehicle board read by the presentation layer.
//!
//! Each agent owns one cell and publishes to it after every step. Readers
//! may observe a cell mid-update; every field is individually atomic, which
//! is enough for drawing.

use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use crate::compute::{Vehicle, VehicleStatus};

const CRASHED: u8 = 1;
const FINISHED: u8 = 1 << 1;
const HALF_LAP: u8 = 1 << 2;

/// Best-effort copy of one vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSnapshot {
    /// Group the vehicle belongs to.
    pub group: usize,
    pub x: f32,
    pub y: f32,
    pub heading: f32,
    pub speed: f32,
    pub half_lap: bool,
    pub status: VehicleStatus,
}

#[derive(Debug, Default)]
struct VehicleCell {
    x: AtomicU32,
    y: AtomicU32,
    heading: AtomicU32,
    speed: AtomicU32,
    flags: AtomicU8,
}

impl VehicleCell {
    fn store(&self, vehicle: &Vehicle) {
        let mut flags = 0;
        if vehicle.crashed {
            flags |= CRASHED;
        }
        if vehicle.finished {
            flags |= FINISHED;
        }
        if vehicle.half_lap {
            flags |= HALF_LAP;
        }
        self.x.store(vehicle.x.to_bits(), Ordering::Relaxed);
        self.y.store(vehicle.y.to_bits(), Ordering::Relaxed);
        self.heading.store(vehicle.heading.to_bits(), Ordering::Relaxed);
        self.speed.store(vehicle.speed.to_bits(), Ordering::Relaxed);
        self.flags.store(flags, Ordering::Release);
    }

    fn load(&self, group: usize) -> VehicleSnapshot {
        let flags = self.flags.load(Ordering::Acquire);
        let status = if flags & FINISHED != 0 {
            VehicleStatus::Finished
        } else if flags & CRASHED != 0 {
            VehicleStatus::Crashed
        } else {
            VehicleStatus::Running
        };
        VehicleSnapshot {
            group,
            x: f32::from_bits(self.x.load(Ordering::Relaxed)),
            y: f32::from_bits(self.y.load(Ordering::Relaxed)),
            heading: f32::from_bits(self.heading.load(Ordering::Relaxed)),
            speed: f32::from_bits(self.speed.load(Ordering::Relaxed)),
            half_lap: flags & HALF_LAP != 0,
            status,
        }
    }
}

/// One cell per agent, indexed by global agent index.
#[derive(Debug)]
pub struct VehicleBoard {
    cells: Vec<VehicleCell>,
    groups: Vec<usize>,
}

impl VehicleBoard {
    /// Board for groups of the given sizes, laid out group after group.
    pub fn new(group_sizes: &[usize]) -> Self {
        let groups: Vec<usize> = group_sizes
            .iter()
            .enumerate()
            .flat_map(|(group, &size)| std::iter::repeat_n(group, size))
            .collect();
        let cells = groups.iter().map(|_| VehicleCell::default()).collect();
        Self { cells, groups }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Overwrite a cell with the vehicle's current state.
    #[inline]
    pub fn publish(&self, index: usize, vehicle: &Vehicle) {
        self.cells[index].store(vehicle);
    }

    pub fn snapshot(&self, index: usize) -> Option<VehicleSnapshot> {
        self.cells
            .get(index)
            .map(|cell| cell.load(self.groups[index]))
    }

    pub fn snapshot_all(&self) -> Vec<VehicleSnapshot> {
        self.cells
            .iter()
            .zip(&self.groups)
            .map(|(cell, &group)| cell.load(group))
            .collect()
    }
}
