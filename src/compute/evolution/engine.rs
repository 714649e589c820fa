//! Generation orchestrator.
//!
//! Every generation walks AwaitingRelease → Running → Ranking → Published.
//! Rollouts run on the rayon pool, one task per agent, joined once before
//! ranking. Each task borrows its own network and vehicle mutably; the track
//! and sensor are shared read-only.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::compute::{Network, Sensor, Track, TrackError, Vehicle, VehicleStatus};
use crate::schema::{ConfigError, RaceConfig};

use super::board::{VehicleBoard, VehicleSnapshot};
use super::fitness::{FitnessRecord, rank_records};
use super::handshake::{GenerationPhase, Handshake, Release};
use super::reproduction::Breeder;
use super::rollout::{SimContext, drive};

/// Errors constructing an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Track(#[from] TrackError),
}

/// One independently evolving sub-population, stored as parallel arrays.
/// Slot `i` of `networks` drives slot `i` of `vehicles`.
pub struct Group {
    topology: Vec<usize>,
    networks: Vec<Network>,
    vehicles: Vec<Vehicle>,
    /// Index of the first agent on the vehicle board.
    offset: usize,
}

impl Group {
    pub fn topology(&self) -> &[usize] {
        &self.topology
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

/// Outcome of one group in one generation.
#[derive(Debug, Clone)]
pub struct GroupReport {
    pub group: usize,
    pub finished: usize,
    pub crashed: usize,
    /// Vehicles crashed by a deadline or kill request.
    pub forced: usize,
    pub best_finish_time: Option<f32>,
    /// Largest progress angle among vehicles that did not finish.
    pub best_progress: Option<f32>,
    /// Slot indices, best first.
    pub ranking: Vec<usize>,
}

/// Outcome of one generation.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Generation number as published (first generation is 1).
    pub generation: u64,
    pub groups: Vec<GroupReport>,
    /// Total simulation steps across all agents.
    pub steps: u64,
    pub elapsed_seconds: f64,
}

/// Why the run loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    MaxGenerations,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub generations: u64,
    pub best_finish_time: Option<f32>,
    pub stop_reason: StopReason,
}

/// State shared with presentation layers.
struct Shared {
    handshake: Handshake,
    board: VehicleBoard,
    topologies: Vec<Vec<usize>>,
}

/// Cloneable view of a running engine for a presentation layer.
///
/// Reads are best effort and never block the rollout.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Shared>,
}

impl EngineHandle {
    /// Current state of every vehicle, group after group.
    pub fn vehicles(&self) -> Vec<VehicleSnapshot> {
        self.shared.board.snapshot_all()
    }

    pub fn vehicle(&self, index: usize) -> Option<VehicleSnapshot> {
        self.shared.board.snapshot(index)
    }

    /// Number of published generations.
    pub fn generation(&self) -> u64 {
        self.shared.handshake.generation()
    }

    /// Whether a published generation awaits acknowledgement.
    pub fn is_ready(&self) -> bool {
        self.shared.handshake.is_ready()
    }

    /// Block until a generation is published or the timeout expires.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        self.shared.handshake.wait_ready(timeout)
    }

    /// Release the published generation.
    pub fn acknowledge(&self) {
        self.shared.handshake.acknowledge();
    }

    pub fn phase(&self) -> GenerationPhase {
        self.shared.handshake.phase()
    }

    /// Layer sizes per group, for display.
    pub fn topologies(&self) -> &[Vec<usize>] {
        &self.shared.topologies
    }

    /// Drive the next generation on a different track.
    pub fn swap_track(&self, track: Track) {
        self.shared.handshake.queue_track(Arc::new(track));
    }

    /// Crash every running vehicle of the current generation.
    pub fn kill(&self) {
        self.shared.handshake.kill();
    }

    /// Stop at the next generation boundary.
    pub fn shutdown(&self) {
        self.shared.handshake.request_shutdown();
    }
}

/// Race engine that evolves the population.
pub struct RaceEngine {
    config: RaceConfig,
    sensor: Sensor,
    track: Arc<Track>,
    breeder: Breeder,
    groups: Vec<Group>,
    shared: Arc<Shared>,
    best_finish_time: Option<f32>,
}

impl RaceEngine {
    /// Create an engine on the procedural track described by the config.
    pub fn new(config: RaceConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let track = Track::from_config(&config.track)?;
        Self::with_track(config, track)
    }

    /// Create an engine on a track supplied by the caller.
    pub fn with_track(config: RaceConfig, track: Track) -> Result<Self, EngineError> {
        config.validate()?;

        let mutation_max = config.evolution.mutation_max;
        let mut breeder = match config.evolution.random_seed {
            Some(seed) => Breeder::new(seed, mutation_max),
            None => Breeder::random(mutation_max),
        };

        let start = config.dynamics.start;
        let mut offset = 0;
        let groups: Vec<Group> = config
            .groups
            .iter()
            .map(|group_config| {
                let topology = config.topology(group_config);
                let networks = (0..group_config.size)
                    .map(|_| breeder.random_network(&topology))
                    .collect();
                let group = Group {
                    topology,
                    networks,
                    vehicles: vec![Vehicle::at_start(&start); group_config.size],
                    offset,
                };
                offset += group_config.size;
                group
            })
            .collect();

        let sizes: Vec<usize> = groups.iter().map(Group::len).collect();
        let shared = Arc::new(Shared {
            handshake: Handshake::new(),
            board: VehicleBoard::new(&sizes),
            topologies: groups.iter().map(|g| g.topology.clone()).collect(),
        });
        for group in &groups {
            for (slot, vehicle) in group.vehicles.iter().enumerate() {
                shared.board.publish(group.offset + slot, vehicle);
            }
        }

        for (i, group) in groups.iter().enumerate() {
            info!(
                "Group {}: {} agents, topology {:?}",
                i,
                group.len(),
                group.topology
            );
        }
        warn_if_start_off_track(&track, &config);

        Ok(Self {
            sensor: Sensor::new(&config.sensor),
            config,
            track: Arc::new(track),
            breeder,
            groups,
            shared,
            best_finish_time: None,
        })
    }

    /// Handle for a presentation layer.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Number of published generations.
    pub fn generation(&self) -> u64 {
        self.shared.handshake.generation()
    }

    /// Put every vehicle back at the start pose.
    pub fn reset_vehicles(&mut self) {
        let start = self.config.dynamics.start;
        for group in &mut self.groups {
            for (slot, vehicle) in group.vehicles.iter_mut().enumerate() {
                vehicle.reset(&start);
                self.shared.board.publish(group.offset + slot, vehicle);
            }
        }
    }

    /// Drive every agent to a terminal state. Returns the total step count.
    pub fn rollout(&mut self) -> u64 {
        let deadline = self
            .config
            .rollout
            .generation_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f32(secs).ok())
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let ctx = SimContext {
            track: &self.track,
            sensor: &self.sensor,
            dynamics: &self.config.dynamics,
            max_sim_time: self.config.rollout.max_sim_time,
            deadline,
            kill: self.shared.handshake.kill_flag(),
        };
        let board = &self.shared.board;

        self.groups
            .par_iter_mut()
            .map(|group| {
                let offset = group.offset;
                group
                    .networks
                    .par_iter_mut()
                    .zip(group.vehicles.par_iter_mut())
                    .enumerate()
                    .map(|(slot, (network, vehicle))| {
                        u64::from(drive(network, vehicle, &ctx, |v| {
                            board.publish(offset + slot, v)
                        }))
                    })
                    .sum::<u64>()
            })
            .sum()
    }

    /// Rank every group and replace its networks with the next generation.
    pub fn evolve(&mut self) -> Vec<GroupReport> {
        let mut reports = Vec::with_capacity(self.groups.len());

        for (index, group) in self.groups.iter_mut().enumerate() {
            let records: Vec<FitnessRecord> = group
                .vehicles
                .iter()
                .enumerate()
                .map(|(slot, v)| FitnessRecord::from_vehicle(slot, v, &self.track))
                .collect();
            let ranking = rank_records(&records);
            debug!("Group {} ranking: {:?}", index, ranking);

            let next = self.breeder.reproduce(&group.networks, &ranking);
            group.networks = next;

            reports.push(summarize(index, &group.vehicles, &records, ranking));
        }
        reports
    }

    /// Run one full generation. Returns `None` if shutdown was requested
    /// before it started.
    pub fn run_generation(&mut self) -> Option<GenerationReport> {
        let handshake = &self.shared.handshake;
        let track = match handshake.wait_for_release(self.config.rollout.await_release) {
            Release::Shutdown => return None,
            Release::Proceed(track) => track,
        };
        if let Some(track) = track {
            debug!("Switching to a {}x{} track", track.width(), track.height());
            warn_if_start_off_track(&track, &self.config);
            self.track = track;
        }

        let start_time = Instant::now();
        self.reset_vehicles();
        let steps = self.rollout();

        self.shared.handshake.set_phase(GenerationPhase::Ranking);
        let groups = self.evolve();

        let forced: usize = groups.iter().map(|g| g.forced).sum();
        if forced > 0 {
            warn!("{} agents were forced to crash", forced);
        }
        if let Some(best) = groups.iter().filter_map(|g| g.best_finish_time).reduce(f32::min) {
            self.best_finish_time = Some(self.best_finish_time.map_or(best, |b| b.min(best)));
        }

        let generation = self.shared.handshake.publish();
        let report = GenerationReport {
            generation,
            groups,
            steps,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        };
        log_report(&report);
        Some(report)
    }

    /// Check if the run should stop before starting another generation.
    fn should_stop(&self) -> Option<StopReason> {
        if self.shared.handshake.is_shutdown() {
            return Some(StopReason::Shutdown);
        }
        if let Some(limit) = self.config.evolution.max_generations
            && self.generation() >= limit
        {
            return Some(StopReason::MaxGenerations);
        }
        None
    }

    /// Run generations until shutdown or the generation limit, reporting each one.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> RunSummary
    where
        F: FnMut(&GenerationReport),
    {
        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }
            match self.run_generation() {
                Some(report) => callback(&report),
                None => break StopReason::Shutdown,
            }
        };
        self.shared.handshake.set_phase(GenerationPhase::Stopped);

        RunSummary {
            generations: self.generation(),
            best_finish_time: self.best_finish_time,
            stop_reason,
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> RunSummary {
        self.run_with_callback(|_| {})
    }

    /// Run on a dedicated orchestrator thread.
    pub fn spawn(mut self) -> (EngineHandle, JoinHandle<RunSummary>) {
        let handle = self.handle();
        let thread = thread::spawn(move || self.run());
        (handle, thread)
    }
}

fn summarize(
    group: usize,
    vehicles: &[Vehicle],
    records: &[FitnessRecord],
    ranking: Vec<usize>,
) -> GroupReport {
    let count = |status| vehicles.iter().filter(|v| v.status() == status).count();
    GroupReport {
        group,
        finished: count(VehicleStatus::Finished),
        crashed: count(VehicleStatus::Crashed),
        forced: vehicles.iter().filter(|v| v.forced).count(),
        best_finish_time: records
            .iter()
            .filter(|r| r.finished)
            .map(|r| r.finish_time)
            .reduce(f32::min),
        best_progress: records
            .iter()
            .filter(|r| !r.finished)
            .map(|r| r.progress)
            .reduce(f32::max),
        ranking,
    }
}

fn log_report(report: &GenerationReport) {
    for group in &report.groups {
        info!(
            "Generation {} group {}: finished={} crashed={} best_time={} best_progress={}",
            report.generation,
            group.group,
            group.finished,
            group.crashed,
            group
                .best_finish_time
                .map_or_else(|| "-".to_string(), |t| format!("{:.2}s", t)),
            group
                .best_progress
                .map_or_else(|| "-".to_string(), |p| format!("{:.3}", p)),
        );
    }
    debug!(
        "Generation {} took {:.2}s ({} steps)",
        report.generation, report.elapsed_seconds, report.steps
    );
}

fn warn_if_start_off_track(track: &Track, config: &RaceConfig) {
    let start = &config.dynamics.start;
    if track.is_off_track(start.x, start.y) {
        warn!(
            "Start position ({}, {}) is off track; every agent will crash immediately",
            start.x, start.y
        );
    }
}
