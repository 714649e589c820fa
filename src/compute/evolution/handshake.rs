//! Generation handshake between the orchestrator and a presentation layer.
//!
//! The orchestrator publishes a generation by raising the ready flag. When
//! release gating is on it will not reset vehicles until the presentation
//! layer acknowledges, so a renderer never sees the next generation's reset
//! while it is still showing results. Track swaps queue here and are only
//! applied at that boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;

use crate::compute::Track;

/// Orchestrator phase within a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    /// Waiting for the previous generation to be released.
    AwaitingRelease,
    /// Agents are driving.
    Running,
    /// Ranking and reproducing.
    Ranking,
    /// New population available.
    Published,
    /// The orchestrator loop has exited.
    Stopped,
}

#[derive(Debug)]
struct HandshakeState {
    phase: GenerationPhase,
    generation: u64,
    ready: bool,
    shutdown: bool,
    pending_track: Option<Arc<Track>>,
}

/// What the orchestrator gets back when it is released.
#[derive(Debug)]
pub enum Release {
    /// Start the next generation, on a new track if one was queued.
    Proceed(Option<Arc<Track>>),
    /// Shutdown was requested.
    Shutdown,
}

/// Mutex and condition variable guarded generation state.
#[derive(Debug)]
pub struct Handshake {
    state: Mutex<HandshakeState>,
    changed: Condvar,
    kill: AtomicBool,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HandshakeState {
                phase: GenerationPhase::AwaitingRelease,
                generation: 0,
                ready: false,
                shutdown: false,
                pending_track: None,
            }),
            changed: Condvar::new(),
            kill: AtomicBool::new(false),
        }
    }

    // Every critical section leaves the state consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HandshakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> GenerationPhase {
        self.lock().phase
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    /// Orchestrator side: enter a new phase.
    pub fn set_phase(&self, phase: GenerationPhase) {
        self.lock().phase = phase;
        self.changed.notify_all();
    }

    /// Orchestrator side: wait until the previous generation is released.
    ///
    /// With `gated` off the orchestrator proceeds at once and clears the
    /// ready flag itself. The kill flag is cleared on release.
    pub fn wait_for_release(&self, gated: bool) -> Release {
        let mut state = self.lock();
        state.phase = GenerationPhase::AwaitingRelease;
        if gated {
            state = self
                .changed
                .wait_while(state, |s| s.ready && !s.shutdown)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.shutdown {
            return Release::Shutdown;
        }

        state.ready = false;
        state.phase = GenerationPhase::Running;
        self.kill.store(false, Ordering::Release);
        let track = state.pending_track.take();
        drop(state);
        self.changed.notify_all();
        Release::Proceed(track)
    }

    /// Orchestrator side: raise the ready flag and bump the generation counter.
    pub fn publish(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        state.ready = true;
        state.phase = GenerationPhase::Published;
        let generation = state.generation;
        drop(state);
        self.changed.notify_all();
        generation
    }

    /// Presentation side: release the published generation.
    pub fn acknowledge(&self) {
        let mut state = self.lock();
        if state.ready {
            debug!("Generation {} acknowledged", state.generation);
        }
        state.ready = false;
        drop(state);
        self.changed.notify_all();
    }

    /// Presentation side: block until a generation is published, shutdown is
    /// requested, or the timeout expires. Returns whether the ready flag is up.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |s| {
                !s.ready && !s.shutdown && s.phase != GenerationPhase::Stopped
            })
            .unwrap_or_else(PoisonError::into_inner);
        state.ready
    }

    /// Queue a track for the next generation, replacing any queued one.
    pub fn queue_track(&self, track: Arc<Track>) {
        self.lock().pending_track = Some(track);
    }

    /// Ask the orchestrator to stop at the next generation boundary.
    pub fn request_shutdown(&self) {
        self.lock().shutdown = true;
        self.changed.notify_all();
    }

    /// Force every running vehicle of the current generation to crash.
    pub fn kill(&self) {
        self.kill.store(true, Ordering::Release);
    }

    #[inline]
    pub fn kill_flag(&self) -> &AtomicBool {
        &self.kill
    }
}
