//! Loopers
//!
//! A looper delivers ticks to a [`SpringSystem`]. The system asks for a tick
//! whenever it has active springs; how and when the tick arrives depends on
//! the strategy:
//!
//! - [`AnimationLooper`] forwards frames from a platform [`FrameSource`]
//!   (display refresh, timer) and keeps the source armed only while the
//!   system has work.
//! - [`SimulationLooper`] runs the system to rest synchronously on a
//!   virtual clock. Useful for headless evaluation.
//! - [`SteppingLooper`] advances the virtual clock one explicit step at a
//!   time. Useful for tests.

use crate::settings::DEFAULT_SIMULATION_TIMESTEP_MS;
use crate::system::{SpringSystem, WeakSpringSystem};
use std::cell::{Cell, RefCell};

/// Delivers ticks to a spring system
pub trait SpringLooper {
    /// Attach the system this looper drives
    fn bind(&self, system: WeakSpringSystem);

    /// Ask for one more tick
    fn request_tick(&self);
}

/// A platform frame callback that can be switched on and off
///
/// While armed the platform should call [`AnimationLooper::on_frame`] once
/// per frame with a monotonically non-decreasing timestamp in milliseconds.
pub trait FrameSource {
    fn arm(&self);
    fn disarm(&self);
}

// ============================================================================
// Animation looper
// ============================================================================

/// Drives a spring system from real frames
pub struct AnimationLooper<S: FrameSource> {
    source: S,
    system: RefCell<WeakSpringSystem>,
    /// A tick was requested and not yet delivered
    pending: Cell<bool>,
    armed: Cell<bool>,
}

impl<S: FrameSource> AnimationLooper<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            system: RefCell::new(WeakSpringSystem::new()),
            pending: Cell::new(false),
            armed: Cell::new(false),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether the frame source is currently delivering frames
    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Handle a frame from the platform
    ///
    /// Frames that arrive without a pending request are ignored. The frame
    /// source is disarmed once a frame passes without the system asking
    /// for another.
    pub fn on_frame(&self, timestamp_ms: f64) {
        if !self.pending.replace(false) {
            return;
        }

        let system = self.system.borrow().upgrade();
        if let Some(system) = system {
            system.advance_tick(timestamp_ms);
        }

        if !self.pending.get() && self.armed.replace(false) {
            tracing::trace!("frame source disarmed");
            self.source.disarm();
        }
    }
}

impl<S: FrameSource> SpringLooper for AnimationLooper<S> {
    fn bind(&self, system: WeakSpringSystem) {
        *self.system.borrow_mut() = system;
    }

    fn request_tick(&self) {
        self.pending.set(true);
        if !self.armed.replace(true) {
            tracing::trace!("frame source armed");
            self.source.arm();
        }
    }
}

// ============================================================================
// Simulation looper
// ============================================================================

/// Runs a spring system to rest on a virtual clock
///
/// Every tick advances the clock by a fixed timestep. A tick request runs
/// the whole simulation before returning.
pub struct SimulationLooper {
    system: RefCell<WeakSpringSystem>,
    timestep: f64,
    time: Cell<f64>,
    running: Cell<bool>,
}

impl SimulationLooper {
    pub fn new() -> Self {
        Self::with_timestep(DEFAULT_SIMULATION_TIMESTEP_MS)
    }

    /// Use a virtual frame length of `timestep` milliseconds
    pub fn with_timestep(timestep: f64) -> Self {
        Self {
            system: RefCell::new(WeakSpringSystem::new()),
            timestep,
            time: Cell::new(0.0),
            running: Cell::new(false),
        }
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Current virtual time in milliseconds
    pub fn time(&self) -> f64 {
        self.time.get()
    }

    /// Tick the system until it is idle
    ///
    /// Calls made while already running (from a listener, say) return
    /// immediately; the outer loop picks up the new work.
    pub fn run(&self) {
        let Some(system) = self.system.borrow().upgrade() else {
            return;
        };
        if self.running.replace(true) {
            tracing::trace!("simulation already running");
            return;
        }

        let mut ticks = 0usize;
        while !system.is_idle() && !system.is_destroyed() {
            let time = self.time.get() + self.timestep;
            self.time.set(time);
            system.advance_tick(time);
            ticks += 1;
        }

        self.running.set(false);
        tracing::trace!("simulation ran {} ticks", ticks);
    }
}

impl Default for SimulationLooper {
    fn default() -> Self {
        Self::new()
    }
}

impl SpringLooper for SimulationLooper {
    fn bind(&self, system: WeakSpringSystem) {
        *self.system.borrow_mut() = system;
    }

    fn request_tick(&self) {
        self.run();
    }
}

// ============================================================================
// Stepping looper
// ============================================================================

/// Advances a spring system only when told to
///
/// Tick requests are ignored; each call to [`step`](Self::step) delivers
/// exactly one tick.
pub struct SteppingLooper {
    system: RefCell<WeakSpringSystem>,
    time: Cell<f64>,
}

impl SteppingLooper {
    pub fn new() -> Self {
        Self {
            system: RefCell::new(WeakSpringSystem::new()),
            time: Cell::new(0.0),
        }
    }

    /// Advance the virtual clock by `timestep` milliseconds and tick once
    pub fn step(&self, timestep: f64) {
        let time = self.time.get() + timestep;
        self.time.set(time);
        if let Some(system) = self.system() {
            system.advance_tick(time);
        }
    }

    /// Current virtual time in milliseconds
    pub fn time(&self) -> f64 {
        self.time.get()
    }

    fn system(&self) -> Option<SpringSystem> {
        self.system.borrow().upgrade()
    }
}

impl Default for SteppingLooper {
    fn default() -> Self {
        Self::new()
    }
}

impl SpringLooper for SteppingLooper {
    fn bind(&self, system: WeakSpringSystem) {
        *self.system.borrow_mut() = system;
    }

    fn request_tick(&self) {}
}
