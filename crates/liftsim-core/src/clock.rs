//! Simulation clock: wall time in, scaled simulated time out.
//!
//! The clock never sleeps and never reads the system time itself. The tick
//! loop feeds it `Instant`s; [`SimClock::tick`] answers with the simulated
//! interval that elapsed since the previous tick, scaled by the speed
//! multiplier. Keeping the clock pure makes every state transition and the
//! scaling math testable with fabricated instants.

use std::time::{Duration, Instant};

use log::info;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of the clock. `Stopped` is both the initial and the terminal
/// state; a stopped clock can be started again from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub enum ClockState {
    #[default]
    Stopped,
    Running,
    Paused,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Scaled simulation clock.
///
/// Speed is clamped to `[MIN_SPEED, MAX_SPEED]`. Pausing freezes simulated
/// time; resuming rebases on the caller's `now` so the paused wall-clock gap
/// never leaks into the simulation.
#[derive(Debug)]
pub struct SimClock {
    state: ClockState,
    speed: f64,
    /// Simulated seconds since `start`.
    sim_time: f64,
    last: Option<Instant>,
}

impl SimClock {
    pub const MIN_SPEED: f64 = 0.1;
    pub const MAX_SPEED: f64 = 10.0;

    pub fn new() -> Self {
        Self {
            state: ClockState::Stopped,
            speed: 1.0,
            sim_time: 0.0,
            last: None,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Simulated seconds since the last `start`.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Set the speed multiplier, clamped to the permitted range. Returns the
    /// effective value. Takes effect from the next tick; elapsed simulated
    /// time is never rescaled.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        let clamped = speed.clamp(Self::MIN_SPEED, Self::MAX_SPEED);
        if clamped != speed {
            info!("speed {speed} clamped to {clamped}");
        }
        self.speed = clamped;
        clamped
    }

    /// Begin running from simulated time zero. False if already running;
    /// starting from `Paused` is a restart, not a resume.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state == ClockState::Running {
            return false;
        }
        self.state = ClockState::Running;
        self.sim_time = 0.0;
        self.last = Some(now);
        true
    }

    /// Freeze simulated time. Pausing an already-paused or stopped clock is
    /// a no-op returning false.
    pub fn pause(&mut self) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        self.state = ClockState::Paused;
        true
    }

    /// Continue from a pause. The interval spent paused is discarded.
    pub fn resume(&mut self, now: Instant) -> bool {
        if self.state != ClockState::Paused {
            return false;
        }
        self.state = ClockState::Running;
        self.last = Some(now);
        true
    }

    /// Halt the clock. Simulated time is retained for the final report.
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
        self.last = None;
    }

    /// Advance to `now`. Returns the scaled simulated interval, or `None`
    /// when the clock is not running (the caller skips the tick).
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        if self.state != ClockState::Running {
            return None;
        }
        let wall = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last = Some(now);

        let dt = wall.mul_f64(self.speed);
        self.sim_time += dt.as_secs_f64();
        Some(dt)
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
