//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::building::{Building, ElevatorConfig};
use crate::controller::SimulationController;
use crate::dispatch::DispatchStrategy;

/// One scheduler pass of simulated wall time.
pub const TICK: Duration = Duration::from_millis(100);

// ===========================================================================
// Fixtures
// ===========================================================================

/// A car that covers one floor per second, for round-number arithmetic.
pub fn slow_car(name: &str) -> ElevatorConfig {
    let mut config = ElevatorConfig::new(name);
    config.speed = 1.0;
    config
}

/// `count` cars named `car-1..` parked at the lobby, one floor per second.
pub fn standard_building(floors: u32, count: usize) -> Building {
    let cars: Vec<ElevatorConfig> = (1..=count)
        .map(|i| slow_car(&format!("car-{i}")))
        .collect();
    Building::new("test", floors, &cars).unwrap()
}

pub fn standard_controller(
    floors: u32,
    count: usize,
    strategy: DispatchStrategy,
) -> Arc<SimulationController> {
    Arc::new(SimulationController::new(
        Arc::new(standard_building(floors, count)),
        strategy,
    ))
}

// ===========================================================================
// Clock driving
// ===========================================================================

/// Hands the controller fabricated instants exactly one `TICK` apart, so a
/// test advances simulated time without sleeping or spawning the worker.
pub struct TickClock {
    origin: Instant,
    ticks: u64,
}

impl TickClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            ticks: 0,
        }
    }

    /// The instant to pass to `start_clock_at`.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated seconds elapsed so far at speed 1.0.
    pub fn elapsed(&self) -> f64 {
        self.ticks as f64 * TICK.as_secs_f64()
    }

    pub fn step(&mut self, ctrl: &SimulationController) {
        self.ticks += 1;
        ctrl.tick_once(self.origin + TICK * self.ticks as u32);
    }

    pub fn run(&mut self, ctrl: &SimulationController, ticks: u64) {
        for _ in 0..ticks {
            self.step(ctrl);
        }
    }

    /// Step until `done` holds, up to `max_ticks`. Returns whether it held.
    pub fn run_until(
        &mut self,
        ctrl: &SimulationController,
        max_ticks: u64,
        mut done: impl FnMut(&SimulationController) -> bool,
    ) -> bool {
        for _ in 0..max_ticks {
            self.step(ctrl);
            if done(ctrl) {
                return true;
            }
        }
        false
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
