//! Top-level facade: one building, one controller, name-based access.
//!
//! [`ElevatorSimulator`] is the embedding surface for binaries, UIs, and
//! tests that don't want to juggle ids and locks. It also generates traffic:
//! the three stock patterns plus uniform random trips, all reproducible from
//! a seed.

use std::sync::Arc;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::building::{Building, ElevatorConfig};
use crate::controller::{ScheduledArrival, SimStatus, SimulationController};
use crate::dispatch::DispatchStrategy;
use crate::elevator::Direction;
use crate::error::ConfigError;
use crate::event::SimObserver;
use crate::id::{ElevatorId, PassengerId};
use crate::metrics::SystemMetrics;
use crate::snapshot::BuildingSnapshot;

// ---------------------------------------------------------------------------
// Traffic scenarios
// ---------------------------------------------------------------------------

/// Shape of generated traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficPattern {
    /// Everyone enters at the lobby and rides up.
    MorningRush,
    /// Everyone rides down to the lobby.
    EveningRush,
    /// Uniform random trips between distinct floors.
    Interfloor,
}

/// A batch of scheduled passengers. `mean_interval` is the average simulated
/// gap between consecutive arrivals, in seconds; gaps are drawn uniformly
/// from `[0, 2 * mean_interval)`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scenario {
    pub pattern: TrafficPattern,
    pub passengers: usize,
    pub mean_interval: f64,
    /// Fixed seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// End-of-run summary assembled from the roster and fleet counters.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SimulationReport {
    pub status: SimStatus,
    pub metrics: SystemMetrics,
    pub completed_trips: usize,
    pub average_wait: Option<f64>,
    pub max_wait: Option<f64>,
    pub average_travel: Option<f64>,
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

pub struct ElevatorSimulator {
    controller: Arc<SimulationController>,
}

impl ElevatorSimulator {
    pub fn new(building: Building, strategy: DispatchStrategy) -> Self {
        let controller = Arc::new(SimulationController::new(Arc::new(building), strategy));
        Self { controller }
    }

    /// A conventional setup: 10 floors, three cars at the lobby.
    pub fn standard() -> Result<Self, ConfigError> {
        let cars = [
            ElevatorConfig::new("car-1"),
            ElevatorConfig::new("car-2"),
            ElevatorConfig::new("car-3"),
        ];
        let building = Building::new("main", 10, &cars)?;
        Ok(Self::new(building, DispatchStrategy::default()))
    }

    pub fn controller(&self) -> &Arc<SimulationController> {
        &self.controller
    }

    pub fn building(&self) -> &Arc<Building> {
        self.controller.building()
    }

    // -- clock --------------------------------------------------------------

    pub fn start(&self) -> bool {
        self.controller.start()
    }

    pub fn pause(&self) -> bool {
        self.controller.pause()
    }

    pub fn resume(&self) -> bool {
        self.controller.resume()
    }

    pub fn stop(&self) {
        self.controller.stop();
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn set_speed(&self, speed: f64) -> f64 {
        self.controller.set_speed(speed)
    }

    // -- input, by name where a car is involved -----------------------------

    pub fn add_passenger(&self, origin: u32, destination: u32) -> Option<PassengerId> {
        self.controller.add_passenger(origin, destination)
    }

    /// Press the hall button at a floor.
    pub fn call_elevator(&self, floor: u32, direction: Direction) -> bool {
        self.controller.press_hall_button(floor, direction)
    }

    /// Press a destination button inside the named car.
    pub fn press_floor_button(&self, elevator: &str, floor: u32) -> bool {
        match self.elevator_id(elevator) {
            Some(id) => self.controller.press_elevator_button(id, floor),
            None => false,
        }
    }

    pub fn set_maintenance(&self, elevator: &str, on: bool) -> bool {
        self.elevator_id(elevator)
            .is_some_and(|id| self.controller.set_maintenance(id, on))
    }

    pub fn trigger_emergency(&self, elevator: &str) -> bool {
        self.elevator_id(elevator)
            .is_some_and(|id| self.controller.trigger_emergency(id))
    }

    pub fn release_emergency(&self, elevator: &str) -> bool {
        self.elevator_id(elevator)
            .is_some_and(|id| self.controller.release_emergency(id))
    }

    fn elevator_id(&self, name: &str) -> Option<ElevatorId> {
        self.building().elevator_by_name(name)
    }

    // -- traffic generation -------------------------------------------------

    /// Create `count` passengers right now with random distinct floors.
    /// Returns how many were created.
    pub fn spawn_random_passengers(&self, count: usize, seed: Option<u64>) -> usize {
        let mut rng = seeded(seed);
        let floors = self.building().num_floors();
        (0..count)
            .filter(|_| {
                let (origin, destination) = random_trip(&mut rng, floors);
                self.add_passenger(origin, destination).is_some()
            })
            .count()
    }

    /// Schedule a whole scenario's worth of arrivals. Returns how many were
    /// queued. The clock still has to be started for them to appear.
    pub fn schedule_scenario(&self, scenario: Scenario) -> usize {
        let mut rng = seeded(scenario.seed);
        let floors = self.building().num_floors();
        let spread = scenario.mean_interval.max(0.0) * 2.0;

        let mut at = 0.0;
        for _ in 0..scenario.passengers {
            if spread > 0.0 {
                at += rng.random_range(0.0..spread);
            }
            let (origin, destination) = match scenario.pattern {
                TrafficPattern::MorningRush => (1, rng.random_range(2..=floors)),
                TrafficPattern::EveningRush => (rng.random_range(2..=floors), 1),
                TrafficPattern::Interfloor => random_trip(&mut rng, floors),
            };
            self.controller.schedule_passenger(ScheduledArrival {
                at,
                origin,
                destination,
            });
        }
        info!(
            "scheduled {} passengers ({:?}, mean interval {}s)",
            scenario.passengers, scenario.pattern, scenario.mean_interval
        );
        scenario.passengers
    }

    // -- reporting ----------------------------------------------------------

    pub fn status(&self) -> SimStatus {
        self.controller.status()
    }

    pub fn metrics(&self) -> SystemMetrics {
        SystemMetrics::collect(self.building())
    }

    pub fn snapshot(&self) -> BuildingSnapshot {
        self.controller.snapshot()
    }

    pub fn add_observer<O>(&self, observer: O)
    where
        O: SimObserver + 'static,
    {
        self.controller.add_observer(observer);
    }

    pub fn report(&self) -> SimulationReport {
        let passengers = self.controller.passengers();
        let waits: Vec<f64> = passengers.iter().filter_map(|p| p.wait_time()).collect();
        let travels: Vec<f64> = passengers.iter().filter_map(|p| p.travel_time()).collect();

        SimulationReport {
            status: self.status(),
            metrics: self.metrics(),
            completed_trips: travels.len(),
            average_wait: mean(&waits),
            max_wait: waits.iter().copied().reduce(f64::max),
            average_travel: mean(&travels),
        }
    }
}

impl Drop for ElevatorSimulator {
    fn drop(&mut self) {
        self.controller.stop();
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn random_trip(rng: &mut StdRng, floors: u32) -> (u32, u32) {
    let origin = rng.random_range(1..=floors);
    let destination = loop {
        let candidate = rng.random_range(1..=floors);
        if candidate != origin {
            break candidate;
        }
    };
    (origin, destination)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
