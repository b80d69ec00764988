//! Selectable hall-call assignment algorithms.
//!
//! The building's own [`request_elevator`](crate::building::Building::request_elevator)
//! implements the nearest-car heuristic; the [`DispatchController`] wraps it
//! with a strategy chosen once at construction. All strategies answer one
//! question: which single car takes this `(floor, direction)` call. A call
//! is never routed to more than one car, and never to a car out of service.

use std::sync::Arc;

use log::{info, warn};

use crate::building::Building;
use crate::elevator::{CarState, Direction};
use crate::id::ElevatorId;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How hall calls are matched to cars. Chosen at controller construction,
/// never per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    /// Nearest available car, preferring idle cars, then same-direction ones.
    #[default]
    NearestCar,

    /// Classic elevator algorithm: strongly prefer a car already sweeping
    /// toward the call floor in the requested direction, then idle cars,
    /// then cars headed the wrong way.
    Scan,

    /// First in-service car in roster order, regardless of position.
    Fcfs,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Routes hall calls to cars using the configured strategy.
#[derive(Debug)]
pub struct DispatchController {
    building: Arc<Building>,
    strategy: DispatchStrategy,
}

impl DispatchController {
    pub fn new(building: Arc<Building>, strategy: DispatchStrategy) -> Self {
        info!("dispatch controller using {strategy:?}");
        Self { building, strategy }
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.strategy
    }

    /// Assign a hall call to exactly one car. Returns false when every car
    /// is out of service or the floor is invalid; the caller's floor button
    /// stays latched so the call can be retried.
    pub fn assign(&self, floor: u32, direction: Direction) -> bool {
        match self.strategy {
            DispatchStrategy::NearestCar => self.building.request_elevator(floor, direction),
            DispatchStrategy::Scan => self.assign_scan(floor, direction),
            DispatchStrategy::Fcfs => self.assign_fcfs(floor, direction),
        }
    }

    /// The car selected by the current strategy, without recording the call.
    /// Exposed for inspection and tests; `assign` is the mutating path.
    pub fn select(&self, floor: u32, direction: Direction) -> Option<ElevatorId> {
        match self.strategy {
            DispatchStrategy::NearestCar => self.building.find_best_elevator(floor, direction),
            DispatchStrategy::Scan => self.select_scan(floor, direction),
            DispatchStrategy::Fcfs => self.select_fcfs(),
        }
    }

    // -- SCAN ---------------------------------------------------------------

    fn assign_scan(&self, floor: u32, direction: Direction) -> bool {
        if !self.building.valid_floor(floor) {
            warn!("invalid floor request: {floor}");
            return false;
        }
        match self.select_scan(floor, direction) {
            Some(id) => self
                .building
                .elevator(id)
                .is_some_and(|car| car.lock().unwrap().add_hall_call(floor, direction)),
            None => false,
        }
    }

    /// Score every in-service car; lowest score wins, first-seen on ties.
    /// A car sweeping toward the floor in the requested direction gets a
    /// large bonus; a car sweeping away gets a penalty.
    fn select_scan(&self, floor: u32, direction: Direction) -> Option<ElevatorId> {
        let mut best: Option<(i64, ElevatorId)> = None;

        for &id in self.building.elevator_ids() {
            let car = self.building.elevator(id).unwrap().lock().unwrap();
            if !car.in_service() {
                continue;
            }

            let distance = i64::from(car.current_floor().abs_diff(floor));
            let approaching = car.direction() == Some(direction)
                && match direction {
                    Direction::Up => car.current_floor() < floor,
                    Direction::Down => car.current_floor() > floor,
                };

            let score = if approaching {
                distance - 100
            } else if car.state() == CarState::Idle {
                distance
            } else {
                distance + 50
            };

            if best.is_none_or(|(s, _)| score < s) {
                best = Some((score, id));
            }
        }

        best.map(|(_, id)| id)
    }

    // -- FCFS ---------------------------------------------------------------

    fn assign_fcfs(&self, floor: u32, direction: Direction) -> bool {
        if !self.building.valid_floor(floor) {
            warn!("invalid floor request: {floor}");
            return false;
        }
        match self.select_fcfs() {
            Some(id) => self
                .building
                .elevator(id)
                .is_some_and(|car| car.lock().unwrap().add_hall_call(floor, direction)),
            None => false,
        }
    }

    fn select_fcfs(&self) -> Option<ElevatorId> {
        self.building
            .elevator_ids()
            .iter()
            .copied()
            .find(|&id| {
                self.building
                    .elevator(id)
                    .is_some_and(|car| car.lock().unwrap().in_service())
            })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
