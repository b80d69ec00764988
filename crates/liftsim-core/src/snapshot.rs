//! Owned, serializable snapshots of the whole simulation.
//!
//! Observers never see live entities. Once per tick the controller captures
//! a [`BuildingSnapshot`] -- locking each car and floor just long enough to
//! copy its fields -- and hands the copy out. By the time an observer runs,
//! every lock has been released, so a slow or panicking observer cannot
//! stall or poison the simulation.

use crate::building::Building;
use crate::clock::{ClockState, SimClock};
use crate::elevator::{CarState, Direction};
use crate::id::{ElevatorId, PassengerId};
use crate::passenger::{Passenger, PassengerState};

// ---------------------------------------------------------------------------
// Per-entity snapshots
// ---------------------------------------------------------------------------

/// Copy of one car's externally visible state.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ElevatorSnapshot {
    pub id: ElevatorId,
    pub name: String,
    pub current_floor: u32,
    pub state: CarState,
    pub direction: Option<Direction>,
    pub door_open: bool,
    pub capacity: usize,
    /// Riders aboard, sorted by id for stable output.
    pub occupants: Vec<PassengerId>,
    pub cab_calls: Vec<u32>,
    pub up_calls: Vec<u32>,
    pub down_calls: Vec<u32>,
}

/// Copy of one floor's call buttons and queue depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct FloorSnapshot {
    pub number: u32,
    pub up_pressed: bool,
    pub down_pressed: bool,
    pub waiting_up: usize,
    pub waiting_down: usize,
}

// ---------------------------------------------------------------------------
// Building snapshot
// ---------------------------------------------------------------------------

/// Everything an observer may want to know about one tick.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BuildingSnapshot {
    /// Simulated seconds since start.
    pub time: f64,
    pub tick: u64,
    pub clock: ClockState,
    pub speed: f64,
    pub building: String,
    pub num_floors: u32,
    pub elevators: Vec<ElevatorSnapshot>,
    pub floors: Vec<FloorSnapshot>,
    pub waiting_passengers: usize,
    pub riding_passengers: usize,
    pub arrived_passengers: usize,
}

impl BuildingSnapshot {
    /// Capture the current state. Locks each entity briefly, one at a time;
    /// must not be called while already holding a car or floor lock.
    pub fn capture(
        building: &Building,
        passengers: &[Passenger],
        clock: &SimClock,
        tick: u64,
    ) -> Self {
        let elevators = building
            .elevator_ids()
            .iter()
            .map(|&id| {
                let car = building.elevator(id).unwrap().lock().unwrap();
                let mut occupants = car.occupants().to_vec();
                occupants.sort_unstable();
                ElevatorSnapshot {
                    id,
                    name: car.name().to_owned(),
                    current_floor: car.current_floor(),
                    state: car.state(),
                    direction: car.direction(),
                    door_open: car.door_open(),
                    capacity: car.capacity(),
                    occupants,
                    cab_calls: car.cab_calls().iter().copied().collect(),
                    up_calls: car.up_calls().iter().copied().collect(),
                    down_calls: car.down_calls().iter().copied().collect(),
                }
            })
            .collect();

        let floors = (1..=building.num_floors())
            .map(|n| {
                let floor = building.floor(n).unwrap().lock().unwrap();
                FloorSnapshot {
                    number: n,
                    up_pressed: floor.button_pressed(Direction::Up),
                    down_pressed: floor.button_pressed(Direction::Down),
                    waiting_up: floor.queue(Direction::Up).len(),
                    waiting_down: floor.queue(Direction::Down).len(),
                }
            })
            .collect();

        let mut waiting = 0;
        let mut riding = 0;
        let mut arrived = 0;
        for p in passengers {
            match p.state() {
                PassengerState::Waiting => waiting += 1,
                PassengerState::InElevator(_) => riding += 1,
                PassengerState::Arrived => arrived += 1,
            }
        }

        Self {
            time: clock.sim_time(),
            tick,
            clock: clock.state(),
            speed: clock.speed(),
            building: building.id().to_owned(),
            num_floors: building.num_floors(),
            elevators,
            floors,
            waiting_passengers: waiting,
            riding_passengers: riding,
            arrived_passengers: arrived,
        }
    }

    pub fn elevator(&self, name: &str) -> Option<&ElevatorSnapshot> {
        self.elevators.iter().find(|e| e.name == name)
    }

    pub fn floor(&self, number: u32) -> Option<&FloorSnapshot> {
        self.floors.iter().find(|f| f.number == number)
    }

    /// Total riders across all cars.
    pub fn riders_aboard(&self) -> usize {
        self.elevators.iter().map(|e| e.occupants.len()).sum()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
