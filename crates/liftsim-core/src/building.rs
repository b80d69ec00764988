//! The building: owns every car and floor, validates construction, and
//! advances all cars one tick.
//!
//! Cars and floors each sit behind their own mutex so an external call
//! touching one elevator never serializes behind updates to another. The
//! tick loop is the only caller of [`Building::update`]; everything else is
//! a short single-entity critical section.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use log::{info, warn};
use slotmap::SlotMap;

use crate::elevator::{CarState, Direction, Elevator};
use crate::error::ConfigError;
use crate::event::SimEvent;
use crate::floor::Floor;
use crate::id::ElevatorId;

// ---------------------------------------------------------------------------
// Construction input
// ---------------------------------------------------------------------------

/// Parameters for one car, as supplied by the configuration layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevatorConfig {
    pub name: String,
    pub capacity: usize,
    /// Floors per second.
    pub speed: f64,
    pub initial_floor: u32,
}

impl ElevatorConfig {
    /// A car with the conventional defaults: 8 riders, 2 floors/s, floor 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: 8,
            speed: 2.0,
            initial_floor: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// A building with `num_floors` floors (numbered from 1) and a fixed roster
/// of cars, each spanning the full floor range.
#[derive(Debug)]
pub struct Building {
    id: String,
    num_floors: u32,
    elevators: SlotMap<ElevatorId, Mutex<Elevator>>,
    /// Roster order: dispatch tie-breaks and FCFS follow configuration order.
    order: Vec<ElevatorId>,
    by_name: HashMap<String, ElevatorId>,
    /// Index 0 holds floor 1.
    floors: Vec<Mutex<Floor>>,
}

impl Building {
    /// Validate the configuration and construct the building. Every car's
    /// floor bounds are `[1, num_floors]`.
    pub fn new(
        id: impl Into<String>,
        num_floors: u32,
        cars: &[ElevatorConfig],
    ) -> Result<Self, ConfigError> {
        let id = id.into();

        if num_floors < 2 {
            return Err(ConfigError::TooFewFloors {
                building: id,
                floors: num_floors,
            });
        }
        if cars.is_empty() {
            return Err(ConfigError::NoElevators { building: id });
        }

        let mut elevators = SlotMap::with_key();
        let mut order = Vec::with_capacity(cars.len());
        let mut by_name = HashMap::with_capacity(cars.len());

        for cfg in cars {
            if by_name.contains_key(&cfg.name) {
                return Err(ConfigError::DuplicateElevator {
                    elevator: cfg.name.clone(),
                });
            }
            let car = Elevator::new(
                &cfg.name,
                cfg.capacity,
                (1, num_floors),
                cfg.speed,
                cfg.initial_floor,
            )?;
            let key = elevators.insert(Mutex::new(car));
            order.push(key);
            by_name.insert(cfg.name.clone(), key);
        }

        let floors = (1..=num_floors).map(|n| Mutex::new(Floor::new(n))).collect();

        info!(
            "building '{id}' initialized with {} elevators and {num_floors} floors",
            order.len()
        );

        Ok(Self {
            id,
            num_floors,
            elevators,
            order,
            by_name,
            floors,
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn num_floors(&self) -> u32 {
        self.num_floors
    }

    pub fn elevator_count(&self) -> usize {
        self.order.len()
    }

    /// Car ids in roster (configuration) order.
    pub fn elevator_ids(&self) -> &[ElevatorId] {
        &self.order
    }

    pub fn elevator(&self, id: ElevatorId) -> Option<&Mutex<Elevator>> {
        self.elevators.get(id)
    }

    pub fn elevator_by_name(&self, name: &str) -> Option<ElevatorId> {
        self.by_name.get(name).copied()
    }

    pub fn floor(&self, number: u32) -> Option<&Mutex<Floor>> {
        if !self.valid_floor(number) {
            return None;
        }
        self.floors.get((number - 1) as usize)
    }

    pub fn valid_floor(&self, number: u32) -> bool {
        number >= 1 && number <= self.num_floors
    }

    /// Whether a hall call in `direction` makes sense at `floor`: the top
    /// floor has no up button and the bottom floor no down button.
    pub fn valid_hall_call(&self, floor: u32, direction: Direction) -> bool {
        self.valid_floor(floor)
            && match direction {
                Direction::Up => floor < self.num_floors,
                Direction::Down => floor > 1,
            }
    }

    // -- dispatch (default heuristic) ---------------------------------------

    /// Route a hall call to the best available car and record it there.
    /// This is the building's default nearest-car heuristic; the dispatch
    /// controller layers the selectable algorithms on top.
    pub fn request_elevator(&self, floor: u32, direction: Direction) -> bool {
        if !self.valid_floor(floor) {
            warn!("invalid floor request: {floor}");
            return false;
        }

        let Some(best) = self.find_best_elevator(floor, direction) else {
            warn!("no available elevator for floor {floor} going {direction:?}");
            return false;
        };

        let mut car = self.elevators[best].lock().unwrap();
        let ok = car.add_hall_call(floor, direction);
        if ok {
            info!(
                "hall call floor {floor} {direction:?} assigned to '{}'",
                car.name()
            );
        }
        ok
    }

    /// Nearest-car selection: prefer idle cars, then cars already moving in
    /// the requested direction, then anything else in service; ties broken
    /// by distance, then roster order.
    pub fn find_best_elevator(&self, floor: u32, direction: Direction) -> Option<ElevatorId> {
        let mut best: Option<(u8, u32, ElevatorId)> = None;

        for &id in &self.order {
            let car = self.elevators[id].lock().unwrap();
            if !car.in_service() {
                continue;
            }
            let distance = car.current_floor().abs_diff(floor);
            let priority = if car.state() == CarState::Idle {
                2
            } else if car.direction() == Some(direction) {
                1
            } else {
                0
            };
            let better = match best {
                None => true,
                Some((bp, bd, _)) => priority > bp || (priority == bp && distance < bd),
            };
            if better {
                best = Some((priority, distance, id));
            }
        }

        best.map(|(_, _, id)| id)
    }

    // -- operator actions ---------------------------------------------------

    /// Toggle maintenance on a car. Returns whether the car is now in the
    /// requested mode; false for an unknown id or an emergency-stopped car.
    pub fn set_maintenance(&self, id: ElevatorId, on: bool) -> bool {
        match self.elevators.get(id) {
            Some(car) => car.lock().unwrap().set_maintenance(on),
            None => false,
        }
    }

    /// Emergency-stop a car. Returns false for an unknown id.
    pub fn trigger_emergency(&self, id: ElevatorId) -> bool {
        match self.elevators.get(id) {
            Some(car) => {
                car.lock().unwrap().trigger_emergency();
                true
            }
            None => false,
        }
    }

    /// Release an emergency stop. Returns false for an unknown id or a car
    /// that was not emergency-stopped.
    pub fn release_emergency(&self, id: ElevatorId) -> bool {
        match self.elevators.get(id) {
            Some(car) => car.lock().unwrap().release_emergency(),
            None => false,
        }
    }

    // -- tick ---------------------------------------------------------------

    /// Advance every car by `dt`. Called once per tick by the controller;
    /// locks each car only for the duration of its own step.
    pub fn update(&self, dt: Duration, events: &mut Vec<SimEvent>) {
        for &id in &self.order {
            self.elevators[id].lock().unwrap().step(id, dt, events);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
