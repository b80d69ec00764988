//! The per-car state machine: position, doors, direction, pending requests.
//!
//! An [`Elevator`] knows nothing about other cars, floors, or passengers
//! beyond the ids riding in it. It advances exclusively through
//! [`Elevator::step`], called once per tick by the building, and mutates
//! through the small request/boarding API. Every rejection is reported by
//! value; nothing here panics on bad input.
//!
//! # State machine
//!
//! ```text
//! Idle -> MovingUp / MovingDown -> DoorsOpening -> DoorsOpen -> DoorsClosing -> Idle
//!   \--------------------------------^ (request at the current floor)
//! ```
//!
//! `Maintenance` and `Emergency` are sink states entered through operator
//! actions. They suspend normal transitions and refuse new requests until
//! released.

use std::collections::BTreeSet;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::ConfigError;
use crate::event::SimEvent;
use crate::id::{ElevatorId, PassengerId};

// ---------------------------------------------------------------------------
// Timing constants
// ---------------------------------------------------------------------------

/// Simulated time for the doors to fully open or fully close.
pub const DOOR_OPERATION_TIME: Duration = Duration::from_secs(2);

/// Simulated time the doors dwell open before starting to close.
pub const DOOR_DWELL_TIME: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Direction and car state
// ---------------------------------------------------------------------------

/// Travel direction of a car or a hall call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// The opposite direction.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// The car's current phase. Doors are physically open only in `DoorsOpen`
/// and `DoorsClosing`; passenger transfer happens only in `DoorsOpen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CarState {
    Idle,
    MovingUp,
    MovingDown,
    DoorsOpening,
    DoorsOpen,
    DoorsClosing,
    Maintenance,
    Emergency,
}

impl CarState {
    /// True while the car is travelling between floors.
    pub fn is_moving(self) -> bool {
        matches!(self, CarState::MovingUp | CarState::MovingDown)
    }

    /// True for the three door phases of a stop.
    pub fn is_door_phase(self) -> bool {
        matches!(
            self,
            CarState::DoorsOpening | CarState::DoorsOpen | CarState::DoorsClosing
        )
    }

    /// False for the two operator-imposed sink states.
    pub fn in_service(self) -> bool {
        !matches!(self, CarState::Maintenance | CarState::Emergency)
    }
}

// ---------------------------------------------------------------------------
// Elevator
// ---------------------------------------------------------------------------

/// One elevator car.
///
/// Created once at building construction and never destroyed during a run;
/// maintenance and emergency are states, not deletions.
#[derive(Debug, Clone)]
pub struct Elevator {
    name: String,
    capacity: usize,
    min_floor: u32,
    max_floor: u32,
    /// Floors per second of simulated time.
    speed: f64,

    current_floor: u32,
    state: CarState,
    direction: Option<Direction>,
    occupants: Vec<PassengerId>,

    /// Destinations requested from inside the car.
    cab_calls: BTreeSet<u32>,
    /// Up-bound hall calls assigned to this car.
    up_calls: BTreeSet<u32>,
    /// Down-bound hall calls assigned to this car.
    down_calls: BTreeSet<u32>,

    door_timer: Duration,
    move_timer: Duration,
}

impl Elevator {
    /// Create a car. Fails if the capacity, speed, or starting floor is
    /// inconsistent with the given floor bounds.
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
        floor_bounds: (u32, u32),
        speed: f64,
        initial_floor: u32,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let (min_floor, max_floor) = floor_bounds;

        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity { elevator: name });
        }
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ConfigError::InvalidSpeed {
                elevator: name,
                speed,
            });
        }
        if initial_floor < min_floor || initial_floor > max_floor {
            return Err(ConfigError::InitialFloorOutOfRange {
                elevator: name,
                floor: initial_floor,
                max_floor,
            });
        }

        info!(
            "elevator '{name}' initialized: floors {min_floor}-{max_floor}, \
             capacity {capacity}, speed {speed} floors/s"
        );

        Ok(Self {
            name,
            capacity,
            min_floor,
            max_floor,
            speed,
            current_floor: initial_floor,
            state: CarState::Idle,
            direction: None,
            occupants: Vec::new(),
            cab_calls: BTreeSet::new(),
            up_calls: BTreeSet::new(),
            down_calls: BTreeSet::new(),
            door_timer: Duration::ZERO,
            move_timer: Duration::ZERO,
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current_floor(&self) -> u32 {
        self.current_floor
    }

    pub fn state(&self) -> CarState {
        self.state
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn floor_bounds(&self) -> (u32, u32) {
        (self.min_floor, self.max_floor)
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn occupants(&self) -> &[PassengerId] {
        &self.occupants
    }

    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    pub fn cab_calls(&self) -> &BTreeSet<u32> {
        &self.cab_calls
    }

    pub fn up_calls(&self) -> &BTreeSet<u32> {
        &self.up_calls
    }

    pub fn down_calls(&self) -> &BTreeSet<u32> {
        &self.down_calls
    }

    /// True once the doors have finished opening and until they finish
    /// closing again.
    pub fn door_open(&self) -> bool {
        matches!(self.state, CarState::DoorsOpen | CarState::DoorsClosing)
    }

    /// False while the operator has taken the car out of service.
    pub fn in_service(&self) -> bool {
        self.state.in_service()
    }

    fn valid_floor(&self, floor: u32) -> bool {
        floor >= self.min_floor && floor <= self.max_floor
    }

    fn floor_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.speed)
    }

    // -- requests -----------------------------------------------------------

    /// Record an in-car destination request. Rejects out-of-bounds floors
    /// and anything while out of service. A request for the current floor is
    /// dropped as a successful no-op.
    pub fn add_cab_call(&mut self, floor: u32) -> bool {
        if !self.state.in_service() || !self.valid_floor(floor) {
            return false;
        }
        if floor != self.current_floor {
            self.cab_calls.insert(floor);
            debug!("elevator '{}': cab call for floor {floor}", self.name);
        }
        true
    }

    /// Record a directional hall call assigned to this car by dispatch.
    pub fn add_hall_call(&mut self, floor: u32, direction: Direction) -> bool {
        if !self.state.in_service() || !self.valid_floor(floor) {
            return false;
        }
        match direction {
            Direction::Up => self.up_calls.insert(floor),
            Direction::Down => self.down_calls.insert(floor),
        };
        debug!(
            "elevator '{}': hall call floor {floor} {direction:?}",
            self.name
        );
        true
    }

    // -- boarding -----------------------------------------------------------

    /// Admit a passenger and record their destination as a cab call.
    /// Rejects when full, when the destination is out of bounds, or when the
    /// passenger is already aboard.
    pub fn board(&mut self, passenger: PassengerId, destination: u32) -> bool {
        if self.occupants.len() >= self.capacity {
            warn!("elevator '{}' is at capacity", self.name);
            return false;
        }
        if !self.valid_floor(destination) {
            warn!(
                "elevator '{}': invalid destination floor {destination}",
                self.name
            );
            return false;
        }
        if self.occupants.contains(&passenger) {
            return false;
        }

        self.occupants.push(passenger);
        self.cab_calls.insert(destination);
        info!(
            "passenger {passenger} boarded elevator '{}', destination floor {destination}",
            self.name
        );
        true
    }

    /// Remove a passenger from the car. Returns false for an unknown id.
    pub fn disembark(&mut self, passenger: PassengerId) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|p| *p != passenger);
        let removed = self.occupants.len() != before;
        if removed {
            info!("passenger {passenger} exited elevator '{}'", self.name);
        }
        removed
    }

    // -- operator actions ---------------------------------------------------

    /// Put the car into (or take it out of) maintenance. Entering cancels
    /// assigned hall calls so dispatch can route them elsewhere, but keeps
    /// occupants and their cab calls for after release. Emergency takes
    /// precedence and cannot be cleared through this path.
    ///
    /// Returns whether the car is in the requested service mode afterwards.
    pub fn set_maintenance(&mut self, on: bool) -> bool {
        match (on, self.state) {
            (_, CarState::Emergency) => false,
            (true, CarState::Maintenance) => true,
            (true, _) => {
                self.halt_out_of_service(CarState::Maintenance);
                info!("elevator '{}' taken out for maintenance", self.name);
                true
            }
            (false, CarState::Maintenance) => {
                self.state = CarState::Idle;
                info!("elevator '{}' back in service", self.name);
                true
            }
            (false, _) => true,
        }
    }

    /// Hard-stop the car. Overrides every other state including maintenance.
    pub fn trigger_emergency(&mut self) {
        if self.state != CarState::Emergency {
            self.halt_out_of_service(CarState::Emergency);
            warn!("elevator '{}': emergency stop", self.name);
        }
    }

    /// Release an emergency stop. Returns false if the car was not stopped.
    pub fn release_emergency(&mut self) -> bool {
        if self.state == CarState::Emergency {
            self.state = CarState::Idle;
            info!("elevator '{}': emergency released", self.name);
            true
        } else {
            false
        }
    }

    fn halt_out_of_service(&mut self, state: CarState) {
        self.state = state;
        self.direction = None;
        self.up_calls.clear();
        self.down_calls.clear();
        self.door_timer = Duration::ZERO;
        self.move_timer = Duration::ZERO;
    }

    // -- tick ---------------------------------------------------------------

    /// Advance the state machine by `dt` of simulated time. Called at most
    /// once per tick per car, by the building. Transition events are pushed
    /// onto `events` for the controller to stamp and deliver.
    pub fn step(&mut self, id: ElevatorId, dt: Duration, events: &mut Vec<SimEvent>) {
        match self.state {
            CarState::Idle => self.step_idle(),
            CarState::MovingUp => self.step_moving(id, Direction::Up, dt, events),
            CarState::MovingDown => self.step_moving(id, Direction::Down, dt, events),
            CarState::DoorsOpening => self.step_doors_opening(id, dt, events),
            CarState::DoorsOpen => self.step_doors_open(dt),
            CarState::DoorsClosing => self.step_doors_closing(id, dt, events),
            CarState::Maintenance | CarState::Emergency => {}
        }
    }

    fn step_idle(&mut self) {
        let Some(target) = self.next_destination() else {
            return;
        };
        if target > self.current_floor {
            self.direction = Some(Direction::Up);
            self.state = CarState::MovingUp;
            self.move_timer = Duration::ZERO;
        } else if target < self.current_floor {
            self.direction = Some(Direction::Down);
            self.state = CarState::MovingDown;
            self.move_timer = Duration::ZERO;
        } else {
            // A call at the car's own floor: open without moving.
            self.begin_stop(None);
        }
    }

    fn step_moving(&mut self, id: ElevatorId, dir: Direction, dt: Duration, events: &mut Vec<SimEvent>) {
        // A car at its terminal floor cannot continue; requests beyond the
        // bounds are rejected on entry, so this only fires if the request
        // sets changed under it mid-flight.
        let at_terminal = match dir {
            Direction::Up => self.current_floor >= self.max_floor,
            Direction::Down => self.current_floor <= self.min_floor,
        };
        if at_terminal {
            self.state = CarState::Idle;
            self.direction = None;
            return;
        }

        self.move_timer += dt;
        if self.move_timer < self.floor_interval() {
            return;
        }
        self.move_timer = Duration::ZERO;

        self.current_floor = match dir {
            Direction::Up => self.current_floor + 1,
            Direction::Down => self.current_floor - 1,
        };
        events.push(SimEvent::CarArrived {
            elevator: id,
            floor: self.current_floor,
        });

        if self.should_stop_here(dir) {
            // Keep the lantern lit while the sweep continues; boarding uses
            // it to take only same-direction riders.
            let continuing = self.has_calls_beyond(dir).then_some(dir);
            self.begin_stop(continuing);
        } else if !self.has_calls_beyond(dir) {
            self.state = CarState::Idle;
            self.direction = None;
        }
    }

    fn step_doors_opening(&mut self, id: ElevatorId, dt: Duration, events: &mut Vec<SimEvent>) {
        self.door_timer += dt;
        if self.door_timer >= DOOR_OPERATION_TIME {
            self.state = CarState::DoorsOpen;
            self.door_timer = Duration::ZERO;
            self.clear_calls_at_current_floor();
            events.push(SimEvent::DoorsOpened {
                elevator: id,
                floor: self.current_floor,
            });
        }
    }

    fn step_doors_open(&mut self, dt: Duration) {
        self.door_timer += dt;
        if self.door_timer >= DOOR_DWELL_TIME {
            self.state = CarState::DoorsClosing;
            self.door_timer = Duration::ZERO;
        }
    }

    fn step_doors_closing(&mut self, id: ElevatorId, dt: Duration, events: &mut Vec<SimEvent>) {
        self.door_timer += dt;
        if self.door_timer >= DOOR_OPERATION_TIME {
            self.state = CarState::Idle;
            self.direction = None;
            self.door_timer = Duration::ZERO;
            events.push(SimEvent::DoorsClosed {
                elevator: id,
                floor: self.current_floor,
            });
        }
    }

    fn begin_stop(&mut self, continuing: Option<Direction>) {
        self.state = CarState::DoorsOpening;
        self.door_timer = Duration::ZERO;
        self.direction = continuing;
    }

    /// Nearest requested floor, ties broken toward the lowest floor number.
    fn next_destination(&self) -> Option<u32> {
        self.all_calls()
            .min_by_key(|f| (self.current_floor.abs_diff(*f), *f))
    }

    /// A cab call always stops the car; a hall call only in the direction
    /// the car is travelling. Opposite-direction hall calls are picked up
    /// later, once the car goes idle or turns around.
    fn should_stop_here(&self, dir: Direction) -> bool {
        if self.cab_calls.contains(&self.current_floor) {
            return true;
        }
        match dir {
            Direction::Up => self.up_calls.contains(&self.current_floor),
            Direction::Down => self.down_calls.contains(&self.current_floor),
        }
    }

    fn clear_calls_at_current_floor(&mut self) {
        self.cab_calls.remove(&self.current_floor);
        self.up_calls.remove(&self.current_floor);
        self.down_calls.remove(&self.current_floor);
    }

    fn has_calls_beyond(&self, dir: Direction) -> bool {
        match dir {
            Direction::Up => self.all_calls().any(|f| f > self.current_floor),
            Direction::Down => self.all_calls().any(|f| f < self.current_floor),
        }
    }

    fn all_calls(&self) -> impl Iterator<Item = u32> + '_ {
        self.cab_calls
            .iter()
            .chain(self.up_calls.iter())
            .chain(self.down_calls.iter())
            .copied()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
