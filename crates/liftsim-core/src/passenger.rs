//! Passenger identity and journey tracking.
//!
//! A passenger is an immutable `(origin, destination)` pair plus a journey
//! state that only the simulation controller advances: `Waiting` at a floor,
//! `InElevator` riding a car, `Arrived` at the destination. Timestamps are
//! simulated seconds, so wait and travel statistics are unaffected by pause
//! or speed changes.

use log::debug;

use crate::elevator::Direction;
use crate::id::{ElevatorId, PassengerId};

// ---------------------------------------------------------------------------
// Journey state
// ---------------------------------------------------------------------------

/// Where a passenger is in their journey. Progression is strictly
/// Waiting -> InElevator -> Arrived; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum PassengerState {
    /// Queued at the origin floor.
    Waiting,
    /// Riding the identified car.
    InElevator(ElevatorId),
    /// Delivered; retained in the roster for reporting.
    Arrived,
}

// ---------------------------------------------------------------------------
// Passenger
// ---------------------------------------------------------------------------

/// One passenger in the simulation roster.
#[derive(Debug, Clone)]
pub struct Passenger {
    id: PassengerId,
    origin: u32,
    destination: u32,
    state: PassengerState,

    /// Simulated second the passenger appeared at the origin floor.
    created_at: f64,
    boarded_at: Option<f64>,
    arrived_at: Option<f64>,
}

impl Passenger {
    pub fn new(id: PassengerId, origin: u32, destination: u32, created_at: f64) -> Self {
        debug!("passenger {id} created: {origin} -> {destination}");
        Self {
            id,
            origin,
            destination,
            state: PassengerState::Waiting,
            created_at,
            boarded_at: None,
            arrived_at: None,
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn id(&self) -> PassengerId {
        self.id
    }

    pub fn origin(&self) -> u32 {
        self.origin
    }

    pub fn destination(&self) -> u32 {
        self.destination
    }

    pub fn state(&self) -> PassengerState {
        self.state
    }

    /// The car the passenger is currently riding, if any.
    pub fn elevator(&self) -> Option<ElevatorId> {
        match self.state {
            PassengerState::InElevator(id) => Some(id),
            _ => None,
        }
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn boarded_at(&self) -> Option<f64> {
        self.boarded_at
    }

    pub fn arrived_at(&self) -> Option<f64> {
        self.arrived_at
    }

    /// True when the destination lies above the origin.
    pub fn wants_up(&self) -> bool {
        self.destination > self.origin
    }

    /// The hall-call direction this passenger needs.
    pub fn direction(&self) -> Direction {
        if self.wants_up() {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    // -- journey transitions (controller only) ------------------------------

    /// Mark the passenger as riding `elevator` as of simulated time `now`.
    pub fn board(&mut self, elevator: ElevatorId, now: f64) {
        self.state = PassengerState::InElevator(elevator);
        self.boarded_at = Some(now);
        debug!("passenger {} boarded at t={now:.1}", self.id);
    }

    /// Mark the passenger as delivered as of simulated time `now`.
    pub fn arrive(&mut self, now: f64) {
        self.state = PassengerState::Arrived;
        self.arrived_at = Some(now);
        debug!("passenger {} arrived at t={now:.1}", self.id);
    }

    // -- derived statistics --------------------------------------------------

    /// Simulated seconds spent waiting at the origin floor, once boarded.
    pub fn wait_time(&self) -> Option<f64> {
        self.boarded_at.map(|t| t - self.created_at)
    }

    /// Simulated seconds spent riding, once arrived.
    pub fn travel_time(&self) -> Option<f64> {
        match (self.boarded_at, self.arrived_at) {
            (Some(b), Some(a)) => Some(a - b),
            _ => None,
        }
    }

    /// Simulated seconds from creation to arrival.
    pub fn total_time(&self) -> Option<f64> {
        self.arrived_at.map(|t| t - self.created_at)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ride_id() -> ElevatorId {
        ElevatorId::default()
    }

    // -----------------------------------------------------------------------
    // Test 1: new_passenger_is_waiting
    // -----------------------------------------------------------------------
    #[test]
    fn new_passenger_is_waiting() {
        let p = Passenger::new(PassengerId(1), 1, 8, 0.0);
        assert_eq!(p.state(), PassengerState::Waiting);
        assert_eq!(p.elevator(), None);
        assert!(p.wants_up());
        assert_eq!(p.direction(), Direction::Up);
        assert_eq!(p.wait_time(), None);
        assert_eq!(p.travel_time(), None);
        assert_eq!(p.total_time(), None);
    }

    // -----------------------------------------------------------------------
    // Test 2: downward_journey_direction
    // -----------------------------------------------------------------------
    #[test]
    fn downward_journey_direction() {
        let p = Passenger::new(PassengerId(2), 9, 2, 0.0);
        assert!(!p.wants_up());
        assert_eq!(p.direction(), Direction::Down);
    }

    // -----------------------------------------------------------------------
    // Test 3: journey_progression_and_times
    // -----------------------------------------------------------------------
    #[test]
    fn journey_progression_and_times() {
        let mut p = Passenger::new(PassengerId(3), 1, 8, 10.0);

        p.board(ride_id(), 14.5);
        assert_eq!(p.state(), PassengerState::InElevator(ride_id()));
        assert_eq!(p.elevator(), Some(ride_id()));
        assert_eq!(p.wait_time(), Some(4.5));
        assert_eq!(p.travel_time(), None);

        p.arrive(22.0);
        assert_eq!(p.state(), PassengerState::Arrived);
        assert_eq!(p.elevator(), None);
        assert_eq!(p.wait_time(), Some(4.5));
        assert_eq!(p.travel_time(), Some(7.5));
        assert_eq!(p.total_time(), Some(12.0));
    }
}
