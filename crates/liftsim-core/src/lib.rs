//! Liftsim Core -- the simulation engine for multi-elevator buildings.
//!
//! This crate provides the car state machine, floor call queues, passenger
//! journeys, dispatch strategies, the fixed-rate simulation loop, and the
//! snapshot/event surfaces that every Liftsim embedding depends on.
//!
//! # Tick Pipeline
//!
//! Each call to [`controller::SimulationController::tick_once`] advances the
//! simulation by one scheduler pass through the following phases:
//!
//! 1. **Clock** -- Convert elapsed wall time to simulated time at the
//!    configured speed.
//! 2. **Arrivals** -- Release scheduled passengers whose time has come.
//! 3. **Recovery** -- Re-dispatch lit hall buttons that no in-service car
//!    still holds.
//! 4. **Motion** -- Step every car's state machine by the elapsed interval.
//! 5. **Transfer** -- Exchange passengers at cars standing with open doors.
//! 6. **Observers** -- Snapshot the building and deliver buffered events.
//!
//! # Locking
//!
//! Every car and every floor sits behind its own mutex, so concurrent
//! callers touching different entities never contend. External entry points
//! hold at most one entity lock at a time; only the tick thread nests, and
//! always in car -> floor -> roster order.
//!
//! # Key Types
//!
//! - [`controller::SimulationController`] -- Clock, worker thread, and tick
//!   pipeline orchestrator.
//! - [`building::Building`] -- Validated fleet of cars plus one call-button
//!   pair per floor.
//! - [`elevator::Elevator`] -- Eight-state car: idle, motion, door phases,
//!   maintenance, and emergency.
//! - [`dispatch::DispatchController`] -- Pluggable hall-call assignment:
//!   nearest-car, scan, or first-come-first-served.
//! - [`passenger::Passenger`] -- Waiting / riding / arrived journey with
//!   wait and travel timings.
//! - [`simulator::ElevatorSimulator`] -- Name-based facade and seeded
//!   traffic generation.
//! - [`event::SimObserver`] -- Per-tick snapshot and event callbacks,
//!   panic-isolated.

pub mod building;
pub mod clock;
pub mod controller;
pub mod dispatch;
pub mod elevator;
pub mod error;
pub mod event;
pub mod floor;
pub mod id;
pub mod metrics;
pub mod passenger;
pub mod simulator;
pub mod snapshot;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
