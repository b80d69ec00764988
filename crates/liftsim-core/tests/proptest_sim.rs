//! Property-based tests for the Liftsim core engine.
//!
//! Uses proptest to generate random buildings and operation sequences,
//! then verify structural invariants hold on every tick.

use std::collections::HashMap;
use std::sync::Arc;

use liftsim_core::building::{Building, ElevatorConfig};
use liftsim_core::controller::{ScheduledArrival, SimulationController};
use liftsim_core::dispatch::DispatchStrategy;
use liftsim_core::elevator::{CarState, Direction};
use liftsim_core::id::PassengerId;
use liftsim_core::passenger::PassengerState;
use liftsim_core::test_utils::TickClock;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// A random valid building: 2..=12 floors and 1..=3 cars with assorted
/// capacities, speeds, and parking floors.
fn arb_controller() -> impl Strategy<Value = Arc<SimulationController>> {
    (
        2..=12u32,
        proptest::collection::vec((1..=8usize, 1u8..=4, 1..=12u32), 1..=3),
        0..3u8,
    )
        .prop_map(|(floors, cars, strategy)| {
            let configs: Vec<ElevatorConfig> = cars
                .iter()
                .enumerate()
                .map(|(i, &(capacity, speed_q, floor))| {
                    let mut config = ElevatorConfig::new(&format!("car-{}", i + 1));
                    config.capacity = capacity;
                    config.speed = f64::from(speed_q);
                    config.initial_floor = 1 + (floor - 1) % floors;
                    config
                })
                .collect();
            let strategy = match strategy {
                0 => DispatchStrategy::NearestCar,
                1 => DispatchStrategy::Scan,
                _ => DispatchStrategy::Fcfs,
            };
            let building = Building::new("prop", floors, &configs).unwrap();
            Arc::new(SimulationController::new(Arc::new(building), strategy))
        })
}

/// External operations thrown at the controller between ticks.
#[derive(Debug, Clone)]
enum SimOp {
    HallCall(u32, bool),
    CabCall(usize, u32),
    AddPassenger(u32, u32),
    Maintenance(usize, bool),
    Emergency(usize),
    Release(usize),
    SetSpeed(f64),
    Tick(u8),
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<SimOp>> {
    proptest::collection::vec(
        prop_oneof![
            (1..=12u32, any::<bool>()).prop_map(|(f, up)| SimOp::HallCall(f, up)),
            (0..3usize, 1..=12u32).prop_map(|(e, f)| SimOp::CabCall(e, f)),
            (1..=12u32, 1..=12u32).prop_map(|(o, d)| SimOp::AddPassenger(o, d)),
            (0..3usize, any::<bool>()).prop_map(|(e, on)| SimOp::Maintenance(e, on)),
            (0..3usize).prop_map(SimOp::Emergency),
            (0..3usize).prop_map(SimOp::Release),
            (0.01..20.0f64).prop_map(SimOp::SetSpeed),
            (1..10u8).prop_map(SimOp::Tick),
        ],
        1..=max_ops,
    )
}

fn apply(ctrl: &SimulationController, clock: &mut TickClock, op: &SimOp) {
    let floors = ctrl.building().num_floors();
    let ids = ctrl.building().elevator_ids();
    match *op {
        SimOp::HallCall(floor, up) => {
            let direction = if up { Direction::Up } else { Direction::Down };
            ctrl.press_hall_button(1 + (floor - 1) % floors, direction);
        }
        SimOp::CabCall(car, floor) => {
            ctrl.press_elevator_button(ids[car % ids.len()], 1 + (floor - 1) % floors);
        }
        SimOp::AddPassenger(origin, destination) => {
            ctrl.add_passenger(1 + (origin - 1) % floors, 1 + (destination - 1) % floors);
        }
        SimOp::Maintenance(car, on) => {
            ctrl.set_maintenance(ids[car % ids.len()], on);
        }
        SimOp::Emergency(car) => {
            ctrl.trigger_emergency(ids[car % ids.len()]);
        }
        SimOp::Release(car) => {
            ctrl.release_emergency(ids[car % ids.len()]);
        }
        SimOp::SetSpeed(speed) => {
            ctrl.set_speed(speed);
        }
        SimOp::Tick(n) => {
            clock.run(ctrl, u64::from(n));
        }
    }
}

fn check_structural_invariants(ctrl: &SimulationController) -> Result<(), TestCaseError> {
    let snap = ctrl.snapshot();
    let roster: HashMap<PassengerId, _> = ctrl
        .passengers()
        .into_iter()
        .map(|p| (p.id(), p))
        .collect();

    let mut aboard = 0;
    for car in &snap.elevators {
        prop_assert!(
            car.occupants.len() <= car.capacity,
            "{} holds {} riders, capacity {}",
            car.name,
            car.occupants.len(),
            car.capacity
        );
        prop_assert!(
            (1..=snap.num_floors).contains(&car.current_floor),
            "{} left the shaft at floor {}",
            car.name,
            car.current_floor
        );
        let door_phase = matches!(
            car.state,
            CarState::DoorsOpening | CarState::DoorsOpen | CarState::DoorsClosing
        );
        prop_assert_eq!(car.door_open, door_phase, "door open outside a door phase");

        for pid in &car.occupants {
            let rider = &roster[pid];
            prop_assert!(
                matches!(rider.state(), PassengerState::InElevator(_)),
                "{} listed aboard {} but is {:?}",
                pid,
                car.name,
                rider.state()
            );
            prop_assert_eq!(rider.elevator(), Some(car.id));
        }
        aboard += car.occupants.len();
    }
    prop_assert_eq!(aboard, snap.riding_passengers);
    prop_assert_eq!(
        snap.waiting_passengers + snap.riding_passengers + snap.arrived_passengers,
        roster.len()
    );
    Ok(())
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Capacity, floor bounds, door/motion exclusivity, and occupant/roster
    /// agreement hold after every operation and every tick.
    #[test]
    fn invariants_hold_under_random_ops(ctrl in arb_controller(), ops in arb_ops(30)) {
        let mut clock = TickClock::new();
        ctrl.start_clock_at(clock.origin());

        for op in &ops {
            apply(&ctrl, &mut clock, op);
            check_structural_invariants(&ctrl)?;
        }
        clock.run(&ctrl, 50);
        check_structural_invariants(&ctrl)?;
    }

    /// No hall call is ever held by two cars at once, no matter what
    /// sequence of presses, maintenance shedding, and recovery ran.
    #[test]
    fn hall_calls_are_never_double_assigned(ctrl in arb_controller(), ops in arb_ops(30)) {
        let mut clock = TickClock::new();
        ctrl.start_clock_at(clock.origin());

        for op in &ops {
            apply(&ctrl, &mut clock, op);
            let snap = ctrl.snapshot();
            for floor in 1..=snap.num_floors {
                let up_holders = snap.elevators.iter()
                    .filter(|e| e.up_calls.contains(&floor))
                    .count();
                let down_holders = snap.elevators.iter()
                    .filter(|e| e.down_calls.contains(&floor))
                    .count();
                prop_assert!(up_holders <= 1, "floor {} up held by {} cars", floor, up_holders);
                prop_assert!(down_holders <= 1, "floor {} down held by {} cars", floor, down_holders);
            }
        }
    }

    /// A passenger's journey only moves forward: Waiting -> InElevator ->
    /// Arrived, never backwards.
    #[test]
    fn passenger_progress_is_monotonic(ctrl in arb_controller(), ops in arb_ops(30)) {
        fn rank(state: PassengerState) -> u8 {
            match state {
                PassengerState::Waiting => 0,
                PassengerState::InElevator(_) => 1,
                PassengerState::Arrived => 2,
            }
        }

        let mut clock = TickClock::new();
        ctrl.start_clock_at(clock.origin());
        let mut last_rank: HashMap<PassengerId, u8> = HashMap::new();

        for op in &ops {
            apply(&ctrl, &mut clock, op);
            for p in ctrl.passengers() {
                let rank = rank(p.state());
                let previous = last_rank.entry(p.id()).or_insert(rank);
                prop_assert!(
                    rank >= *previous,
                    "{} regressed from {} to {}",
                    p.id(),
                    previous,
                    rank
                );
                *previous = rank;
            }
        }
    }

    /// The speed setter clamps into [0.1, 10.0] and paused clocks never
    /// accumulate simulated time.
    #[test]
    fn speed_clamps_and_pause_freezes_time(
        ctrl in arb_controller(),
        speed in -5.0..50.0f64,
        paused_ticks in 1..20u64,
    ) {
        let effective = ctrl.set_speed(speed);
        prop_assert!((0.1..=10.0).contains(&effective));
        prop_assert_eq!(ctrl.speed(), effective);

        let mut clock = TickClock::new();
        ctrl.start_clock_at(clock.origin());
        clock.run(&ctrl, 3);
        let frozen = ctrl.sim_time();

        ctrl.pause();
        clock.run(&ctrl, paused_ticks);
        prop_assert_eq!(ctrl.sim_time(), frozen);
    }

    /// Scheduled arrivals are kept sorted regardless of insertion order, and
    /// all of them eventually join the roster.
    #[test]
    fn scheduled_arrivals_stay_sorted_and_release(
        ctrl in arb_controller(),
        times in proptest::collection::vec(0.0..5.0f64, 1..10),
    ) {
        let floors = ctrl.building().num_floors();
        for &at in &times {
            ctrl.schedule_passenger(ScheduledArrival { at, origin: 1, destination: floors });
        }

        let queued = ctrl.arrival_queue();
        prop_assert!(queued.windows(2).all(|w| w[0].at <= w[1].at));

        let mut clock = TickClock::new();
        ctrl.start_clock_at(clock.origin());
        clock.run(&ctrl, 60);
        prop_assert_eq!(ctrl.pending_arrivals(), 0);
        prop_assert_eq!(ctrl.passengers().len(), times.len());
    }

    /// With no maintenance or emergencies, every passenger is eventually
    /// delivered: the system never starves a trip.
    #[test]
    fn traffic_always_drains(
        ctrl in arb_controller(),
        trips in proptest::collection::vec((1..=12u32, 1..=12u32), 1..=6),
    ) {
        let floors = ctrl.building().num_floors();
        let mut clock = TickClock::new();
        ctrl.start_clock_at(clock.origin());

        let mut expected = 0;
        for &(origin, destination) in &trips {
            let origin = 1 + (origin - 1) % floors;
            let destination = 1 + (destination - 1) % floors;
            if ctrl.add_passenger(origin, destination).is_some() {
                expected += 1;
            }
        }

        let drained = (0..10_000).any(|_| {
            clock.step(&ctrl);
            ctrl.status().arrived_passengers == expected
        });
        prop_assert!(drained, "{} trips never all arrived", expected);
    }
}
