//! The simulation controller: clock, tick loop, passengers, observers.
//!
//! One controller drives one building. It owns the scaled clock, the
//! passenger roster, the scheduled-arrival queue, the event buffer, and the
//! observer list; the building and its entities stay passive. A tick is:
//!
//! 1. release scheduled arrivals that have come due,
//! 2. advance every car by the scaled interval,
//! 3. transfer passengers through any doors standing open,
//! 4. snapshot and notify observers, then stamp and deliver events.
//!
//! [`SimulationController::start`] spawns a worker thread that runs a tick
//! roughly every 100 ms of wall time; [`SimulationController::tick_once`] is
//! the same heartbeat exposed for callers that drive their own loop. All
//! public operations are safe to call from any thread while the worker runs:
//! each entity sits behind its own lock, and only the tick path ever holds
//! more than one at a time.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, bounded, select};
use log::{debug, error, info, warn};

use crate::building::Building;
use crate::clock::{ClockState, SimClock};
use crate::dispatch::{DispatchController, DispatchStrategy};
use crate::elevator::{CarState, Direction, Elevator};
use crate::event::{EventBuffer, EventRecord, SimEvent, SimObserver};
use crate::id::{ElevatorId, PassengerId};
use crate::passenger::Passenger;
use crate::snapshot::BuildingSnapshot;

/// Wall-clock cadence of the background tick loop.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Ring capacity of the retained event history.
pub const EVENT_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// Scheduled arrivals
// ---------------------------------------------------------------------------

/// A passenger due to appear at a given simulated time.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScheduledArrival {
    /// Simulated seconds after start.
    pub at: f64,
    pub origin: u32,
    pub destination: u32,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Point-in-time summary of the controller itself.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SimStatus {
    pub clock: ClockState,
    pub speed: f64,
    pub sim_time: f64,
    pub tick: u64,
    pub total_passengers: usize,
    pub arrived_passengers: usize,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct Worker {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

pub struct SimulationController {
    building: Arc<Building>,
    dispatch: DispatchController,
    clock: Mutex<SimClock>,
    ticks: AtomicU64,

    passengers: Mutex<Vec<Passenger>>,
    next_passenger: AtomicU32,
    arrivals: Mutex<VecDeque<ScheduledArrival>>,

    observers: Mutex<Vec<Box<dyn SimObserver>>>,
    events: Mutex<EventBuffer>,

    worker: Mutex<Option<Worker>>,
}

impl SimulationController {
    pub fn new(building: Arc<Building>, strategy: DispatchStrategy) -> Self {
        let dispatch = DispatchController::new(Arc::clone(&building), strategy);
        info!(
            "controller ready for building '{}' ({} cars, {} floors)",
            building.id(),
            building.elevator_count(),
            building.num_floors()
        );
        Self {
            building,
            dispatch,
            clock: Mutex::new(SimClock::new()),
            ticks: AtomicU64::new(0),
            passengers: Mutex::new(Vec::new()),
            next_passenger: AtomicU32::new(1),
            arrivals: Mutex::new(VecDeque::new()),
            observers: Mutex::new(Vec::new()),
            events: Mutex::new(EventBuffer::new(EVENT_CAPACITY)),
            worker: Mutex::new(None),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn building(&self) -> &Arc<Building> {
        &self.building
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.dispatch.strategy()
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.lock().unwrap().state()
    }

    pub fn is_running(&self) -> bool {
        self.clock.lock().unwrap().is_running()
    }

    pub fn sim_time(&self) -> f64 {
        self.clock.lock().unwrap().sim_time()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Owned copy of the roster, in creation order.
    pub fn passengers(&self) -> Vec<Passenger> {
        self.passengers.lock().unwrap().clone()
    }

    pub fn passenger(&self, id: PassengerId) -> Option<Passenger> {
        self.passengers
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    pub fn pending_arrivals(&self) -> usize {
        self.arrivals.lock().unwrap().len()
    }

    /// Owned copy of the not-yet-released arrivals, soonest first.
    pub fn arrival_queue(&self) -> Vec<ScheduledArrival> {
        self.arrivals.lock().unwrap().iter().cloned().collect()
    }

    /// Owned copy of the retained event history, oldest first.
    pub fn recent_events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().iter().cloned().collect()
    }

    /// Events produced over the whole run, including any that have already
    /// rotated out of the retained history.
    pub fn total_events(&self) -> u64 {
        self.events.lock().unwrap().total_written()
    }

    pub fn status(&self) -> SimStatus {
        let (clock, speed, sim_time) = {
            let clock = self.clock.lock().unwrap();
            (clock.state(), clock.speed(), clock.sim_time())
        };
        let (total, arrived) = {
            let roster = self.passengers.lock().unwrap();
            let arrived = roster.iter().filter(|p| p.arrived_at().is_some()).count();
            (roster.len(), arrived)
        };
        SimStatus {
            clock,
            speed,
            sim_time,
            tick: self.tick_count(),
            total_passengers: total,
            arrived_passengers: arrived,
        }
    }

    /// Capture a full snapshot outside the observer path.
    pub fn snapshot(&self) -> BuildingSnapshot {
        let roster = self.passengers.lock().unwrap();
        let clock = self.clock.lock().unwrap();
        BuildingSnapshot::capture(&self.building, &roster, &clock, self.tick_count())
    }

    pub fn add_observer<O>(&self, observer: O)
    where
        O: SimObserver + 'static,
    {
        self.observers.lock().unwrap().push(Box::new(observer));
    }

    // -- clock control ------------------------------------------------------

    /// Start the simulation and spawn the background tick loop. False if a
    /// worker is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut slot = self.worker.lock().unwrap();
        if slot.is_some() {
            return false;
        }
        if !self.clock.lock().unwrap().start(Instant::now()) {
            return false;
        }
        self.ticks.store(0, Ordering::Relaxed);

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ctrl = Arc::clone(self);
        let join = thread::spawn(move || {
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    default(TICK_INTERVAL) => {
                        ctrl.tick_once(Instant::now());
                    }
                }
            }
            debug!("tick worker exited");
        });

        *slot = Some(Worker { stop_tx, join });
        info!("simulation started");
        true
    }

    /// Pause the clock; the worker keeps polling but ticks are skipped.
    /// Pausing an already-paused simulation is a no-op returning false.
    pub fn pause(&self) -> bool {
        let ok = self.clock.lock().unwrap().pause();
        if ok {
            info!("simulation paused");
        }
        ok
    }

    /// Resume from a pause. Wall time spent paused is not simulated.
    pub fn resume(&self) -> bool {
        let ok = self.clock.lock().unwrap().resume(Instant::now());
        if ok {
            info!("simulation resumed");
        }
        ok
    }

    /// Stop the clock and join the worker. Safe to call repeatedly, and
    /// before any start. Must not be called from an observer.
    pub fn stop(&self) {
        let worker = self.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.join();
            info!("simulation stopped");
        }
        self.clock.lock().unwrap().stop();
    }

    /// Set the speed multiplier, clamped to the permitted range. Returns the
    /// effective value.
    pub fn set_speed(&self, speed: f64) -> f64 {
        self.clock.lock().unwrap().set_speed(speed)
    }

    pub fn speed(&self) -> f64 {
        self.clock.lock().unwrap().speed()
    }

    // -- passenger and call input -------------------------------------------

    /// Create a passenger at `origin` headed for `destination`, queue them
    /// at the floor, and dispatch their hall call. Returns `None` for an
    /// out-of-range floor or a trip that starts where it ends.
    pub fn add_passenger(&self, origin: u32, destination: u32) -> Option<PassengerId> {
        let mut pending = Vec::new();
        let id = self.spawn_passenger(origin, destination, &mut pending);
        self.deliver(pending);
        id
    }

    /// Queue a passenger to appear once the simulated clock reaches `at`.
    pub fn schedule_passenger(&self, arrival: ScheduledArrival) {
        let mut queue = self.arrivals.lock().unwrap();
        let idx = queue.partition_point(|a| a.at <= arrival.at);
        queue.insert(idx, arrival);
    }

    /// Press the hall button at a floor. True if the call is registered
    /// (newly assigned, or already latched); false for an invalid floor or
    /// when no car can take it, in which case the button stays latched.
    pub fn press_hall_button(&self, floor: u32, direction: Direction) -> bool {
        if !self.building.valid_hall_call(floor, direction) {
            warn!("invalid hall call: floor {floor} {direction:?}");
            return false;
        }
        let Some(floor_lock) = self.building.floor(floor) else {
            return false;
        };
        let fresh = floor_lock.lock().unwrap().press_button(direction);

        let mut pending = Vec::new();
        let ok = if fresh {
            pending.push(SimEvent::HallCallPressed { floor, direction });
            self.assign_hall_call(floor, direction, &mut pending)
        } else {
            true
        };
        self.deliver(pending);
        ok
    }

    /// Press a destination button inside a car. False for an unknown car,
    /// an out-of-range floor, or a car out of service.
    pub fn press_elevator_button(&self, id: ElevatorId, floor: u32) -> bool {
        let Some(car) = self.building.elevator(id) else {
            return false;
        };
        let ok = car.lock().unwrap().add_cab_call(floor);
        if ok {
            self.deliver(vec![SimEvent::CabCallPressed {
                elevator: id,
                floor,
            }]);
        }
        ok
    }

    // -- operator actions ---------------------------------------------------

    /// Put a car into (or release it from) maintenance. Hall calls the car
    /// was holding are re-dispatched to the rest of the fleet.
    pub fn set_maintenance(&self, id: ElevatorId, on: bool) -> bool {
        let Some(car) = self.building.elevator(id) else {
            return false;
        };
        let (was_in_service, shed) = {
            let car = car.lock().unwrap();
            (car.in_service(), if on { hall_calls_of(&car) } else { Vec::new() })
        };

        let ok = self.building.set_maintenance(id, on);
        let mut pending = Vec::new();
        if ok && on && was_in_service {
            pending.push(SimEvent::CarOutOfService { elevator: id });
            for (floor, direction) in shed {
                self.assign_hall_call(floor, direction, &mut pending);
            }
        } else if ok && !on && !was_in_service {
            pending.push(SimEvent::CarReturnedToService { elevator: id });
        }
        self.deliver(pending);
        ok
    }

    /// Hard-stop a car. Hall calls it was holding are re-dispatched.
    pub fn trigger_emergency(&self, id: ElevatorId) -> bool {
        let Some(car) = self.building.elevator(id) else {
            return false;
        };
        let (was_in_service, shed) = {
            let car = car.lock().unwrap();
            (car.in_service(), hall_calls_of(&car))
        };

        if !self.building.trigger_emergency(id) {
            return false;
        }
        let mut pending = Vec::new();
        if was_in_service {
            pending.push(SimEvent::CarOutOfService { elevator: id });
            for (floor, direction) in shed {
                self.assign_hall_call(floor, direction, &mut pending);
            }
        }
        self.deliver(pending);
        true
    }

    /// Release an emergency stop. False if the car was not stopped.
    pub fn release_emergency(&self, id: ElevatorId) -> bool {
        let ok = self.building.release_emergency(id);
        if ok {
            self.deliver(vec![SimEvent::CarReturnedToService { elevator: id }]);
        }
        ok
    }

    // -- tick ---------------------------------------------------------------

    /// Run one tick against the given wall instant. Returns false when the
    /// clock is not running. The worker calls this on its own cadence; it is
    /// public for embedders (and tests) that drive their own loop.
    pub fn tick_once(&self, now: Instant) -> bool {
        let dt = self.clock.lock().unwrap().tick(now);
        let Some(dt) = dt else {
            return false;
        };

        let mut pending = Vec::new();
        self.release_due_arrivals(&mut pending);
        self.resolve_orphaned_calls(&mut pending);
        self.building.update(dt, &mut pending);
        self.transfer_passengers(&mut pending);

        self.notify_tick();
        self.deliver(pending);

        self.ticks.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn release_due_arrivals(&self, pending: &mut Vec<SimEvent>) {
        let now = self.clock.lock().unwrap().sim_time();
        loop {
            let next = {
                let mut queue = self.arrivals.lock().unwrap();
                match queue.front() {
                    Some(a) if a.at <= now => queue.pop_front(),
                    _ => None,
                }
            };
            let Some(arrival) = next else {
                break;
            };
            self.spawn_passenger(arrival.origin, arrival.destination, pending);
        }
    }

    fn spawn_passenger(
        &self,
        origin: u32,
        destination: u32,
        pending: &mut Vec<SimEvent>,
    ) -> Option<PassengerId> {
        if origin == destination {
            warn!("rejecting trip from floor {origin} to itself");
            return None;
        }
        if !self.building.valid_floor(origin) || !self.building.valid_floor(destination) {
            warn!("rejecting trip {origin} -> {destination}: floor out of range");
            return None;
        }

        let id = PassengerId(self.next_passenger.fetch_add(1, Ordering::Relaxed));
        let now = self.clock.lock().unwrap().sim_time();
        let passenger = Passenger::new(id, origin, destination, now);
        let direction = passenger.direction();
        self.passengers.lock().unwrap().push(passenger);
        pending.push(SimEvent::PassengerCreated {
            passenger: id,
            origin,
            destination,
        });

        let fresh = {
            let Some(floor) = self.building.floor(origin) else {
                return None;
            };
            let mut floor = floor.lock().unwrap();
            floor.enqueue(id, direction);
            floor.press_button(direction)
        };
        if fresh {
            pending.push(SimEvent::HallCallPressed {
                floor: origin,
                direction,
            });
            self.assign_hall_call(origin, direction, pending);
        }

        info!("passenger {id} created: floor {origin} -> {destination}");
        Some(id)
    }

    /// Route one hall call through the dispatch strategy and record it on
    /// the chosen car. Never called while holding an entity lock.
    fn assign_hall_call(
        &self,
        floor: u32,
        direction: Direction,
        pending: &mut Vec<SimEvent>,
    ) -> bool {
        let assigned = self.dispatch.select(floor, direction).and_then(|id| {
            let car = self.building.elevator(id)?;
            let mut car = car.lock().unwrap();
            if car.add_hall_call(floor, direction) {
                info!(
                    "hall call floor {floor} {direction:?} assigned to '{}'",
                    car.name()
                );
                Some(id)
            } else {
                None
            }
        });
        match assigned {
            Some(elevator) => {
                pending.push(SimEvent::HallCallAssigned {
                    floor,
                    direction,
                    elevator,
                });
                true
            }
            None => {
                warn!("hall call floor {floor} {direction:?} has no eligible car");
                pending.push(SimEvent::HallCallRejected { floor, direction });
                false
            }
        }
    }

    /// Move passengers through every door standing fully open: arrivals
    /// step out first, then the floor queues board in order, direction
    /// matched and capacity respected. A served button is cleared only once
    /// its queue is empty; riders left behind a full car keep it latched,
    /// and the orphan sweep re-dispatches the call.
    fn transfer_passengers(&self, pending: &mut Vec<SimEvent>) {
        let now = self.clock.lock().unwrap().sim_time();

        for &id in self.building.elevator_ids() {
            let Some(car_lock) = self.building.elevator(id) else {
                continue;
            };
            let mut car = car_lock.lock().unwrap();
            if car.state() != CarState::DoorsOpen {
                continue;
            }
            let at = car.current_floor();
            let Some(floor_lock) = self.building.floor(at) else {
                continue;
            };
            let mut floor = floor_lock.lock().unwrap();
            let mut roster = self.passengers.lock().unwrap();

            for pid in car.occupants().to_vec() {
                let Some(p) = roster.iter_mut().find(|p| p.id() == pid) else {
                    continue;
                };
                if p.destination() == at && car.disembark(pid) {
                    p.arrive(now);
                    pending.push(SimEvent::PassengerArrived {
                        passenger: pid,
                        elevator: id,
                        floor: at,
                    });
                }
            }

            let committed = car.direction();
            for direction in [Direction::Up, Direction::Down] {
                if committed.is_some_and(|d| d != direction) {
                    continue;
                }

                while let Some(pid) = floor.queue(direction).front().copied() {
                    if car.occupant_count() >= car.capacity() {
                        break;
                    }
                    floor.remove_waiting(pid);
                    let Some(p) = roster.iter_mut().find(|p| p.id() == pid) else {
                        continue;
                    };
                    if car.board(pid, p.destination()) {
                        p.board(id, now);
                        pending.push(SimEvent::PassengerBoarded {
                            passenger: pid,
                            elevator: id,
                            floor: at,
                        });
                    }
                }

                if floor.queue(direction).is_empty() {
                    floor.clear_button(direction);
                }
            }
        }
    }

    /// Re-dispatch lit buttons that no in-service car is holding. Calls go
    /// astray when the assigned car is pulled from service or opens its
    /// doors while full; the sweep runs every tick and restores them. A pick
    /// that would be futile -- the chosen car is standing full at the very
    /// floor -- is skipped and retried once the car has moved on.
    fn resolve_orphaned_calls(&self, pending: &mut Vec<SimEvent>) {
        for floor_no in 1..=self.building.num_floors() {
            for direction in [Direction::Up, Direction::Down] {
                let lit = self
                    .building
                    .floor(floor_no)
                    .is_some_and(|f| f.lock().unwrap().button_pressed(direction));
                if !lit || self.call_is_held(floor_no, direction) {
                    continue;
                }

                let Some(id) = self.dispatch.select(floor_no, direction) else {
                    continue;
                };
                let Some(car_lock) = self.building.elevator(id) else {
                    continue;
                };
                let mut car = car_lock.lock().unwrap();
                let futile = car.current_floor() == floor_no
                    && !car.state().is_moving()
                    && car.occupant_count() >= car.capacity();
                if futile {
                    continue;
                }
                if car.add_hall_call(floor_no, direction) {
                    debug!(
                        "orphaned call floor {floor_no} {direction:?} re-assigned to '{}'",
                        car.name()
                    );
                    pending.push(SimEvent::HallCallAssigned {
                        floor: floor_no,
                        direction,
                        elevator: id,
                    });
                }
            }
        }
    }

    fn call_is_held(&self, floor: u32, direction: Direction) -> bool {
        self.building.elevator_ids().iter().any(|&id| {
            let Some(car) = self.building.elevator(id) else {
                return false;
            };
            let car = car.lock().unwrap();
            car.in_service()
                && match direction {
                    Direction::Up => car.up_calls().contains(&floor),
                    Direction::Down => car.down_calls().contains(&floor),
                }
        })
    }

    fn notify_tick(&self) {
        let snapshot = {
            let roster = self.passengers.lock().unwrap();
            let clock = self.clock.lock().unwrap();
            BuildingSnapshot::capture(&self.building, &roster, &clock, self.tick_count())
        };
        let mut observers = self.observers.lock().unwrap();
        for observer in observers.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| observer.on_tick(&snapshot))).is_err() {
                error!("observer panicked in on_tick; continuing");
            }
        }
    }

    /// Stamp and fan out events, then retain them in the ring buffer.
    fn deliver(&self, pending: Vec<SimEvent>) {
        if pending.is_empty() {
            return;
        }
        let time = self.clock.lock().unwrap().sim_time();
        let tick = self.tick_count();

        let mut observers = self.observers.lock().unwrap();
        let mut buffer = self.events.lock().unwrap();
        for event in pending {
            let record = EventRecord { time, tick, event };
            for observer in observers.iter_mut() {
                if catch_unwind(AssertUnwindSafe(|| observer.on_event(&record))).is_err() {
                    error!("observer panicked in on_event; continuing");
                }
            }
            buffer.push(record);
        }
    }

    // -- test hooks ---------------------------------------------------------

    /// Start the clock without spawning the worker, for callers that drive
    /// [`tick_once`](Self::tick_once) themselves with fabricated instants.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn start_clock_at(&self, now: Instant) -> bool {
        let ok = self.clock.lock().unwrap().start(now);
        if ok {
            self.ticks.store(0, Ordering::Relaxed);
        }
        ok
    }

    /// Resume at a fabricated instant.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn resume_at(&self, now: Instant) -> bool {
        self.clock.lock().unwrap().resume(now)
    }
}

impl std::fmt::Debug for SimulationController {
    // Observers are trait objects, so Debug cannot be derived; report the
    // lock-free identity fields only.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationController")
            .field("building", &self.building.id())
            .field("strategy", &self.dispatch.strategy())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Drop for SimulationController {
    fn drop(&mut self) {
        // The worker holds an Arc to the controller, so by the time drop
        // runs it has already exited; this is for the clock state only.
        self.clock.lock().unwrap().stop();
    }
}

fn hall_calls_of(car: &Elevator) -> Vec<(u32, Direction)> {
    car.up_calls()
        .iter()
        .map(|&f| (f, Direction::Up))
        .chain(car.down_calls().iter().map(|&f| (f, Direction::Down)))
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
