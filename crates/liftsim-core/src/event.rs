//! Discrete simulation events and the observer contract.
//!
//! Events describe things that happened during a tick (a car arrived, doors
//! opened, a passenger boarded). The controller stamps each one with the
//! simulated time and tick number, appends it to a bounded ring buffer, and
//! fans it out to registered observers. Observers also receive a full
//! [`BuildingSnapshot`](crate::snapshot::BuildingSnapshot) once per tick.
//!
//! The feed is fire-and-forget: a lost or failing consumer never affects
//! simulation state.

use crate::elevator::Direction;
use crate::id::{ElevatorId, PassengerId};
use crate::snapshot::BuildingSnapshot;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Something that happened in the simulated building.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum SimEvent {
    /// A hall button was pressed at a floor.
    HallCallPressed { floor: u32, direction: Direction },

    /// Dispatch routed a hall call to a specific car.
    HallCallAssigned {
        floor: u32,
        direction: Direction,
        elevator: ElevatorId,
    },

    /// Dispatch found no eligible car for a hall call.
    HallCallRejected { floor: u32, direction: Direction },

    /// A destination button was pressed inside a car.
    CabCallPressed { elevator: ElevatorId, floor: u32 },

    /// A car crossed a floor boundary.
    CarArrived { elevator: ElevatorId, floor: u32 },

    /// A car's doors finished opening.
    DoorsOpened { elevator: ElevatorId, floor: u32 },

    /// A car's doors finished closing.
    DoorsClosed { elevator: ElevatorId, floor: u32 },

    /// A new passenger entered the simulation.
    PassengerCreated {
        passenger: PassengerId,
        origin: u32,
        destination: u32,
    },

    /// A waiting passenger stepped into a car.
    PassengerBoarded {
        passenger: PassengerId,
        elevator: ElevatorId,
        floor: u32,
    },

    /// A riding passenger stepped out at their destination.
    PassengerArrived {
        passenger: PassengerId,
        elevator: ElevatorId,
        floor: u32,
    },

    /// An operator took a car out of service (maintenance or emergency).
    CarOutOfService { elevator: ElevatorId },

    /// An operator returned a car to service.
    CarReturnedToService { elevator: ElevatorId },
}

/// Discriminant-only view of [`SimEvent`], for counting and filtering
/// without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum EventKind {
    HallCallPressed,
    HallCallAssigned,
    HallCallRejected,
    CabCallPressed,
    CarArrived,
    DoorsOpened,
    DoorsClosed,
    PassengerCreated,
    PassengerBoarded,
    PassengerArrived,
    CarOutOfService,
    CarReturnedToService,
}

impl SimEvent {
    /// The kind discriminant for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::HallCallPressed { .. } => EventKind::HallCallPressed,
            SimEvent::HallCallAssigned { .. } => EventKind::HallCallAssigned,
            SimEvent::HallCallRejected { .. } => EventKind::HallCallRejected,
            SimEvent::CabCallPressed { .. } => EventKind::CabCallPressed,
            SimEvent::CarArrived { .. } => EventKind::CarArrived,
            SimEvent::DoorsOpened { .. } => EventKind::DoorsOpened,
            SimEvent::DoorsClosed { .. } => EventKind::DoorsClosed,
            SimEvent::PassengerCreated { .. } => EventKind::PassengerCreated,
            SimEvent::PassengerBoarded { .. } => EventKind::PassengerBoarded,
            SimEvent::PassengerArrived { .. } => EventKind::PassengerArrived,
            SimEvent::CarOutOfService { .. } => EventKind::CarOutOfService,
            SimEvent::CarReturnedToService { .. } => EventKind::CarReturnedToService,
        }
    }
}

/// An event stamped with when it happened.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EventRecord {
    /// Simulated seconds since the simulation started.
    pub time: f64,
    /// Tick number the event was produced in.
    pub tick: u64,
    pub event: SimEvent,
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer of stamped events. Fixed capacity; when full,
/// the oldest records are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    records: Vec<Option<EventRecord>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total records ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a ring buffer with the given capacity (0 is clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push a record. If the buffer is full, the oldest record is dropped.
    pub fn push(&mut self, record: EventRecord) {
        self.records[self.head] = Some(record);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total records written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of records dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.len as u64)
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head is the next write position, which is the oldest entry
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.records {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over an [`EventBuffer`], oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a EventRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let record = self.buffer.records[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        record
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// A consumer of per-tick snapshots and discrete events.
///
/// Both methods default to no-ops so implementors can subscribe to only the
/// stream they care about. Observers are invoked synchronously from the tick
/// loop and must not block it for long; a panicking observer is caught,
/// logged, and skipped for that tick.
pub trait SimObserver: Send {
    /// Called once per tick with an owned, immutable snapshot.
    fn on_tick(&mut self, snapshot: &BuildingSnapshot) {
        let _ = snapshot;
    }

    /// Called for each discrete event produced during a tick, after
    /// `on_tick` for that tick.
    fn on_event(&mut self, record: &EventRecord) {
        let _ = record;
    }
}

/// An observer that ignores everything. Useful as a placeholder in tests.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

// ===========================================================================
// Tests
// ===========================================================================
