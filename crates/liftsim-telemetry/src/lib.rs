//! Telemetry module for the Liftsim engine.
//!
//! Listens to core events (`PassengerCreated`, `PassengerBoarded`,
//! `PassengerArrived`, `DoorsOpened`, `CarArrived`, hall-call traffic) and
//! aggregates them into per-run and per-car service metrics. Also provides a
//! JSON-lines sink for the raw event feed.
//!
//! # Usage
//!
//! ```ignore
//! let recorder = Recorder::new();
//! sim.add_observer(recorder.clone());
//! // ... run the simulation ...
//! println!("{}", recorder.to_json().unwrap());
//! ```
//!
//! Both observers are best-effort: a failing sink logs once and goes quiet,
//! it never disturbs the tick loop.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use log::warn;
use serde::Serialize;

use liftsim_core::event::{EventRecord, SimEvent, SimObserver};
use liftsim_core::id::{ElevatorId, PassengerId};
use liftsim_core::snapshot::BuildingSnapshot;

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Running min/mean/max over observed samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Aggregate {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Aggregate {
    fn observe(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    fn summary(&self) -> StatSummary {
        StatSummary {
            count: self.count,
            min: if self.count == 0 { 0.0 } else { self.min },
            mean: if self.count == 0 {
                0.0
            } else {
                self.sum / self.count as f64
            },
            max: if self.count == 0 { 0.0 } else { self.max },
        }
    }
}

/// Summary of one timing distribution, in simulated seconds. All fields are
/// zero when `count` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatSummary {
    pub count: u64,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Per-car counters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct CarCounters {
    door_cycles: u64,
    floors_traveled: u64,
    passengers_boarded: u64,
    passengers_delivered: u64,
    service_outages: u64,
}

/// Per-car service counts over the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarReport {
    pub name: String,
    pub door_cycles: u64,
    pub floors_traveled: u64,
    pub passengers_boarded: u64,
    pub passengers_delivered: u64,
    pub service_outages: u64,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// End-of-run telemetry report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub ticks: u64,
    pub sim_time: f64,
    pub passengers_created: u64,
    pub hall_calls_pressed: u64,
    pub hall_calls_assigned: u64,
    pub hall_calls_rejected: u64,
    pub cab_calls_pressed: u64,
    pub wait: StatSummary,
    pub travel: StatSummary,
    pub cars: Vec<CarReport>,
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Inner {
    ticks: u64,
    sim_time: f64,
    passengers_created: u64,
    hall_calls_pressed: u64,
    hall_calls_assigned: u64,
    hall_calls_rejected: u64,
    cab_calls_pressed: u64,
    wait: Aggregate,
    travel: Aggregate,
    cars: HashMap<ElevatorId, CarCounters>,
    names: HashMap<ElevatorId, String>,
    created_at: HashMap<PassengerId, f64>,
    boarded_at: HashMap<PassengerId, f64>,
}

impl Inner {
    fn car(&mut self, id: ElevatorId) -> &mut CarCounters {
        self.cars.entry(id).or_default()
    }

    fn record(&mut self, record: &EventRecord) {
        match record.event {
            SimEvent::PassengerCreated { passenger, .. } => {
                self.passengers_created += 1;
                self.created_at.insert(passenger, record.time);
            }
            SimEvent::PassengerBoarded {
                passenger,
                elevator,
                ..
            } => {
                if let Some(created) = self.created_at.remove(&passenger) {
                    self.wait.observe(record.time - created);
                }
                self.boarded_at.insert(passenger, record.time);
                self.car(elevator).passengers_boarded += 1;
            }
            SimEvent::PassengerArrived {
                passenger,
                elevator,
                ..
            } => {
                if let Some(boarded) = self.boarded_at.remove(&passenger) {
                    self.travel.observe(record.time - boarded);
                }
                self.car(elevator).passengers_delivered += 1;
            }
            SimEvent::DoorsOpened { elevator, .. } => {
                self.car(elevator).door_cycles += 1;
            }
            SimEvent::CarArrived { elevator, .. } => {
                self.car(elevator).floors_traveled += 1;
            }
            SimEvent::CarOutOfService { elevator } => {
                self.car(elevator).service_outages += 1;
            }
            SimEvent::HallCallPressed { .. } => self.hall_calls_pressed += 1,
            SimEvent::HallCallAssigned { .. } => self.hall_calls_assigned += 1,
            SimEvent::HallCallRejected { .. } => self.hall_calls_rejected += 1,
            SimEvent::CabCallPressed { .. } => self.cab_calls_pressed += 1,
            SimEvent::DoorsClosed { .. } | SimEvent::CarReturnedToService { .. } => {}
        }
    }

    fn report(&self) -> Report {
        let mut cars: Vec<CarReport> = self
            .cars
            .iter()
            .map(|(id, c)| CarReport {
                name: self
                    .names
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| format!("{id:?}")),
                door_cycles: c.door_cycles,
                floors_traveled: c.floors_traveled,
                passengers_boarded: c.passengers_boarded,
                passengers_delivered: c.passengers_delivered,
                service_outages: c.service_outages,
            })
            .collect();
        cars.sort_by(|a, b| a.name.cmp(&b.name));

        Report {
            ticks: self.ticks,
            sim_time: self.sim_time,
            passengers_created: self.passengers_created,
            hall_calls_pressed: self.hall_calls_pressed,
            hall_calls_assigned: self.hall_calls_assigned,
            hall_calls_rejected: self.hall_calls_rejected,
            cab_calls_pressed: self.cab_calls_pressed,
            wait: self.wait.summary(),
            travel: self.travel.summary(),
            cars,
        }
    }
}

/// Aggregating observer. Clone one copy into the controller and keep the
/// other to read the report when the run is over.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Inner>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> Report {
        self.inner.lock().unwrap().report()
    }

    /// The report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.report())
    }
}

impl SimObserver for Recorder {
    fn on_tick(&mut self, snapshot: &BuildingSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.ticks += 1;
        inner.sim_time = snapshot.time;
        for car in &snapshot.elevators {
            inner
                .names
                .entry(car.id)
                .or_insert_with(|| car.name.clone());
        }
    }

    fn on_event(&mut self, record: &EventRecord) {
        self.inner.lock().unwrap().record(record);
    }
}

// ---------------------------------------------------------------------------
// JSON-lines sink
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum LogLine<'a> {
    Event(&'a EventRecord),
    Snapshot(&'a BuildingSnapshot),
}

/// Streams the raw feed as one JSON object per line: every event, plus an
/// optional periodic snapshot. The first write failure is logged and the
/// sink goes quiet; the simulation is never affected.
pub struct JsonLinesLog<W: Write + Send> {
    writer: W,
    snapshot_every: Option<u64>,
    ticks: u64,
    dead: bool,
}

impl<W: Write + Send> JsonLinesLog<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            snapshot_every: None,
            ticks: 0,
            dead: false,
        }
    }

    /// Also write a full snapshot line every `every` ticks.
    pub fn with_snapshots(mut self, every: u64) -> Self {
        self.snapshot_every = Some(every.max(1));
        self
    }

    fn write_line(&mut self, line: &LogLine<'_>) {
        if self.dead {
            return;
        }
        let result = serde_json::to_string(line)
            .map_err(std::io::Error::other)
            .and_then(|text| writeln!(self.writer, "{text}"));
        if let Err(e) = result {
            warn!("telemetry sink failed, disabling: {e}");
            self.dead = true;
        }
    }
}

impl<W: Write + Send> SimObserver for JsonLinesLog<W> {
    fn on_tick(&mut self, snapshot: &BuildingSnapshot) {
        self.ticks += 1;
        if let Some(every) = self.snapshot_every
            && self.ticks % every == 0
        {
            self.write_line(&LogLine::Snapshot(snapshot));
        }
    }

    fn on_event(&mut self, record: &EventRecord) {
        self.write_line(&LogLine::Event(record));
    }
}

// ===========================================================================
// Tests
// ===========================================================================
