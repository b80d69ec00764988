//! Headless Liftsim runner.
//!
//! Loads a building configuration (RON, TOML, or JSON; falls back to the
//! bundled sample), runs the simulation in real time for a fixed wall-clock
//! duration, and prints the telemetry report as JSON.
//!
//! Run with: `cargo run -p liftsim-demo -- [CONFIG] [--duration SECS]
//! [--speed MULT] [--events PATH]`
//!
//! `--init PATH` writes the bundled sample config to `PATH` and exits.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::thread;
use std::time::{Duration, Instant};

use log::{LevelFilter, info};

use liftsim_data::builder::{build_simulator, sample_config, simulator_from_file, write_sample_config};
use liftsim_telemetry::{JsonLinesLog, Recorder};

const USAGE: &str = "usage: liftsim-demo [CONFIG] [--duration SECS] [--speed MULT] \
[--events PATH] [--init PATH]";

struct Args {
    config: Option<PathBuf>,
    init: Option<PathBuf>,
    events: Option<PathBuf>,
    duration: Duration,
    speed: Option<f64>,
}

fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = parse_args();

    if let Some(path) = &args.init {
        if let Err(e) = write_sample_config(path) {
            eprintln!("cannot write sample config: {e}");
            exit(1);
        }
        println!("wrote sample config to {}", path.display());
        return;
    }

    let sim = match &args.config {
        Some(path) => simulator_from_file(path),
        None => build_simulator(&sample_config()),
    };
    let sim = match sim {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("cannot build simulation: {e}");
            exit(1);
        }
    };
    if let Some(speed) = args.speed {
        sim.set_speed(speed);
    }

    let recorder = Recorder::new();
    sim.add_observer(recorder.clone());
    if let Some(path) = &args.events {
        sim.add_observer(event_log(path));
    }

    let building = sim.building();
    println!(
        "=== Liftsim: '{}' -- {} floors, {} cars, speed x{} ===\n",
        building.id(),
        building.num_floors(),
        building.elevator_count(),
        sim.status().speed,
    );

    sim.start();
    let started = Instant::now();
    loop {
        let elapsed = started.elapsed();
        if elapsed >= args.duration {
            break;
        }
        thread::sleep((args.duration - elapsed).min(Duration::from_secs(1)));
        let snap = sim.snapshot();
        println!(
            "t={:6.1}s  tick={:5}  waiting={:3}  riding={:3}  arrived={:3}",
            snap.time, snap.tick, snap.waiting_passengers, snap.riding_passengers,
            snap.arrived_passengers,
        );
    }
    sim.stop();

    println!("\n=== Telemetry report ===\n");
    match recorder.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("cannot render report: {e}"),
    }

    let report = recorder.report();
    let delivered: u64 = report.cars.iter().map(|c| c.passengers_delivered).sum();
    info!(
        "run complete: {} passengers created, {delivered} delivered, {} ticks ({:.1}s simulated)",
        report.passengers_created, report.ticks, report.sim_time,
    );
}

fn event_log(path: &Path) -> JsonLinesLog<BufWriter<File>> {
    match File::create(path) {
        Ok(file) => JsonLinesLog::new(BufWriter::new(file)).with_snapshots(50),
        Err(e) => {
            eprintln!("cannot open event log {}: {e}", path.display());
            exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        init: None,
        events: None,
        duration: Duration::from_secs(20),
        speed: None,
    };
    let mut raw = std::env::args().skip(1);
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--duration" => {
                let secs = number(raw.next(), "--duration");
                if secs > 86_400.0 {
                    fail("--duration is capped at 86400 seconds");
                }
                args.duration = Duration::from_secs_f64(secs);
            }
            "--speed" => args.speed = Some(number(raw.next(), "--speed")),
            "--events" => args.events = Some(path(raw.next(), "--events")),
            "--init" => args.init = Some(path(raw.next(), "--init")),
            "--help" | "-h" => {
                println!("{USAGE}");
                exit(0);
            }
            _ if arg.starts_with('-') => fail(&format!("unknown flag '{arg}'")),
            _ => {
                if args.config.is_some() {
                    fail("only one config path is accepted");
                }
                args.config = Some(PathBuf::from(arg));
            }
        }
    }
    args
}

fn fail(msg: &str) -> ! {
    eprintln!("{msg}\n{USAGE}");
    exit(2);
}

fn number(value: Option<String>, flag: &str) -> f64 {
    let Some(value) = value else {
        fail(&format!("{flag} needs a value"));
    };
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => fail(&format!("{flag} needs a positive number, got '{value}'")),
    }
}

fn path(value: Option<String>, flag: &str) -> PathBuf {
    let Some(value) = value else {
        fail(&format!("{flag} needs a path"));
    };
    PathBuf::from(value)
}
