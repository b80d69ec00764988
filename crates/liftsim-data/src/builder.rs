//! Resolution from schema structs into engine types.
//!
//! Produces a ready-to-start [`ElevatorSimulator`] with the fleet, dispatch
//! strategy, clock speed, scripted arrivals, and generated traffic all wired
//! in. Also owns the sample config used by `--init` style tooling.

use std::path::Path;

use liftsim_core::building::{Building, ElevatorConfig};
use liftsim_core::controller::ScheduledArrival;
use liftsim_core::dispatch::DispatchStrategy;
use liftsim_core::simulator::{ElevatorSimulator, Scenario, TrafficPattern};

use crate::loader::{DataLoadError, Format, detect_format, load_sim_config};
use crate::schema::{
    ArrivalSpec, BuildingSpec, DispatchSpec, ElevatorSpec, PatternSpec, ScenarioSpec, SimConfig,
    SimParams,
};

// ===========================================================================
// Mapping
// ===========================================================================

pub fn dispatch_strategy(spec: DispatchSpec) -> DispatchStrategy {
    match spec {
        DispatchSpec::NearestCar => DispatchStrategy::NearestCar,
        DispatchSpec::Scan => DispatchStrategy::Scan,
        DispatchSpec::Fcfs => DispatchStrategy::Fcfs,
    }
}

pub fn traffic_pattern(spec: PatternSpec) -> TrafficPattern {
    match spec {
        PatternSpec::MorningRush => TrafficPattern::MorningRush,
        PatternSpec::EveningRush => TrafficPattern::EveningRush,
        PatternSpec::Interfloor => TrafficPattern::Interfloor,
    }
}

/// Resolve the fleet description into engine configs.
pub fn elevator_configs(spec: &BuildingSpec) -> Vec<ElevatorConfig> {
    spec.elevators
        .iter()
        .map(|e| {
            let mut config = ElevatorConfig::new(&e.name);
            config.capacity = e.capacity;
            config.speed = e.speed;
            config.initial_floor = e.initial_floor;
            config
        })
        .collect()
}

// ===========================================================================
// Building
// ===========================================================================

pub fn build_building(config: &SimConfig) -> Result<Building, DataLoadError> {
    let configs = elevator_configs(&config.building);
    Ok(Building::new(
        &config.building.name,
        config.building.floors,
        &configs,
    )?)
}

/// Build a simulator from a validated config. The clock is left stopped;
/// call `start` when ready.
pub fn build_simulator(config: &SimConfig) -> Result<ElevatorSimulator, DataLoadError> {
    let building = build_building(config)?;
    let sim = ElevatorSimulator::new(building, dispatch_strategy(config.params.dispatch));
    sim.set_speed(config.params.speed);

    for arrival in &config.arrivals {
        sim.controller().schedule_passenger(ScheduledArrival {
            at: arrival.at,
            origin: arrival.origin,
            destination: arrival.destination,
        });
    }
    if let Some(scenario) = &config.scenario {
        sim.schedule_scenario(Scenario {
            pattern: traffic_pattern(scenario.pattern),
            passengers: scenario.passengers,
            mean_interval: scenario.mean_interval,
            seed: scenario.seed,
        });
    }
    Ok(sim)
}

/// Load a config file and build the simulator it describes.
pub fn simulator_from_file(path: &Path) -> Result<ElevatorSimulator, DataLoadError> {
    build_simulator(&load_sim_config(path)?)
}

// ===========================================================================
// Sample config
// ===========================================================================

/// The starter config: a 10-floor building with three cars, a couple of
/// scripted trips, and a seeded batch of interfloor traffic.
pub fn sample_config() -> SimConfig {
    SimConfig {
        building: BuildingSpec {
            name: "headquarters".to_string(),
            floors: 10,
            elevators: vec![
                ElevatorSpec {
                    name: "car-a".to_string(),
                    capacity: 8,
                    speed: 2.0,
                    initial_floor: 1,
                },
                ElevatorSpec {
                    name: "car-b".to_string(),
                    capacity: 8,
                    speed: 2.0,
                    initial_floor: 5,
                },
                ElevatorSpec {
                    name: "express".to_string(),
                    capacity: 12,
                    speed: 3.0,
                    initial_floor: 10,
                },
            ],
        },
        params: SimParams::default(),
        arrivals: vec![
            ArrivalSpec {
                at: 0.5,
                origin: 1,
                destination: 7,
            },
            ArrivalSpec {
                at: 2.0,
                origin: 9,
                destination: 2,
            },
        ],
        scenario: Some(ScenarioSpec {
            pattern: PatternSpec::Interfloor,
            passengers: 20,
            mean_interval: 2.0,
            seed: Some(42),
        }),
    }
}

/// Write the sample config to `path` in the format its extension names.
pub fn write_sample_config(path: &Path) -> Result<(), DataLoadError> {
    let config = sample_config();
    let serialize_err = |detail: String| DataLoadError::Serialize {
        file: path.to_path_buf(),
        detail,
    };

    let text = match detect_format(path)? {
        Format::Ron => ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default())
            .map_err(|e| serialize_err(e.to_string()))?,
        Format::Json => {
            serde_json::to_string_pretty(&config).map_err(|e| serialize_err(e.to_string()))?
        }
        Format::Toml => toml::to_string_pretty(&config).map_err(|e| serialize_err(e.to_string()))?,
    };
    std::fs::write(path, text)?;
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "liftsim_builder_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // Mapping
    // -----------------------------------------------------------------------

    #[test]
    fn elevator_configs_carry_every_field() {
        let config = sample_config();
        let resolved = elevator_configs(&config.building);
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[2].name, "express");
        assert_eq!(resolved[2].capacity, 12);
        assert!((resolved[2].speed - 3.0).abs() < f64::EPSILON);
        assert_eq!(resolved[2].initial_floor, 10);
    }

    #[test]
    fn dispatch_and_pattern_mapping() {
        assert_eq!(
            dispatch_strategy(DispatchSpec::NearestCar),
            DispatchStrategy::NearestCar
        );
        assert_eq!(dispatch_strategy(DispatchSpec::Scan), DispatchStrategy::Scan);
        assert_eq!(dispatch_strategy(DispatchSpec::Fcfs), DispatchStrategy::Fcfs);
        assert_eq!(
            traffic_pattern(PatternSpec::MorningRush),
            TrafficPattern::MorningRush
        );
        assert_eq!(
            traffic_pattern(PatternSpec::EveningRush),
            TrafficPattern::EveningRush
        );
        assert_eq!(
            traffic_pattern(PatternSpec::Interfloor),
            TrafficPattern::Interfloor
        );
    }

    // -----------------------------------------------------------------------
    // build_simulator
    // -----------------------------------------------------------------------

    #[test]
    fn sample_config_builds_a_wired_simulator() {
        let config = sample_config();
        let sim = build_simulator(&config).unwrap();

        assert_eq!(sim.building().num_floors(), 10);
        assert_eq!(sim.building().elevator_count(), 3);
        assert!(sim.building().elevator_by_name("express").is_some());
        assert_eq!(sim.controller().strategy(), DispatchStrategy::NearestCar);

        // 2 scripted arrivals + 20 generated ones, kept sorted.
        let queue = sim.controller().arrival_queue();
        assert_eq!(queue.len(), 22);
        assert!(queue.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn engine_rejection_surfaces_as_config_error() {
        let mut config = sample_config();
        config.building.floors = 1;
        // Skips loader validation on purpose; the engine still refuses.
        let result = build_building(&config);
        assert!(matches!(result, Err(DataLoadError::Config(_))));
    }

    // -----------------------------------------------------------------------
    // Sample round trips
    // -----------------------------------------------------------------------

    #[test]
    fn sample_round_trips_through_every_format() {
        for ext in ["ron", "toml", "json"] {
            let dir = make_test_dir(ext);
            let path = dir.join(format!("liftsim.{ext}"));

            write_sample_config(&path).unwrap();
            let loaded = load_sim_config(&path).unwrap();

            assert_eq!(loaded.building.name, "headquarters", "{ext}");
            assert_eq!(loaded.building.elevators.len(), 3, "{ext}");
            assert_eq!(loaded.arrivals.len(), 2, "{ext}");
            assert_eq!(loaded.scenario.unwrap().seed, Some(42), "{ext}");

            cleanup(&dir);
        }
    }

    #[test]
    fn sample_builds_and_runs() {
        use liftsim_core::test_utils::TickClock;

        let sim = build_simulator(&sample_config()).unwrap();
        let ctrl = sim.controller();
        let mut clock = TickClock::new();
        assert!(ctrl.start_clock_at(clock.origin()));

        let drained = clock.run_until(ctrl, 6000, |c| c.status().arrived_passengers == 22);
        assert!(drained, "sample traffic never drained");
    }
}
