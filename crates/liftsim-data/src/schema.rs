//! Serde data file structs for simulation configurations.
//!
//! These structs define the on-disk format for a building, its fleet, the
//! simulation parameters, and any pre-scripted traffic. They are deserialized
//! from RON, JSON, or TOML files and then resolved into engine types by the
//! builder.

use serde::{Deserialize, Serialize};

// ===========================================================================
// Top level
// ===========================================================================

/// A whole simulation setup as written in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub building: BuildingSpec,
    #[serde(default)]
    pub params: SimParams,
    /// Pre-scripted passenger arrivals, in simulated seconds.
    #[serde(default)]
    pub arrivals: Vec<ArrivalSpec>,
    /// Optional generated traffic on top of the scripted arrivals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioSpec>,
}

// ===========================================================================
// Building
// ===========================================================================

/// A building definition in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub name: String,
    pub floors: u32,
    pub elevators: Vec<ElevatorSpec>,
}

/// A single car definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevatorSpec {
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Floors per simulated second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_initial_floor")]
    pub initial_floor: u32,
}

fn default_capacity() -> usize {
    8
}

fn default_speed() -> f64 {
    2.0
}

fn default_initial_floor() -> u32 {
    1
}

// ===========================================================================
// Parameters
// ===========================================================================

/// Tunables for the simulation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimParams {
    /// Clock speed multiplier, clamped by the engine into [0.1, 10.0].
    #[serde(default = "default_sim_speed")]
    pub speed: f64,
    #[serde(default)]
    pub dispatch: DispatchSpec,
}

fn default_sim_speed() -> f64 {
    1.0
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            speed: default_sim_speed(),
            dispatch: DispatchSpec::default(),
        }
    }
}

/// Which hall-call assignment strategy the controller uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchSpec {
    #[default]
    NearestCar,
    Scan,
    Fcfs,
}

// ===========================================================================
// Traffic
// ===========================================================================

/// One scripted passenger arrival.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ArrivalSpec {
    pub at: f64,
    pub origin: u32,
    pub destination: u32,
}

/// A batch of generated traffic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub pattern: PatternSpec,
    pub passengers: usize,
    #[serde(default = "default_mean_interval")]
    pub mean_interval: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_mean_interval() -> f64 {
    2.0
}

/// Shape of generated traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSpec {
    MorningRush,
    EveningRush,
    Interfloor,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // RON deserialization
    // -----------------------------------------------------------------------

    #[test]
    fn full_config_from_ron() {
        let ron = r#"
            (
                building: (
                    name: "hq",
                    floors: 12,
                    elevators: [
                        (name: "car-a"),
                        (name: "car-b", capacity: 12, speed: 1.5, initial_floor: 6),
                    ],
                ),
                params: (speed: 2.0, dispatch: scan),
                arrivals: [
                    (at: 0.5, origin: 1, destination: 9),
                    (at: 1.5, origin: 9, destination: 1),
                ],
                scenario: Some((
                    pattern: morning_rush,
                    passengers: 30,
                    mean_interval: 1.0,
                    seed: Some(7),
                )),
            )
        "#;
        let config: SimConfig = ron::from_str(ron).unwrap();
        assert_eq!(config.building.name, "hq");
        assert_eq!(config.building.floors, 12);
        assert_eq!(config.building.elevators.len(), 2);
        assert_eq!(config.building.elevators[1].capacity, 12);
        assert!((config.params.speed - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.params.dispatch, DispatchSpec::Scan);
        assert_eq!(config.arrivals.len(), 2);
        let scenario = config.scenario.unwrap();
        assert_eq!(scenario.pattern, PatternSpec::MorningRush);
        assert_eq!(scenario.passengers, 30);
        assert_eq!(scenario.seed, Some(7));
    }

    #[test]
    fn elevator_defaults_from_ron() {
        let ron = r#"(name: "car-a")"#;
        let spec: ElevatorSpec = ron::from_str(ron).unwrap();
        assert_eq!(spec.capacity, 8);
        assert!((spec.speed - 2.0).abs() < f64::EPSILON);
        assert_eq!(spec.initial_floor, 1);
    }

    #[test]
    fn minimal_config_from_ron() {
        let ron = r#"
            (
                building: (
                    name: "tiny",
                    floors: 2,
                    elevators: [(name: "only")],
                ),
            )
        "#;
        let config: SimConfig = ron::from_str(ron).unwrap();
        assert!((config.params.speed - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.params.dispatch, DispatchSpec::NearestCar);
        assert!(config.arrivals.is_empty());
        assert!(config.scenario.is_none());
    }

    // -----------------------------------------------------------------------
    // JSON deserialization
    // -----------------------------------------------------------------------

    #[test]
    fn config_from_json() {
        let json = r#"{
            "building": {
                "name": "hq",
                "floors": 10,
                "elevators": [{"name": "car-a", "capacity": 6}]
            },
            "params": {"dispatch": "fcfs"},
            "arrivals": [{"at": 2.5, "origin": 3, "destination": 7}]
        }"#;
        let config: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.building.elevators[0].capacity, 6);
        assert_eq!(config.params.dispatch, DispatchSpec::Fcfs);
        assert!((config.params.speed - 1.0).abs() < f64::EPSILON);
        assert!((config.arrivals[0].at - 2.5).abs() < f64::EPSILON);
    }

    // -----------------------------------------------------------------------
    // TOML deserialization
    // -----------------------------------------------------------------------

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
            [building]
            name = "hq"
            floors = 12

            [[building.elevators]]
            name = "car-a"

            [[building.elevators]]
            name = "car-b"
            capacity = 10
            speed = 1.0
            initial_floor = 12

            [params]
            speed = 4.0
            dispatch = "scan"

            [[arrivals]]
            at = 0.5
            origin = 1
            destination = 9

            [scenario]
            pattern = "evening_rush"
            passengers = 15
            seed = 11
        "#;
        let config: SimConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.building.elevators.len(), 2);
        assert_eq!(config.building.elevators[1].initial_floor, 12);
        assert_eq!(config.params.dispatch, DispatchSpec::Scan);
        let scenario = config.scenario.unwrap();
        assert_eq!(scenario.pattern, PatternSpec::EveningRush);
        assert!((scenario.mean_interval - 2.0).abs() < f64::EPSILON);
        assert_eq!(scenario.seed, Some(11));
    }

    // -----------------------------------------------------------------------
    // Round trip
    // -----------------------------------------------------------------------

    #[test]
    fn config_survives_ron_round_trip() {
        let config = SimConfig {
            building: BuildingSpec {
                name: "hq".to_string(),
                floors: 10,
                elevators: vec![ElevatorSpec {
                    name: "car-a".to_string(),
                    capacity: 8,
                    speed: 2.0,
                    initial_floor: 1,
                }],
            },
            params: SimParams {
                speed: 1.0,
                dispatch: DispatchSpec::Scan,
            },
            arrivals: vec![ArrivalSpec {
                at: 1.0,
                origin: 1,
                destination: 5,
            }],
            scenario: None,
        };
        let text = ron::to_string(&config).unwrap();
        let back: SimConfig = ron::from_str(&text).unwrap();
        assert_eq!(back.building.name, "hq");
        assert_eq!(back.params.dispatch, DispatchSpec::Scan);
        assert_eq!(back.arrivals.len(), 1);
    }
}
