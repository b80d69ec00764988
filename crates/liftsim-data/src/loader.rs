//! Config loading: format detection, file discovery, deserialization, and
//! schema validation.
//!
//! The loader rejects malformed configs with file context before any engine
//! type is constructed; the engine's own constructor checks are a second
//! line of defense, not the reporting surface.

use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::schema::SimConfig;

/// Base name the directory scan looks for (`liftsim.{ron,toml,json}`).
pub const CONFIG_BASE: &str = "liftsim";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a simulation config.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// No config file was found in the given directory.
    #[error("no '{file}.{{ron,toml,json}}' found in {dir}")]
    MissingRequired { file: &'static str, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The config parsed but describes an unusable simulation.
    #[error("invalid config {file}: {detail}")]
    Invalid { file: PathBuf, detail: String },

    /// The engine rejected the resolved configuration.
    #[error(transparent)]
    Config(#[from] liftsim_core::error::ConfigError),

    /// A serialization error occurred while writing a config.
    #[error("cannot write {file}: {detail}")]
    Serialize { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `liftsim.ron`, `liftsim.toml`, or `liftsim.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists.
pub fn find_config_file(dir: &Path) -> Result<Option<PathBuf>, DataLoadError> {
    let extensions = ["ron", "toml", "json"];
    let mut found: Option<PathBuf> = None;

    for ext in &extensions {
        let candidate = dir.join(format!("{CONFIG_BASE}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_config_file`], but returns an error if no file is found.
pub fn require_config_file(dir: &Path) -> Result<PathBuf, DataLoadError> {
    find_config_file(dir)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: CONFIG_BASE,
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from
/// extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => toml::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Load and validate a simulation config from a file.
pub fn load_sim_config(path: &Path) -> Result<SimConfig, DataLoadError> {
    let config: SimConfig = deserialize_file(path)?;
    validate_config(&config, path)?;
    Ok(config)
}

// ===========================================================================
// Validation
// ===========================================================================

/// Reject configs the engine could not run, with file context in every
/// message.
pub fn validate_config(config: &SimConfig, file: &Path) -> Result<(), DataLoadError> {
    let invalid = |detail: String| DataLoadError::Invalid {
        file: file.to_path_buf(),
        detail,
    };

    let floors = config.building.floors;
    if floors < 2 {
        return Err(invalid(format!("floor count must be at least 2, got {floors}")));
    }
    if config.building.elevators.is_empty() {
        return Err(invalid("building has no elevators".to_string()));
    }

    let mut names = HashSet::new();
    for spec in &config.building.elevators {
        if !names.insert(spec.name.as_str()) {
            return Err(invalid(format!("duplicate elevator name '{}'", spec.name)));
        }
        if spec.capacity == 0 {
            return Err(invalid(format!("elevator '{}' has zero capacity", spec.name)));
        }
        if !(spec.speed.is_finite() && spec.speed > 0.0) {
            return Err(invalid(format!(
                "elevator '{}' has invalid speed {}",
                spec.name, spec.speed
            )));
        }
        if !(1..=floors).contains(&spec.initial_floor) {
            return Err(invalid(format!(
                "elevator '{}' starts at floor {} outside 1..={floors}",
                spec.name, spec.initial_floor
            )));
        }
    }

    if !(config.params.speed.is_finite() && config.params.speed > 0.0) {
        return Err(invalid(format!(
            "simulation speed {} is not a positive number",
            config.params.speed
        )));
    }

    for (i, arrival) in config.arrivals.iter().enumerate() {
        if !(arrival.at.is_finite() && arrival.at >= 0.0) {
            return Err(invalid(format!("arrival {i} has invalid time {}", arrival.at)));
        }
        for floor in [arrival.origin, arrival.destination] {
            if !(1..=floors).contains(&floor) {
                return Err(invalid(format!(
                    "arrival {i} references floor {floor} outside 1..={floors}"
                )));
            }
        }
        if arrival.origin == arrival.destination {
            return Err(invalid(format!(
                "arrival {i} has equal origin and destination {}",
                arrival.origin
            )));
        }
    }

    if let Some(scenario) = &config.scenario {
        if !(scenario.mean_interval.is_finite() && scenario.mean_interval >= 0.0) {
            return Err(invalid(format!(
                "scenario mean interval {} is invalid",
                scenario.mean_interval
            )));
        }
    }

    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ArrivalSpec, BuildingSpec, ElevatorSpec, SimParams};
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "liftsim_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    fn two_car_config() -> SimConfig {
        SimConfig {
            building: BuildingSpec {
                name: "hq".to_string(),
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
                        initial_floor: 10,
                    },
                ],
            },
            params: SimParams::default(),
            arrivals: vec![ArrivalSpec {
                at: 1.0,
                origin: 1,
                destination: 5,
            }],
            scenario: None,
        }
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("a.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("a.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        assert!(matches!(
            detect_format(Path::new("a.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("noext")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // find_config_file / require_config_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_config_file_found() {
        let dir = make_test_dir("find");
        fs::write(dir.join("liftsim.toml"), "").unwrap();

        let result = find_config_file(&dir).unwrap();
        assert_eq!(result, Some(dir.join("liftsim.toml")));

        cleanup(&dir);
    }

    #[test]
    fn find_config_file_missing() {
        let dir = make_test_dir("find_missing");
        assert_eq!(find_config_file(&dir).unwrap(), None);
        cleanup(&dir);
    }

    #[test]
    fn find_config_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("liftsim.ron"), "").unwrap();
        fs::write(dir.join("liftsim.json"), "").unwrap();

        assert!(matches!(
            find_config_file(&dir),
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn require_config_file_missing() {
        let dir = make_test_dir("require_missing");
        assert!(matches!(
            require_config_file(&dir),
            Err(DataLoadError::MissingRequired { .. })
        ));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_sim_config
    // -----------------------------------------------------------------------

    #[test]
    fn load_sim_config_ron() {
        let dir = make_test_dir("load_ron");
        let path = dir.join("liftsim.ron");
        fs::write(
            &path,
            r#"(building: (name: "hq", floors: 10, elevators: [(name: "car-a")]))"#,
        )
        .unwrap();

        let config = load_sim_config(&path).unwrap();
        assert_eq!(config.building.name, "hq");
        assert_eq!(config.building.elevators[0].capacity, 8);

        cleanup(&dir);
    }

    #[test]
    fn load_sim_config_toml() {
        let dir = make_test_dir("load_toml");
        let path = dir.join("liftsim.toml");
        fs::write(
            &path,
            r#"
[building]
name = "hq"
floors = 6

[[building.elevators]]
name = "car-a"
"#,
        )
        .unwrap();

        let config = load_sim_config(&path).unwrap();
        assert_eq!(config.building.floors, 6);

        cleanup(&dir);
    }

    #[test]
    fn load_sim_config_parse_error() {
        let dir = make_test_dir("load_parse_err");
        let path = dir.join("liftsim.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        assert!(matches!(
            load_sim_config(&path),
            Err(DataLoadError::Parse { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_sim_config_rejects_invalid() {
        let dir = make_test_dir("load_invalid");
        let path = dir.join("liftsim.ron");
        fs::write(
            &path,
            r#"(building: (name: "flat", floors: 1, elevators: [(name: "car-a")]))"#,
        )
        .unwrap();

        assert!(matches!(
            load_sim_config(&path),
            Err(DataLoadError::Invalid { .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // validate_config
    // -----------------------------------------------------------------------

    fn detail_of(result: Result<(), DataLoadError>) -> String {
        match result {
            Err(DataLoadError::Invalid { detail, .. }) => detail,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_good_config() {
        let config = two_car_config();
        assert!(validate_config(&config, Path::new("liftsim.ron")).is_ok());
    }

    #[test]
    fn validate_rejects_no_elevators() {
        let mut config = two_car_config();
        config.building.elevators.clear();
        let detail = detail_of(validate_config(&config, Path::new("x.ron")));
        assert!(detail.contains("no elevators"));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let mut config = two_car_config();
        config.building.elevators[1].name = "car-a".to_string();
        let detail = detail_of(validate_config(&config, Path::new("x.ron")));
        assert!(detail.contains("duplicate"));
        assert!(detail.contains("car-a"));
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let mut config = two_car_config();
        config.building.elevators[0].capacity = 0;
        let detail = detail_of(validate_config(&config, Path::new("x.ron")));
        assert!(detail.contains("zero capacity"));
    }

    #[test]
    fn validate_rejects_bad_speed() {
        let mut config = two_car_config();
        config.building.elevators[0].speed = 0.0;
        assert!(validate_config(&config, Path::new("x.ron")).is_err());

        config.building.elevators[0].speed = f64::NAN;
        assert!(validate_config(&config, Path::new("x.ron")).is_err());
    }

    #[test]
    fn validate_rejects_parking_outside_building() {
        let mut config = two_car_config();
        config.building.elevators[1].initial_floor = 11;
        let detail = detail_of(validate_config(&config, Path::new("x.ron")));
        assert!(detail.contains("floor 11"));
    }

    #[test]
    fn validate_rejects_bad_arrivals() {
        let mut config = two_car_config();
        config.arrivals[0].destination = 15;
        let detail = detail_of(validate_config(&config, Path::new("x.ron")));
        assert!(detail.contains("floor 15"));

        let mut config = two_car_config();
        config.arrivals[0].destination = config.arrivals[0].origin;
        let detail = detail_of(validate_config(&config, Path::new("x.ron")));
        assert!(detail.contains("equal origin and destination"));

        let mut config = two_car_config();
        config.arrivals[0].at = -1.0;
        assert!(validate_config(&config, Path::new("x.ron")).is_err());
    }

    #[test]
    fn validate_rejects_nonpositive_sim_speed() {
        let mut config = two_car_config();
        config.params.speed = 0.0;
        assert!(validate_config(&config, Path::new("x.ron")).is_err());
    }

    // -----------------------------------------------------------------------
    // Error display / conversions
    // -----------------------------------------------------------------------

    #[test]
    fn error_display_messages() {
        let e = DataLoadError::MissingRequired {
            file: CONFIG_BASE,
            dir: PathBuf::from("/cfg"),
        };
        assert!(format!("{e}").contains("liftsim"));
        assert!(format!("{e}").contains("/cfg"));

        let e = DataLoadError::Invalid {
            file: PathBuf::from("liftsim.ron"),
            detail: "floor count must be at least 2, got 1".to_string(),
        };
        let msg = format!("{e}");
        assert!(msg.contains("liftsim.ron"));
        assert!(msg.contains("at least 2"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let data_err: DataLoadError = io_err.into();
        assert!(matches!(data_err, DataLoadError::Io(_)));
        assert!(format!("{data_err}").contains("file not found"));
    }
}
