/// Errors detected while constructing a building or wiring a simulation.
///
/// Runtime rejections (out-of-range floors, full cars, unknown ids) are
/// reported by value from the operation that refused them; only
/// construction-time inconsistencies rise to a typed error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A building needs at least two floors to be worth simulating.
    #[error("building '{building}' has {floors} floors, need at least 2")]
    TooFewFloors { building: String, floors: u32 },

    /// A building with no elevators cannot serve anyone.
    #[error("building '{building}' has no elevators configured")]
    NoElevators { building: String },

    /// Elevator capacity must be positive.
    #[error("elevator '{elevator}' has zero capacity")]
    ZeroCapacity { elevator: String },

    /// Elevator speed must be positive and finite.
    #[error("elevator '{elevator}' has invalid speed {speed}")]
    InvalidSpeed { elevator: String, speed: f64 },

    /// The configured starting floor lies outside the building.
    #[error("elevator '{elevator}' starts at floor {floor}, outside 1..={max_floor}")]
    InitialFloorOutOfRange {
        elevator: String,
        floor: u32,
        max_floor: u32,
    },

    /// Two elevators were configured with the same id.
    #[error("duplicate elevator id '{elevator}'")]
    DuplicateElevator { elevator: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_offender() {
        let err = ConfigError::TooFewFloors {
            building: "hq".into(),
            floors: 1,
        };
        assert_eq!(err.to_string(), "building 'hq' has 1 floors, need at least 2");

        let err = ConfigError::InitialFloorOutOfRange {
            elevator: "car_a".into(),
            floor: 12,
            max_floor: 10,
        };
        assert!(err.to_string().contains("car_a"));
        assert!(err.to_string().contains("12"));
    }
}
