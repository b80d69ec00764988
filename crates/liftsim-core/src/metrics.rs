//! Instantaneous fleet-level counters sampled from a building.

use crate::building::Building;
use crate::elevator::CarState;

/// One sample of fleet state, cheap enough to take every tick. Energy is a
/// coarse proxy: one unit per car observed moving at the sample instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SystemMetrics {
    pub total_cars: usize,
    /// Cars travelling between floors.
    pub active_cars: usize,
    pub idle_cars: usize,
    pub out_of_service_cars: usize,
    pub pending_cab_calls: usize,
    pub pending_hall_calls: usize,
    pub estimated_energy: u64,
}

impl SystemMetrics {
    pub fn collect(building: &Building) -> Self {
        let mut m = Self {
            total_cars: building.elevator_count(),
            ..Self::default()
        };

        for &id in building.elevator_ids() {
            let car = building.elevator(id).unwrap().lock().unwrap();
            match car.state() {
                s if s.is_moving() => {
                    m.active_cars += 1;
                    m.estimated_energy += 1;
                }
                CarState::Idle => m.idle_cars += 1,
                CarState::Maintenance | CarState::Emergency => m.out_of_service_cars += 1,
                _ => {}
            }
            m.pending_cab_calls += car.cab_calls().len();
            m.pending_hall_calls += car.up_calls().len() + car.down_calls().len();
        }

        m
    }
}

// ===========================================================================
// Tests
// ===========================================================================
