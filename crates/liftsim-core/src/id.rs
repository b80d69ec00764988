use serde::{Serialize, Deserialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Identifies an elevator car within a building's roster.
    pub struct ElevatorId;
}

/// Identifies a passenger in the simulation roster. Cheap to copy and compare.
///
/// Ids are assigned sequentially starting at 1 and render as `P0001`,
/// `P0002`, ... in logs, snapshots, and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PassengerId(pub u32);

impl fmt::Display for PassengerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{:04}", self.0)
    }
}
