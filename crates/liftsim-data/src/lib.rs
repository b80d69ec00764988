pub mod builder;
pub mod loader;
pub mod schema;

pub use builder::build_simulator;
pub use loader::{DataLoadError, load_sim_config};
