pub mod agent;
pub mod config;
pub mod constants;
pub mod metrics;
pub mod perception;
pub mod reproduction;
pub mod resource;
pub mod rng;
pub mod scenario;
pub mod spatial;
pub mod species;
pub mod traits;
pub mod world;

pub use constants::MAX_WORLD_SIZE;
pub use metrics::{PopulationStats, RunSummary, StepMetrics, StepSnapshot};
