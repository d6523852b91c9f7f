pub mod bee;
pub mod behaviour;
pub mod development;
pub mod engine;
pub mod landscape;
pub mod mask;
pub mod mortality;
pub mod nest;
pub mod parasitism;
pub mod params;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod systems;
pub mod weather;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, System, SystemContext};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::World;
