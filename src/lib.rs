//! Radiation Simulation Core
//!
//! Per-tick radiation propagation over tile grids: every enabled source
//! flood fills outward from its epicenter with a flat per-hop decay.
//! Uses `bevy_ecs` for the entity-component-system architecture.

pub mod api;
pub mod components;
pub mod config;
pub mod grid;
pub mod maps;
pub mod propagation;
pub mod systems;
pub mod world;

pub use components::*;
pub use config::{load_radiation_config_from_env, DecayPolicy, RadiationConfig, RadiationConfigError};
pub use grid::{Direction, GridId, GridSnapshot, TileGrid, TileIndex, TileKind};
pub use maps::{Epicenter, MapGrids};
pub use propagation::{flood_fill, propagate, FloodFillOptions, PropagationError, RadiationFill, TileRadiationMap};
pub use systems::*;
pub use world::Snapshot;
pub use api::RadiationSim;
