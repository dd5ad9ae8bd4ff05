//! Public API for the simulation.
//!
//! This module provides the main interface for a host (game loop, tool, or
//! test harness) to drive radiation propagation.
//!
//! ## Fixed Timestep
//!
//! The simulation uses a fixed timestep internally (default 30 Hz). When `step(dt)` is called,
//! the simulation accumulates time and runs fixed updates as needed. Every fixed update
//! recomputes the radiation field from scratch.

use crate::components::*;
use crate::config::RadiationConfig;
use crate::grid::{GridId, GridSnapshot, TileGrid};
use crate::maps::MapGrids;
use crate::systems::*;
use crate::world::Snapshot;
use bevy_ecs::prelude::*;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Registering grid topology
/// - Spawning and editing radiation sources
/// - Stepping the simulation forward
/// - Extracting state snapshots
pub struct RadiationSim {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl RadiationSim {
    /// Create a new empty simulation world.
    pub fn new() -> Self {
        Self::with_config(RadiationConfig::default())
    }

    /// Create a new simulation world with custom configuration.
    pub fn with_config(config: RadiationConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(SimTick(0));
        world.insert_resource(MapGrids::new());
        world.insert_resource(RadiationField::default());
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(radiation_propagation_system);

        Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
        }
    }

    /// Create a demo world: one station grid with a few sources on it.
    pub fn new_demo_world() -> Self {
        let mut sim = Self::new();
        let map = MapId(1);

        // 64x64 tiles, 1 unit per tile, centred on the map origin.
        sim.add_grid(TileGrid::new_with_room(GridId(1), map, 64, 64, 1.0));

        sim.spawn_source(1, Position::new(map, -10.0, -10.0), RadiationSource::new(8.0));
        sim.spawn_source(2, Position::new(map, 12.0, 4.0), RadiationSource::new(5.0));
        let pile = sim.spawn_source(3, Position::new(map, 0.0, 15.0), RadiationSource::new(1.5).stack_scaled());
        sim.world.entity_mut(pile).insert(StackCount(4));

        // Out in space: never resolves.
        sim.spawn_source(4, Position::new(map, 200.0, 200.0), RadiationSource::new(10.0));

        sim
    }

    /// Step the simulation forward by `dt` seconds.
    ///
    /// Uses fixed timestep internally - accumulates time and runs fixed updates
    /// as needed. This ensures deterministic behavior regardless of frame rate.
    pub fn step(&mut self, dt: f32) {
        let fixed_dt = self.fixed_timestep();

        self.time_accumulator += dt;
        while self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
        }
    }

    /// Run exactly one fixed update, regardless of accumulated time.
    pub fn run_tick(&mut self) {
        let fixed_dt = self.fixed_timestep();
        self.fixed_update(fixed_dt);
    }

    fn fixed_timestep(&self) -> f32 {
        self.world
            .get_resource::<RadiationConfig>()
            .map(|c| c.fixed_timestep)
            .filter(|dt| *dt > 0.0)
            .unwrap_or(1.0 / 30.0)
    }

    /// Run a single fixed timestep update.
    fn fixed_update(&mut self, dt: f32) {
        if let Some(mut tick_res) = self.world.get_resource_mut::<SimTick>() {
            tick_res.increment();
        }

        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Layout snapshots of every registered grid.
    pub fn grid_snapshots(&self) -> Vec<GridSnapshot> {
        self.grids().iter().map(GridSnapshot::from_grid).collect()
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    /// Radiation results from the last tick.
    pub fn field(&self) -> &RadiationField {
        self.world.resource::<RadiationField>()
    }

    /// Replace the active configuration. Takes effect on the next tick.
    pub fn set_config(&mut self, config: RadiationConfig) {
        self.world.insert_resource(config);
    }

    pub fn config(&self) -> &RadiationConfig {
        self.world.resource::<RadiationConfig>()
    }

    // ------------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------------

    /// Register a grid, replacing any grid with the same id.
    pub fn add_grid(&mut self, grid: TileGrid) -> Option<TileGrid> {
        self.world.resource_mut::<MapGrids>().insert(grid)
    }

    pub fn remove_grid(&mut self, id: GridId) -> Option<TileGrid> {
        self.world.resource_mut::<MapGrids>().remove(id)
    }

    pub fn grids(&self) -> &MapGrids {
        self.world.resource::<MapGrids>()
    }

    pub fn grids_mut(&mut self) -> Mut<'_, MapGrids> {
        self.world.resource_mut::<MapGrids>()
    }

    // ------------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------------

    /// Spawn a radiation source.
    pub fn spawn_source(&mut self, id: u32, position: Position, source: RadiationSource) -> Entity {
        self.world.spawn(RadiationSourceBundle::new(id, position, source)).id()
    }

    fn find_source(&mut self, id: u32) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &SourceId)>();
        query
            .iter(&self.world)
            .find(|(_, source_id)| source_id.0 == id)
            .map(|(e, _)| e)
    }

    /// Remove a source. Returns `false` if no source has that id.
    pub fn despawn_source(&mut self, id: u32) -> bool {
        match self.find_source(id) {
            Some(entity) => self.world.despawn(entity),
            None => false,
        }
    }

    /// Enable or disable a source.
    pub fn set_source_enabled(&mut self, id: u32, enabled: bool) -> bool {
        self.edit_source(id, |source| source.enabled = enabled)
    }

    /// Change a source's epicenter intensity.
    pub fn set_source_intensity(&mut self, id: u32, intensity: f32) -> bool {
        self.edit_source(id, |source| source.intensity = intensity)
    }

    fn edit_source(&mut self, id: u32, edit: impl FnOnce(&mut RadiationSource)) -> bool {
        let mut query = self.world.query::<(&SourceId, &mut RadiationSource)>();
        for (source_id, mut source) in query.iter_mut(&mut self.world) {
            if source_id.0 == id {
                edit(&mut *source);
                return true;
            }
        }
        false
    }

    /// Move a source, possibly onto another map.
    pub fn move_source(&mut self, id: u32, position: Position) -> bool {
        let mut query = self.world.query::<(&SourceId, &mut Position)>();
        for (source_id, mut pos) in query.iter_mut(&mut self.world) {
            if source_id.0 == id {
                *pos = position;
                return true;
            }
        }
        false
    }

    /// Set the stack size used by stack-scaled sources.
    pub fn set_stack_count(&mut self, id: u32, count: u32) -> bool {
        match self.find_source(id) {
            Some(entity) => {
                self.world.entity_mut(entity).insert(StackCount(count));
                true
            }
            None => false,
        }
    }

    /// Get the number of sources.
    pub fn source_count(&mut self) -> usize {
        let mut query = self.world.query::<&SourceId>();
        query.iter(&self.world).count()
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for RadiationSim {
    fn default() -> Self {
        Self::new()
    }
}
