//! Radiation propagation system - rebuilds the radiation field every tick.
//!
//! ## Phases
//!
//! 1. **Gather** - collect every enabled source with its epicenter, effective
//!    intensity and fill options.
//! 2. **Compute** - flood fill each source independently. Fills are pure
//!    functions of (epicenter, intensity, options), so this phase is
//!    parallelizable.
//! 3. **Apply** - clear the [`RadiationField`] and store one fill per source.
//!
//! Each source keeps its own fill; a second source never overwrites the
//! first. Consumers that want the total dose per tile use
//! [`RadiationField::combined`].
//!
//! ## Parallel Feature
//!
//! When compiled with `--features parallel`, the compute phase uses rayon to
//! fill sources across multiple threads.

use crate::components::*;
use crate::config::RadiationConfig;
use crate::grid::{GridId, TileIndex};
use crate::maps::MapGrids;
use crate::propagation::{propagate, FloodFillOptions, PropagationError, RadiationFill, TileRadiationMap};
use crate::systems::clock::SimTick;
use bevy_ecs::prelude::*;
use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Per-tick radiation results, one fill per source.
#[derive(Resource, Debug, Default)]
pub struct RadiationField {
    /// Tick the field was computed on.
    tick: u64,
    fills: HashMap<Entity, RadiationFill>,
    /// Enabled sources whose epicenter had no grid or tile this tick.
    unresolved: Vec<SourceId>,
    /// Enabled sources skipped because their parameters could not be filled.
    rejected: Vec<SourceId>,
}

impl RadiationField {
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.fills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// All fills computed this tick.
    pub fn fills(&self) -> impl Iterator<Item = &RadiationFill> {
        self.fills.values()
    }

    pub fn fill_for_entity(&self, entity: Entity) -> Option<&RadiationFill> {
        self.fills.get(&entity)
    }

    pub fn fill_for(&self, source: SourceId) -> Option<&RadiationFill> {
        self.fills.values().find(|fill| fill.source == source)
    }

    pub fn unresolved(&self) -> &[SourceId] {
        &self.unresolved
    }

    pub fn rejected(&self) -> &[SourceId] {
        &self.rejected
    }

    /// Sum of every source's contribution on one grid.
    pub fn combined(&self, grid: GridId) -> TileRadiationMap {
        let mut total = TileRadiationMap::new();
        for fill in self.fills.values().filter(|f| f.grid == grid) {
            for (tile, rads) in &fill.tiles {
                *total.entry(*tile).or_insert(0.0) += rads;
            }
        }
        total
    }

    /// Total rads arriving at a tile from all sources. Zero if none reach it.
    pub fn intensity_at(&self, grid: GridId, tile: TileIndex) -> f32 {
        self.fills
            .values()
            .filter(|f| f.grid == grid)
            .filter_map(|f| f.intensity_at(tile))
            .sum()
    }

    /// Drop all results and stamp the field with a new tick.
    pub fn reset(&mut self, tick: u64) {
        self.tick = tick;
        self.fills.clear();
        self.unresolved.clear();
        self.rejected.clear();
    }
}

/// Everything needed to fill one source, captured during the gather phase.
#[derive(Debug, Clone, Copy)]
struct SourceJob {
    entity: Entity,
    id: SourceId,
    position: Position,
    intensity: f32,
    options: FloodFillOptions,
}

type JobOutcome = (Entity, SourceId, Result<Option<RadiationFill>, PropagationError>);

fn run_job(job: &SourceJob, grids: &MapGrids) -> JobOutcome {
    let outcome = propagate(grids, job.id, &job.position, job.intensity, &job.options);
    (job.entity, job.id, outcome)
}

#[cfg_attr(all(feature = "parallel", not(test)), allow(dead_code))]
fn compute_sequential(jobs: &[SourceJob], grids: &MapGrids) -> Vec<JobOutcome> {
    jobs.iter().map(|job| run_job(job, grids)).collect()
}

/// Same outcomes as [`compute_sequential`], in the same order.
#[cfg(feature = "parallel")]
fn compute_parallel(jobs: &[SourceJob], grids: &MapGrids) -> Vec<JobOutcome> {
    jobs.par_iter().map(|job| run_job(job, grids)).collect()
}

/// System that flood fills every enabled source and rebuilds the [`RadiationField`].
pub fn radiation_propagation_system(
    tick: Option<Res<SimTick>>,
    config: Option<Res<RadiationConfig>>,
    grids: Res<MapGrids>,
    sources: Query<(Entity, &SourceId, &RadiationSource, &Position, Option<&StackCount>)>,
    mut field: ResMut<RadiationField>,
) {
    let config = config.as_deref().cloned().unwrap_or_default();

    // GATHER PHASE
    let jobs: Vec<SourceJob> = sources
        .iter()
        .filter(|(_, _, source, _, _)| source.enabled)
        .map(|(entity, id, source, position, stack)| SourceJob {
            entity,
            id: *id,
            position: *position,
            intensity: source.effective_intensity(stack),
            options: config.fill_options_for(source),
        })
        .collect();

    // COMPUTE PHASE
    let grids: &MapGrids = &grids;

    #[cfg(feature = "parallel")]
    let outcomes = compute_parallel(&jobs, grids);

    #[cfg(not(feature = "parallel"))]
    let outcomes = compute_sequential(&jobs, grids);

    // APPLY PHASE
    field.reset(tick.map(|t| t.0).unwrap_or_default());
    for (entity, id, outcome) in outcomes {
        match outcome {
            Ok(Some(fill)) => {
                field.fills.insert(entity, fill);
            }
            Ok(None) => {
                tracing::debug!(
                    target: "radsim::radiation",
                    source = id.0,
                    "radiation.epicenter_unresolved"
                );
                field.unresolved.push(id);
            }
            Err(err) => {
                tracing::warn!(
                    target: "radsim::radiation",
                    source = id.0,
                    error = %err,
                    "radiation.source_rejected"
                );
                field.rejected.push(id);
            }
        }
    }

    tracing::trace!(
        target: "radsim::radiation",
        tick = field.tick,
        sources = jobs.len(),
        fills = field.fills.len(),
        tiles = field.fills.values().map(RadiationFill::tile_count).sum::<usize>(),
        "radiation.tick"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayPolicy;
    use crate::grid::{TileGrid, TileKind};

    const MAP: MapId = MapId(1);

    /// 40x40 floor grid with its lower-left corner at the map origin.
    fn world_with_grid() -> World {
        let mut world = World::new();
        let mut grids = MapGrids::new();
        grids.insert(TileGrid::new(GridId(1), MAP, 40, 40, 1.0, 0.0, 0.0));
        world.insert_resource(grids);
        world.insert_resource(RadiationField::default());
        world.insert_resource(RadiationConfig::default());
        world
    }

    fn spawn(world: &mut World, id: u32, x: f32, y: f32, intensity: f32) -> Entity {
        world
            .spawn(RadiationSourceBundle::new(
                id,
                Position::new(MAP, x, y),
                RadiationSource::new(intensity),
            ))
            .id()
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(radiation_propagation_system);
        schedule.run(world);
    }

    #[test]
    fn test_single_source_fill() {
        let mut world = world_with_grid();
        let entity = spawn(&mut world, 1, 10.5, 10.5, 5.0);
        run(&mut world);

        let field = world.resource::<RadiationField>();
        let fill = field.fill_for_entity(entity).unwrap();
        assert_eq!(fill.origin, TileIndex::new(10, 10));
        assert_eq!(fill.intensity_at(TileIndex::new(10, 10)), Some(5.0));
        assert_eq!(fill.intensity_at(TileIndex::new(12, 11)), Some(2.0));
        assert_eq!(fill.tile_count(), 41);
    }

    #[test]
    fn test_all_sources_survive_the_tick() {
        let mut world = world_with_grid();
        spawn(&mut world, 1, 5.5, 5.5, 3.0);
        spawn(&mut world, 2, 30.5, 30.5, 3.0);
        run(&mut world);

        let field = world.resource::<RadiationField>();
        assert_eq!(field.len(), 2);
        let a = field.fill_for(SourceId(1)).unwrap();
        let b = field.fill_for(SourceId(2)).unwrap();
        assert_eq!(a.intensity_at(TileIndex::new(5, 5)), Some(3.0));
        assert_eq!(b.intensity_at(TileIndex::new(30, 30)), Some(3.0));
        assert!(a.intensity_at(TileIndex::new(30, 30)).is_none());

        let combined = field.combined(GridId(1));
        assert_eq!(combined.len(), a.tile_count() + b.tile_count());
    }

    #[test]
    fn test_overlapping_sources_sum() {
        let mut world = world_with_grid();
        spawn(&mut world, 1, 10.5, 10.5, 4.0);
        spawn(&mut world, 2, 12.5, 10.5, 4.0);
        run(&mut world);

        let field = world.resource::<RadiationField>();
        // Midpoint is one hop from each source: 3 + 3.
        assert_eq!(field.intensity_at(GridId(1), TileIndex::new(11, 10)), 6.0);
        assert_eq!(field.combined(GridId(1)).get(&TileIndex::new(11, 10)), Some(&6.0));
        assert_eq!(field.intensity_at(GridId(1), TileIndex::new(30, 30)), 0.0);
    }

    #[test]
    fn test_disabled_source_skipped() {
        let mut world = world_with_grid();
        let entity = spawn(&mut world, 1, 10.5, 10.5, 5.0);
        world.get_mut::<RadiationSource>(entity).unwrap().enabled = false;
        run(&mut world);

        let field = world.resource::<RadiationField>();
        assert!(field.is_empty());
        assert!(field.unresolved().is_empty());
    }

    #[test]
    fn test_unresolved_source_leaves_no_fill() {
        let mut world = world_with_grid();
        spawn(&mut world, 1, 10.5, 10.5, 5.0);
        spawn(&mut world, 2, 500.0, 500.0, 5.0);
        run(&mut world);

        let field = world.resource::<RadiationField>();
        assert_eq!(field.len(), 1);
        assert!(field.fill_for(SourceId(2)).is_none());
        assert_eq!(field.unresolved(), &[SourceId(2)]);
    }

    #[test]
    fn test_source_over_space_unresolved() {
        let mut world = world_with_grid();
        world
            .resource_mut::<MapGrids>()
            .get_mut(GridId(1))
            .unwrap()
            .set_tile(TileIndex::new(3, 3), TileKind::Space);
        spawn(&mut world, 7, 3.5, 3.5, 5.0);
        run(&mut world);

        let field = world.resource::<RadiationField>();
        assert!(field.is_empty());
        assert_eq!(field.unresolved(), &[SourceId(7)]);
    }

    #[test]
    fn test_field_rebuilt_each_tick() {
        let mut world = world_with_grid();
        let entity = spawn(&mut world, 1, 10.5, 10.5, 5.0);
        run(&mut world);
        assert_eq!(world.resource::<RadiationField>().len(), 1);

        // Moving off-grid drops the previous tick's result.
        world.get_mut::<Position>(entity).unwrap().x = 900.0;
        run(&mut world);
        let field = world.resource::<RadiationField>();
        assert!(field.is_empty());
        assert_eq!(field.unresolved(), &[SourceId(1)]);

        world.despawn(entity);
        run(&mut world);
        let field = world.resource::<RadiationField>();
        assert!(field.is_empty());
        assert!(field.unresolved().is_empty());
    }

    #[test]
    fn test_repeated_ticks_identical() {
        let mut world = world_with_grid();
        let entity = spawn(&mut world, 1, 20.5, 20.5, 6.0);
        run(&mut world);
        let first = world.resource::<RadiationField>().fill_for_entity(entity).cloned();
        run(&mut world);
        let second = world.resource::<RadiationField>().fill_for_entity(entity).cloned();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_stack_scaled_intensity() {
        let mut world = world_with_grid();
        let entity = world
            .spawn((
                RadiationSourceBundle::new(
                    1,
                    Position::new(MAP, 10.5, 10.5),
                    RadiationSource::new(1.5).stack_scaled(),
                ),
                StackCount(4),
            ))
            .id();
        run(&mut world);

        let fill = world.resource::<RadiationField>().fill_for_entity(entity).cloned().unwrap();
        assert_eq!(fill.intensity, 6.0);
        assert_eq!(fill.intensity_at(TileIndex::new(10, 10)), Some(6.0));
    }

    #[test]
    fn test_slope_policy_uses_source_slope() {
        let mut world = world_with_grid();
        world.insert_resource(RadiationConfig {
            decay: DecayPolicy::SourceSlope,
            ..Default::default()
        });
        let entity = world
            .spawn(RadiationSourceBundle::new(
                1,
                Position::new(MAP, 10.5, 10.5),
                RadiationSource::new(2.0).with_slope(0.5),
            ))
            .id();
        run(&mut world);

        let fill = world.resource::<RadiationField>().fill_for_entity(entity).cloned().unwrap();
        assert_eq!(fill.intensity_at(TileIndex::new(13, 10)), Some(0.5));
        assert!(fill.intensity_at(TileIndex::new(14, 10)).is_none());
    }

    #[test]
    fn test_rejected_source_is_reported() {
        let mut world = world_with_grid();
        world.insert_resource(RadiationConfig {
            decay: DecayPolicy::SourceSlope,
            ..Default::default()
        });
        world.spawn(RadiationSourceBundle::new(
            3,
            Position::new(MAP, 10.5, 10.5),
            RadiationSource::new(2.0).with_slope(0.0),
        ));
        spawn(&mut world, 4, 20.5, 20.5, f32::NAN);
        run(&mut world);

        let field = world.resource::<RadiationField>();
        assert!(field.is_empty());
        let mut rejected = field.rejected().to_vec();
        rejected.sort();
        assert_eq!(rejected, vec![SourceId(3), SourceId(4)]);
    }

    #[test]
    fn test_sub_precision_decay_is_rejected_not_hung() {
        let mut world = world_with_grid();
        let config =
            RadiationConfig::from_json_str(r#"{ "decay": { "mode": "flat", "per_hop": 1e-8 } }"#).unwrap();
        world.insert_resource(config);
        spawn(&mut world, 1, 10.5, 10.5, 5.0);
        run(&mut world);

        let field = world.resource::<RadiationField>();
        assert!(field.is_empty());
        assert_eq!(field.rejected(), &[SourceId(1)]);
    }

    #[test]
    fn test_huge_intensity_is_rejected() {
        let mut world = world_with_grid();
        spawn(&mut world, 1, 10.5, 10.5, 1e9);
        spawn(&mut world, 2, 20.5, 20.5, 3.0);
        run(&mut world);

        let field = world.resource::<RadiationField>();
        assert_eq!(field.len(), 1);
        assert!(field.fill_for(SourceId(2)).is_some());
        assert_eq!(field.rejected(), &[SourceId(1)]);
    }

    #[test]
    fn test_field_matches_direct_fills() {
        let mut world = world_with_grid();
        for i in 0..64u32 {
            let x = 0.5 + (i % 8) as f32 * 5.0;
            let y = 0.5 + (i / 8) as f32 * 5.0;
            spawn(&mut world, i, x, y, 1.0 + (i % 5) as f32);
        }
        run(&mut world);

        let grids = world.resource::<MapGrids>();
        let field = world.resource::<RadiationField>();
        assert_eq!(field.len(), 64);
        for fill in field.fills() {
            let source = fill.source.0;
            let position = Position::new(MAP, 0.5 + (source % 8) as f32 * 5.0, 0.5 + (source / 8) as f32 * 5.0);
            let expected = propagate(grids, fill.source, &position, fill.intensity, &FloodFillOptions::default())
                .unwrap()
                .unwrap();
            assert_eq!(fill, &expected);
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_compute_matches_sequential() {
        let mut grids = MapGrids::new();
        grids.insert(TileGrid::centered(GridId(1), MAP, 128, 128, 1.0));
        let jobs: Vec<SourceJob> = (0..200u32)
            .map(|i| SourceJob {
                entity: Entity::from_raw(i),
                id: SourceId(i),
                position: Position::new(MAP, -60.0 + (i % 20) as f32 * 6.0, -60.0 + (i / 20) as f32 * 12.0),
                intensity: if i == 13 { 1e9 } else { 1.0 + (i % 9) as f32 },
                options: FloodFillOptions {
                    skip_visited_neighbors: i % 2 == 0,
                    ..Default::default()
                },
            })
            .collect();

        let sequential = compute_sequential(&jobs, &grids);
        let parallel = compute_parallel(&jobs, &grids);
        assert_eq!(sequential.len(), 200);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_field_tick_follows_sim_tick() {
        let mut world = world_with_grid();
        world.insert_resource(SimTick(42));
        run(&mut world);
        assert_eq!(world.resource::<RadiationField>().tick(), 42);
    }
}
