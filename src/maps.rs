//! Grid topology lookup.
//!
//! Answers "which grid owns this map position, and which tile is under it?"
//! for the propagation system. Grids are indexed per map so a lookup only
//! scans the grids that live on the queried map.

use crate::components::{MapId, Position};
use crate::grid::{GridId, TileGrid, TileIndex};
use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Registry of every grid, grouped by map.
#[derive(Resource, Debug, Default)]
pub struct MapGrids {
    grids: BTreeMap<GridId, TileGrid>,
    /// Map -> grids on that map, kept sorted by id so lookups are deterministic.
    by_map: HashMap<MapId, Vec<GridId>>,
}

/// A fully resolved emission point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epicenter {
    pub map: MapId,
    pub grid: GridId,
    pub tile: TileIndex,
}

impl MapGrids {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a grid, replacing any grid with the same id.
    pub fn insert(&mut self, grid: TileGrid) -> Option<TileGrid> {
        let previous = self.remove(grid.id);
        let ids = self.by_map.entry(grid.map).or_default();
        if let Err(slot) = ids.binary_search(&grid.id) {
            ids.insert(slot, grid.id);
        }
        self.grids.insert(grid.id, grid);
        previous
    }

    /// Remove a grid by id.
    pub fn remove(&mut self, id: GridId) -> Option<TileGrid> {
        let grid = self.grids.remove(&id)?;
        if let Some(ids) = self.by_map.get_mut(&grid.map) {
            ids.retain(|g| *g != id);
            if ids.is_empty() {
                self.by_map.remove(&grid.map);
            }
        }
        Some(grid)
    }

    pub fn get(&self, id: GridId) -> Option<&TileGrid> {
        self.grids.get(&id)
    }

    pub fn get_mut(&mut self, id: GridId) -> Option<&mut TileGrid> {
        self.grids.get_mut(&id)
    }

    /// Grids on a map, lowest id first.
    pub fn grids_on_map(&self, map: MapId) -> impl Iterator<Item = &TileGrid> {
        self.by_map
            .get(&map)
            .into_iter()
            .flatten()
            .filter_map(|id| self.grids.get(id))
    }

    /// The grid covering a world point. Overlapping grids resolve to the lowest id.
    pub fn find_grid_at(&self, map: MapId, x: f32, y: f32) -> Option<&TileGrid> {
        self.grids_on_map(map).find(|grid| grid.contains_world(x, y))
    }

    /// Resolve a position to its grid and tile. `None` when there is no grid
    /// under the point or the tile under it is space.
    pub fn resolve(&self, position: &Position) -> Option<Epicenter> {
        let grid = self.find_grid_at(position.map, position.x, position.y)?;
        let tile = grid.tile_ref_at(position.x, position.y)?;
        Some(Epicenter {
            map: position.map,
            grid: grid.id,
            tile,
        })
    }

    /// Total grid count.
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// All grids, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &TileGrid> {
        self.grids.values()
    }
}
