//! Tile grids - the discrete spatial lattice radiation travels across.
//!
//! A grid is a rectangular block of tiles anchored somewhere on a map. World
//! positions are converted to integer tile indices here; the flood fill itself
//! works purely on [`TileIndex`] offsets.

use crate::components::MapId;
use serde::{Deserialize, Serialize};

/// Identifier for a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridId(pub u32);

/// Integer tile coordinate on a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: i32,
    pub y: i32,
}

impl TileIndex {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile one step away in `dir`.
    #[inline]
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The four axis-aligned neighbors, in [`Direction::CARDINALS`] order.
    #[inline]
    pub fn neighbors4(self) -> [TileIndex; 4] {
        Direction::CARDINALS.map(|dir| self.offset(dir))
    }

    /// Number of axis-aligned hops between two tiles.
    pub fn manhattan_distance(self, other: TileIndex) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Axis-aligned step direction. Diagonals are deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }
}

/// What occupies a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// No tile at all (vacuum). Cannot anchor an epicenter.
    Space,
    /// Walkable floor.
    #[default]
    Floor,
    /// Solid wall. Does not currently absorb radiation.
    Wall,
}

impl TileKind {
    /// Whether a tile reference exists for this kind.
    pub fn is_tile(self) -> bool {
        !matches!(self, TileKind::Space)
    }
}

/// Rectangular tile grid placed on a map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    pub id: GridId,
    pub map: MapId,
    /// Width of the grid in tiles.
    pub width: usize,
    /// Height of the grid in tiles.
    pub height: usize,
    /// Size of each tile in world units.
    pub tile_size: f32,
    /// Origin offset (world position of tile 0,0's lower-left corner).
    pub origin_x: f32,
    pub origin_y: f32,
    /// Tile kinds (row-major order).
    pub tiles: Vec<TileKind>,
}

impl TileGrid {
    /// Create a grid of floor tiles with its lower-left corner at `(origin_x, origin_y)`.
    pub fn new(
        id: GridId,
        map: MapId,
        width: usize,
        height: usize,
        tile_size: f32,
        origin_x: f32,
        origin_y: f32,
    ) -> Self {
        Self {
            id,
            map,
            width,
            height,
            tile_size,
            origin_x,
            origin_y,
            tiles: vec![TileKind::Floor; width * height],
        }
    }

    /// Create a floor grid centred on the map origin.
    pub fn centered(id: GridId, map: MapId, width: usize, height: usize, tile_size: f32) -> Self {
        let origin_x = -(width as f32 * tile_size) / 2.0;
        let origin_y = -(height as f32 * tile_size) / 2.0;
        Self::new(id, map, width, height, tile_size, origin_x, origin_y)
    }

    /// A small station layout: a floor room ringed by walls, surrounded by space.
    pub fn new_with_room(id: GridId, map: MapId, width: usize, height: usize, tile_size: f32) -> Self {
        let mut grid = Self::centered(id, map, width, height, tile_size);
        grid.tiles.fill(TileKind::Space);

        let margin = 2;
        if width > margin * 2 && height > margin * 2 {
            for y in margin..height - margin {
                for x in margin..width - margin {
                    let edge = x == margin || y == margin || x == width - margin - 1 || y == height - margin - 1;
                    let kind = if edge { TileKind::Wall } else { TileKind::Floor };
                    grid.set_tile(TileIndex::new(x as i32, y as i32), kind);
                }
            }
        }
        grid
    }

    fn tile_slot(&self, tile: TileIndex) -> Option<usize> {
        if tile.x < 0 || tile.y < 0 {
            return None;
        }
        let (x, y) = (tile.x as usize, tile.y as usize);
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Tile kind at an index, or `None` outside the grid.
    pub fn tile(&self, tile: TileIndex) -> Option<TileKind> {
        self.tile_slot(tile).map(|i| self.tiles[i])
    }

    /// Overwrite a tile. Returns `false` if the index is outside the grid.
    pub fn set_tile(&mut self, tile: TileIndex, kind: TileKind) -> bool {
        match self.tile_slot(tile) {
            Some(i) => {
                self.tiles[i] = kind;
                true
            }
            None => false,
        }
    }

    /// Whether a world point lies within the grid's bounds.
    pub fn contains_world(&self, world_x: f32, world_y: f32) -> bool {
        let (min_x, min_y, max_x, max_y) = self.bounds();
        world_x >= min_x && world_x < max_x && world_y >= min_y && world_y < max_y
    }

    /// Convert world coordinates to a tile index. `None` outside the grid.
    pub fn world_to_tile(&self, world_x: f32, world_y: f32) -> Option<TileIndex> {
        if !self.contains_world(world_x, world_y) {
            return None;
        }
        let tx = ((world_x - self.origin_x) / self.tile_size).floor() as i32;
        let ty = ((world_y - self.origin_y) / self.tile_size).floor() as i32;
        let tile = TileIndex::new(tx, ty);
        // Guard against float rounding at the far edge.
        self.tile_slot(tile).map(|_| tile)
    }

    /// Convert a tile index to world coordinates (center of tile).
    pub fn tile_to_world(&self, tile: TileIndex) -> (f32, f32) {
        let world_x = self.origin_x + (tile.x as f32 + 0.5) * self.tile_size;
        let world_y = self.origin_y + (tile.y as f32 + 0.5) * self.tile_size;
        (world_x, world_y)
    }

    /// Resolve the tile under a world point, requiring an actual tile (not space).
    pub fn tile_ref_at(&self, world_x: f32, world_y: f32) -> Option<TileIndex> {
        let tile = self.world_to_tile(world_x, world_y)?;
        self.tile(tile).filter(|kind| kind.is_tile()).map(|_| tile)
    }

    /// World bounds as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let max_x = self.origin_x + self.width as f32 * self.tile_size;
        let max_y = self.origin_y + self.height as f32 * self.tile_size;
        (self.origin_x, self.origin_y, max_x, max_y)
    }
}

/// Snapshot of a grid's layout for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub id: u32,
    pub map: u32,
    pub width: usize,
    pub height: usize,
    pub tile_size: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    /// Flattened tile kinds (as u8: 0 = space, 1 = floor, 2 = wall).
    pub kinds: Vec<u8>,
}

impl GridSnapshot {
    pub fn from_grid(grid: &TileGrid) -> Self {
        Self {
            id: grid.id.0,
            map: grid.map.0,
            width: grid.width,
            height: grid.height,
            tile_size: grid.tile_size,
            origin_x: grid.origin_x,
            origin_y: grid.origin_y,
            kinds: grid.tiles.iter().map(|k| *k as u8).collect(),
        }
    }
}
