//! Radiation flood fill.
//!
//! Radiation spreads from an epicenter tile outward over axis-aligned
//! neighbors, losing a fixed amount per hop until nothing is left.
//!
//! ## Algorithm
//!
//! Breadth-first over a FIFO queue seeded with `(origin, intensity)`:
//!
//! 1. Pop `(tile, rads)`. If `tile` was already recorded, drop the entry.
//! 2. Record `tile -> rads`.
//! 3. `next = rads - decay_per_hop`. If `next` is not positive, or the tile is
//!    already `max_hops` away from the origin, stop this branch.
//! 4. Otherwise push all four cardinal neighbors with `next`.
//!
//! Because every hop costs the same, FIFO order means the first arrival at a
//! tile is along a shortest hop path, so each tile records
//! `intensity - hops * decay_per_hop`.
//!
//! The lattice is unbounded: neighbors are plain index offsets and are not
//! checked against the grid. Only the epicenter needs to resolve to a tile.
//!
//! ## Termination
//!
//! In exact arithmetic the decay reaches zero after `ceil(intensity / decay_per_hop)`
//! hops. In `f32` a decay below half an ULP of the intensity leaves it unchanged,
//! so such inputs are rejected up front, as is any fill that would need more
//! than `max_hops` hops. The hop counter also bounds every branch at run time.

use crate::components::{MapId, Position, SourceId};
use crate::grid::{GridId, TileIndex};
use crate::maps::MapGrids;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Intensity removed per hop unless configured otherwise.
pub const DEFAULT_DECAY_PER_HOP: f32 = 1.0;

/// Largest fill radius, in hops, accepted unless configured otherwise.
pub const DEFAULT_MAX_HOPS: u32 = 1024;

/// Tile -> incoming rads for a single fill.
pub type TileRadiationMap = HashMap<TileIndex, f32>;

/// Tuning for a single flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodFillOptions {
    /// Intensity lost per hop. Must be positive and finite.
    pub decay_per_hop: f32,
    /// Check the visited set before enqueueing a neighbor. Output is identical
    /// either way; this only trims redundant queue entries.
    pub skip_visited_neighbors: bool,
    /// Fills that would reach further than this are rejected.
    pub max_hops: u32,
}

impl Default for FloodFillOptions {
    fn default() -> Self {
        Self {
            decay_per_hop: DEFAULT_DECAY_PER_HOP,
            skip_visited_neighbors: false,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl FloodFillOptions {
    pub fn with_decay(decay_per_hop: f32) -> Self {
        Self {
            decay_per_hop,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), PropagationError> {
        // Written so NaN fails too.
        if !(self.decay_per_hop > 0.0) || !self.decay_per_hop.is_finite() {
            return Err(PropagationError::NonPositiveDecay(self.decay_per_hop));
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PropagationError {
    #[error("decay per hop must be positive and finite, got {0}")]
    NonPositiveDecay(f32),
    #[error("source intensity must be finite, got {0}")]
    NonFiniteIntensity(f32),
    #[error("decay {decay} is below f32 precision at intensity {intensity}")]
    DecayBelowPrecision { intensity: f32, decay: f32 },
    #[error("fill needs {required} hops, limit is {max_hops}")]
    HopLimitExceeded { required: u64, max_hops: u32 },
}

/// Hops a fill starting at `rads` spreads before the decay stops it.
fn hops_needed(rads: f32, decay_per_hop: f32) -> u64 {
    let hops = (f64::from(rads) / f64::from(decay_per_hop)).ceil() - 1.0;
    // Saturating cast.
    hops.max(0.0) as u64
}

/// Result of one source's fill.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiationFill {
    pub source: SourceId,
    pub map: MapId,
    pub grid: GridId,
    pub origin: TileIndex,
    /// Intensity injected at the origin.
    pub intensity: f32,
    pub tiles: TileRadiationMap,
}

impl RadiationFill {
    /// Rads recorded at a tile, if the fill reached it.
    pub fn intensity_at(&self, tile: TileIndex) -> Option<f32> {
        self.tiles.get(&tile).copied()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Tiles sorted by `(y, x)`, for stable output.
    pub fn sorted_tiles(&self) -> Vec<(TileIndex, f32)> {
        let mut tiles: Vec<_> = self.tiles.iter().map(|(t, r)| (*t, *r)).collect();
        tiles.sort_by_key(|(t, _)| (t.y, t.x));
        tiles
    }
}

/// Flood fill outward from `origin`, starting at `rads_per_second`.
///
/// A non-positive intensity still records the origin (with the input value)
/// but never spreads past it.
///
/// Errors when the options are invalid, the intensity is not finite, or the
/// fill would not terminate within `options.max_hops`.
pub fn flood_fill(
    origin: TileIndex,
    rads_per_second: f32,
    options: &FloodFillOptions,
) -> Result<TileRadiationMap, PropagationError> {
    options.validate()?;
    if !rads_per_second.is_finite() {
        return Err(PropagationError::NonFiniteIntensity(rads_per_second));
    }
    if rads_per_second > 0.0 {
        if rads_per_second - options.decay_per_hop >= rads_per_second {
            return Err(PropagationError::DecayBelowPrecision {
                intensity: rads_per_second,
                decay: options.decay_per_hop,
            });
        }
        let required = hops_needed(rads_per_second, options.decay_per_hop);
        if required > u64::from(options.max_hops) {
            return Err(PropagationError::HopLimitExceeded {
                required,
                max_hops: options.max_hops,
            });
        }
    }

    let mut visited = TileRadiationMap::new();
    let mut queue = VecDeque::new();
    queue.push_back((origin, rads_per_second, 0u32));

    while let Some((tile, incoming, hops)) = queue.pop_front() {
        if visited.contains_key(&tile) {
            continue;
        }
        visited.insert(tile, incoming);

        let next = incoming - options.decay_per_hop;
        if !(next > 0.0) || hops >= options.max_hops {
            continue;
        }

        for neighbor in tile.neighbors4() {
            if options.skip_visited_neighbors && visited.contains_key(&neighbor) {
                continue;
            }
            queue.push_back((neighbor, next, hops + 1));
        }
    }

    Ok(visited)
}

/// Resolve `position` against the grid topology and flood fill from it.
///
/// Returns `Ok(None)` when the position has no grid or no tile under it.
pub fn propagate(
    grids: &MapGrids,
    source: SourceId,
    position: &Position,
    rads_per_second: f32,
    options: &FloodFillOptions,
) -> Result<Option<RadiationFill>, PropagationError> {
    let Some(epicenter) = grids.resolve(position) else {
        return Ok(None);
    };

    let tiles = flood_fill(epicenter.tile, rads_per_second, options)?;
    Ok(Some(RadiationFill {
        source,
        map: epicenter.map,
        grid: epicenter.grid,
        origin: epicenter.tile,
        intensity: rads_per_second,
        tiles,
    }))
}
