//! Snapshot types.
//!
//! The `Snapshot` struct provides a serializable view of the radiation state:
//! every source and, for those that resolved this tick, its fill.

use crate::components::*;
use crate::propagation::RadiationFill;
use crate::systems::radiation::RadiationField;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single source's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub id: u32,
    pub map: u32,
    pub x: f32,
    pub y: f32,
    pub intensity: f32,
    pub slope: f32,
    pub enabled: bool,
}

/// One tile of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub x: i32,
    pub y: i32,
    pub rads: f32,
}

/// A single source's fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSnapshot {
    pub source: u32,
    pub map: u32,
    pub grid: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub intensity: f32,
    /// Sorted by (y, x).
    pub tiles: Vec<TileSnapshot>,
}

impl FillSnapshot {
    pub fn from_fill(fill: &RadiationFill) -> Self {
        Self {
            source: fill.source.0,
            map: fill.map.0,
            grid: fill.grid.0,
            origin_x: fill.origin.x,
            origin_y: fill.origin.y,
            intensity: fill.intensity,
            tiles: fill
                .sorted_tiles()
                .into_iter()
                .map(|(t, rads)| TileSnapshot { x: t.x, y: t.y, rads })
                .collect(),
        }
    }
}

/// Complete radiation state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// All sources, sorted by id.
    pub sources: Vec<SourceSnapshot>,
    /// Fills computed on the last tick, sorted by source id.
    pub fills: Vec<FillSnapshot>,
    /// Sources whose epicenter did not resolve on the last tick.
    pub unresolved: Vec<u32>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut query = world.query::<(&SourceId, &Position, &RadiationSource)>();
        let mut sources: Vec<SourceSnapshot> = query
            .iter(world)
            .map(|(id, pos, source)| SourceSnapshot {
                id: id.0,
                map: pos.map.0,
                x: pos.x,
                y: pos.y,
                intensity: source.intensity,
                slope: source.slope,
                enabled: source.enabled,
            })
            .collect();
        sources.sort_by_key(|s| s.id);

        let (mut fills, mut unresolved) = match world.get_resource::<RadiationField>() {
            Some(field) => (
                field.fills().map(FillSnapshot::from_fill).collect::<Vec<_>>(),
                field.unresolved().iter().map(|id| id.0).collect::<Vec<_>>(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        fills.sort_by_key(|f| f.source);
        unresolved.sort_unstable();

        Self {
            tick,
            time,
            sources,
            fills,
            unresolved,
        }
    }

    /// Total rads recorded at a tile across every fill on a grid.
    pub fn rads_at(&self, grid: u32, x: i32, y: i32) -> f32 {
        self.fills
            .iter()
            .filter(|f| f.grid == grid)
            .flat_map(|f| f.tiles.iter())
            .filter(|t| t.x == x && t.y == y)
            .map(|t| t.rads)
            .sum()
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_json_restores_fills() {
        let snapshot = Snapshot {
            tick: 42,
            time: 1.4,
            sources: vec![SourceSnapshot {
                id: 1,
                map: 1,
                x: 10.5,
                y: 10.5,
                intensity: 2.0,
                slope: 0.5,
                enabled: true,
            }],
            fills: vec![FillSnapshot {
                source: 1,
                map: 1,
                grid: 3,
                origin_x: 10,
                origin_y: 10,
                intensity: 2.0,
                tiles: vec![
                    TileSnapshot { x: 10, y: 9, rads: 1.0 },
                    TileSnapshot { x: 10, y: 10, rads: 2.0 },
                ],
            }],
            unresolved: vec![7],
        };

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"unresolved\":[7]"));
        let restored = Snapshot::from_json(&json).unwrap();

        assert_eq!(restored.tick, 42);
        assert_eq!(restored.fills[0].grid, 3);
        assert_eq!(restored.rads_at(3, 10, 10), 2.0);
        assert_eq!(restored.rads_at(3, 0, 0), 0.0);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Snapshot::from_json("not json").is_err());
        let pretty = Snapshot::default().to_json_pretty().unwrap();
        assert_eq!(Snapshot::from_json(&pretty).unwrap(), Snapshot::default());
    }
}
