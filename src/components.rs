//! ECS Components for the radiation simulation.
//!
//! Components are pure data containers attached to entities.
//! All propagation logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Identifier for a map (a disjoint world space that may hold several grids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MapId(pub u32);

/// World position of an entity: which map it is on, and where.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub map: MapId,
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(map: MapId, x: f32, y: f32) -> Self {
        Self { map, x, y }
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Unique identifier for a radiation source.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SourceId(pub u32);

// ============================================================================
// RADIATION COMPONENTS
// ============================================================================

/// An emitter of radiation.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiationSource {
    /// Rads per second delivered at the epicenter tile.
    pub intensity: f32,
    /// Configured falloff per tile. Only consulted under `DecayPolicy::SourceSlope`.
    pub slope: f32,
    /// Disabled sources are skipped by the propagation system.
    pub enabled: bool,
    /// Multiply intensity by the entity's [`StackCount`] when present.
    pub scale_by_stack: bool,
}

impl Default for RadiationSource {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            slope: 0.5,
            enabled: true,
            scale_by_stack: false,
        }
    }
}

impl RadiationSource {
    pub fn new(intensity: f32) -> Self {
        Self {
            intensity,
            ..Default::default()
        }
    }

    pub fn with_slope(mut self, slope: f32) -> Self {
        self.slope = slope;
        self
    }

    pub fn stack_scaled(mut self) -> Self {
        self.scale_by_stack = true;
        self
    }

    /// Intensity injected at the epicenter, after stack scaling.
    pub fn effective_intensity(&self, stack: Option<&StackCount>) -> f32 {
        match stack {
            Some(count) if self.scale_by_stack => self.intensity * count.0 as f32,
            _ => self.intensity,
        }
    }
}

/// Number of items in a stack (e.g. a pile of uranium sheets).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackCount(pub u32);

impl Default for StackCount {
    fn default() -> Self {
        Self(1)
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete radiation source entity.
#[derive(Bundle, Default)]
pub struct RadiationSourceBundle {
    pub id: SourceId,
    pub position: Position,
    pub source: RadiationSource,
}

impl RadiationSourceBundle {
    pub fn new(id: u32, position: Position, source: RadiationSource) -> Self {
        Self {
            id: SourceId(id),
            position,
            source,
        }
    }
}
