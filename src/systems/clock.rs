//! Simulation clock resources.

use bevy_ecs::prelude::*;

/// Global simulation tick counter.
/// Increments once per fixed update.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}
