//! ECS Systems for the radiation simulation.
//!
//! Systems contain the game logic that operates on components.
//!
//! ## Schedule
//!
//! One fixed update runs:
//! - `radiation_propagation_system` - flood fills every enabled source and
//!   rebuilds the `RadiationField` resource.
//!
//! The `SimTick` clock is advanced by the driver in `api.rs` before the
//! schedule runs.

pub mod clock;
pub mod radiation;

pub use clock::*;
pub use radiation::*;
