//! Shared identifiers and value types used across the worldsim crates.

mod types;

pub use types::{EntityId, GameTime, Index3, SimulationId, Transform, UniverseId};
