//! Collaborator contracts consumed by the simulation.
//!
//! The resource manager, its chunk cache and the extension resolver are
//! injected into [`Simulation`] at construction. Implementations synchronize
//! themselves; every method takes `&self`.

use worldsim_common::UniverseId;

use crate::entity::Entity;
use crate::error::ResourceError;
use crate::notify::Subscription;
use crate::simulation::Simulation;

/// World/resource manager owning persistent universe state.
pub trait ResourceManager: Send + Sync {
    /// Create and load a fresh universe.
    fn new_universe(&self, name: &str, seed: i32) -> Result<UniverseId, ResourceError>;

    fn load_universe(&self, id: UniverseId) -> Result<(), ResourceError>;

    /// Release the current world session.
    fn unload_universe(&self) -> Result<(), ResourceError>;

    /// Prepare an entity that is about to be attached.
    fn initialize_entity(&self, _entity: &mut Entity) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Persist a detached entity.
    fn save_entity(&self, entity: &Entity) -> Result<(), ResourceError>;

    fn global_chunk_cache(&self) -> &dyn ChunkCache;

    /// Open a new subscription to entity-lifecycle notifications.
    fn subscribe(&self) -> Subscription;
}

/// Chunk cache hooks bracketing every simulation tick.
pub trait ChunkCache: Send + Sync {
    fn before_simulation_update(&self, simulation: &Simulation);
    fn after_simulation_update(&self, simulation: &Simulation);
}

/// Plugin hook that enriches simulations and entities.
pub trait ExtensionResolver: Send + Sync {
    /// Called once while the simulation is being constructed.
    fn extend_simulation(&self, _simulation: &mut Simulation) {}

    /// Called once per newly attached entity.
    fn extend_entity(&self, _entity: &mut Entity) {}
}

/// Resolver that installs nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExtensions;

impl ExtensionResolver for NoExtensions {}
