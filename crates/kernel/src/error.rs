use worldsim_common::{EntityId, SimulationId, UniverseId};

use crate::simulation::SimulationState;

/// Errors surfaced by the simulation lifecycle operations.
///
/// Every error is returned to the immediate caller; the kernel never retries.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The operation is forbidden in the current lifecycle state.
    #[error("{operation} is not allowed while the simulation is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SimulationState,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The entity is bound to another simulation.
    #[error("entity {entity} belongs to simulation {owner:?}")]
    OwnershipConflict {
        entity: EntityId,
        owner: SimulationId,
    },
    /// Every positive entity id has been handed out.
    #[error("entity id space exhausted")]
    IdsExhausted,
    /// A fatal signal delivered through the notification stream.
    #[error("notification stream failed: {0}")]
    Upstream(String),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// A component validator vetoed an insertion or removal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("component {component} rejected: {reason}")]
pub struct ComponentError {
    pub component: &'static str,
    pub reason: String,
}

impl ComponentError {
    pub fn new(component: &'static str, reason: impl Into<String>) -> Self {
        Self {
            component,
            reason: reason.into(),
        }
    }
}

/// Failures reported by a resource manager implementation.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("universe {0} not found")]
    UniverseNotFound(UniverseId),
    #[error("no universe loaded")]
    NoUniverseLoaded,
    #[error("entity rejected by resource manager: {0}")]
    EntityRejected(String),
    #[error(transparent)]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}
