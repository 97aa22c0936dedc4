//! Simulation kernel: entity lifecycle, component registry and the tick state machine.
//!
//! # Invariants
//! - An entity is attached to at most one simulation; its id is non-zero while attached.
//! - Components are only registered before the simulation starts.
//! - A tick runs entities, then enabled components in registration order,
//!   bracketed by the chunk cache hooks.

pub mod clock;
pub mod component;
pub mod entity;
pub mod error;
pub mod notify;
pub mod resource;
pub mod simulation;

#[cfg(test)]
mod testing;

pub use clock::{FixedStepClock, SimulationConfig, TickTimer};
pub use component::{
    ComponentList, ComponentValidator, EntityComponent, IntoComponent, SimulationComponent,
};
pub use entity::{Entity, EntityBehavior, EntityHandle};
pub use error::{ComponentError, ResourceError, SimulationError};
pub use notify::{Notification, NotificationHub, Subscription};
pub use resource::{ChunkCache, ExtensionResolver, NoExtensions, ResourceManager};
pub use simulation::{Simulation, SimulationState};
