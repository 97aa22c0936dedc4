use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use worldsim_common::{EntityId, GameTime, SimulationId, Transform};

use crate::component::{ComponentList, EntityComponent};
use crate::error::ResourceError;
use crate::resource::ResourceManager;

/// Shared handle to an entity.
///
/// The simulation, the resource manager and notification producers all hold
/// clones of the same handle; identity comparisons use `Arc::ptr_eq`.
pub type EntityHandle = Arc<RwLock<Entity>>;

/// Per-tick behavior of an entity.
pub trait EntityBehavior: Send + Sync {
    fn update(&mut self, transform: &mut Transform, time: &GameTime);
}

/// A simulatable world object.
///
/// `id` is zero and `simulation` is `None` while the entity is detached.
/// Only the simulation binds and unbinds entities.
pub struct Entity {
    id: EntityId,
    simulation: Option<SimulationId>,
    definition: String,
    pub transform: Transform,
    components: ComponentList<dyn EntityComponent>,
    behavior: Option<Box<dyn EntityBehavior>>,
}

impl Entity {
    /// Create a detached entity of the given content definition.
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            ..Self::default()
        }
    }

    /// Attach a per-tick behavior, making the entity updatable.
    pub fn with_behavior(mut self, behavior: impl EntityBehavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Wrap the entity in a shared handle.
    pub fn into_handle(self) -> EntityHandle {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Pre-assign an identity (persistence restore). Attaching keeps it.
    pub fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// The simulation this entity is bound to, if any.
    pub fn simulation(&self) -> Option<SimulationId> {
        self.simulation
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn set_definition(&mut self, definition: impl Into<String>) {
        self.definition = definition.into();
    }

    pub fn components(&self) -> &ComponentList<dyn EntityComponent> {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentList<dyn EntityComponent> {
        &mut self.components
    }

    /// Whether the entity exposes an update hook.
    pub fn is_updatable(&self) -> bool {
        self.behavior.is_some()
    }

    /// Run the update hook, if any.
    pub fn update(&mut self, time: &GameTime) {
        if let Some(behavior) = self.behavior.as_mut() {
            behavior.update(&mut self.transform, time);
        }
    }

    /// Prepare the entity against the resource manager before attachment.
    pub fn initialize(&mut self, resources: &dyn ResourceManager) -> Result<(), ResourceError> {
        resources.initialize_entity(self)
    }

    pub(crate) fn bind(&mut self, simulation: SimulationId, id: EntityId) {
        self.simulation = Some(simulation);
        self.id = id;
    }

    pub(crate) fn unbind(&mut self) {
        self.simulation = None;
        self.id = EntityId::NONE;
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            id: EntityId::NONE,
            simulation: None,
            definition: String::new(),
            transform: Transform::default(),
            components: ComponentList::new(),
            behavior: None,
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("simulation", &self.simulation)
            .field("definition", &self.definition)
            .field("transform", &self.transform)
            .field("components", &self.components)
            .field("updatable", &self.is_updatable())
            .finish()
    }
}
