use std::collections::BTreeMap;
use std::sync::Arc;

use worldsim_common::{EntityId, GameTime, SimulationId, UniverseId};

use crate::component::{ComponentList, ComponentValidator, SimulationComponent};
use crate::entity::EntityHandle;
use crate::error::SimulationError;
use crate::notify::{Notification, Subscription};
use crate::resource::{ExtensionResolver, ResourceManager};

/// Lifecycle of a simulation. `Ready` is the only initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationState {
    /// Constructed; components may still be registered.
    Ready,
    Running,
    Paused,
    /// The session has ended. Terminal.
    Finished,
}

impl SimulationState {
    /// Whether entities may be attached or detached in this state.
    pub fn accepts_entities(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// The authoritative set of live entities and the components acting on them.
///
/// # Invariants
/// - Every tracked entity is bound to this simulation with a non-zero id.
/// - The component registry only changes while `Ready`.
/// - Entity ids come from a counter that starts at 1 and never goes back.
pub struct Simulation {
    id: SimulationId,
    state: SimulationState,
    /// BTreeMap for a stable per-tick iteration order.
    entities: BTreeMap<EntityId, EntityHandle>,
    components: ComponentList<dyn SimulationComponent>,
    next_id: i32,
    resources: Arc<dyn ResourceManager>,
    extensions: Arc<dyn ExtensionResolver>,
    subscription: Option<Subscription>,
}

impl Simulation {
    /// Create a simulation in the `Ready` state.
    ///
    /// Subscribes to the resource manager's notifications and lets the
    /// extension resolver register components.
    pub fn new(
        resources: Arc<dyn ResourceManager>,
        extensions: Arc<dyn ExtensionResolver>,
    ) -> Self {
        let subscription = resources.subscribe();
        let mut simulation = Self {
            id: SimulationId::new(),
            state: SimulationState::Ready,
            entities: BTreeMap::new(),
            components: ComponentList::new(),
            next_id: 1,
            resources,
            extensions: Arc::clone(&extensions),
            subscription: Some(subscription),
        };
        extensions.extend_simulation(&mut simulation);
        tracing::debug!(
            simulation = ?simulation.id,
            components = simulation.components.len(),
            "simulation created"
        );
        simulation
    }

    pub fn id(&self) -> SimulationId {
        self.id
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Attached entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityHandle> {
        self.entities.values()
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityHandle> {
        self.entities.get(&id)
    }

    pub fn components(&self) -> &ComponentList<dyn SimulationComponent> {
        &self.components
    }

    /// Whether the notification subscription is still open.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Register a component. Only legal while `Ready`.
    ///
    /// Returns `Ok(false)` if a component of the same type is already present.
    pub fn add_component<C: SimulationComponent>(
        &mut self,
        component: C,
    ) -> Result<bool, SimulationError> {
        self.ensure_ready("add_component")?;
        Ok(self.components.add(component)?)
    }

    /// Unregister the component of type `C`. Only legal while `Ready`.
    pub fn remove_component<C: SimulationComponent>(&mut self) -> Result<bool, SimulationError> {
        self.ensure_ready("remove_component")?;
        Ok(self.components.remove::<C>()?)
    }

    /// Install validators consulted on component registration and removal.
    pub fn set_component_validators(
        &mut self,
        on_add: Option<ComponentValidator<dyn SimulationComponent>>,
        on_remove: Option<ComponentValidator<dyn SimulationComponent>>,
    ) {
        self.components.set_add_validator(on_add);
        self.components.set_remove_validator(on_remove);
    }

    /// Create a universe and start running it.
    pub fn new_game(&mut self, name: &str, seed: i32) -> Result<UniverseId, SimulationError> {
        self.ensure_ready("new_game")?;
        let universe = self.resources.new_universe(name, seed)?;
        tracing::info!(%universe, name, seed, "new game");
        self.start()?;
        Ok(universe)
    }

    /// Load an existing universe and start running it.
    pub fn load_game(&mut self, universe: UniverseId) -> Result<(), SimulationError> {
        self.ensure_ready("load_game")?;
        self.resources.load_universe(universe)?;
        tracing::info!(%universe, "game loaded");
        self.start()
    }

    fn start(&mut self) -> Result<(), SimulationError> {
        self.ensure_ready("start")?;
        self.transition(SimulationState::Running);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SimulationError> {
        if self.state != SimulationState::Running {
            return Err(self.invalid_state("pause"));
        }
        self.transition(SimulationState::Paused);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SimulationError> {
        if self.state != SimulationState::Paused {
            return Err(self.invalid_state("resume"));
        }
        self.transition(SimulationState::Running);
        Ok(())
    }

    /// End the session.
    ///
    /// Detaches (and thereby persists) every entity, moves through `Paused`
    /// to `Finished` and releases the universe.
    pub fn exit_game(&mut self) -> Result<(), SimulationError> {
        if !self.state.accepts_entities() {
            return Err(self.invalid_state("exit_game"));
        }
        let attached: Vec<EntityHandle> = self.entities.values().cloned().collect();
        for entity in &attached {
            self.remove_entity(entity)?;
        }
        self.transition(SimulationState::Paused);
        self.transition(SimulationState::Finished);
        self.resources.unload_universe()?;
        tracing::info!(simulation = ?self.id, "game exited");
        Ok(())
    }

    /// Advance one tick.
    ///
    /// Does nothing unless `Running`. Pending notifications are applied
    /// first, then the chunk cache's pre-update hook, entity updates over a
    /// snapshot of the entity set, enabled components in registration order,
    /// and the post-update hook.
    pub fn update(&mut self, time: &GameTime) -> Result<(), SimulationError> {
        if self.state != SimulationState::Running {
            return Ok(());
        }
        self.process_notifications()?;

        let resources = Arc::clone(&self.resources);
        let cache = resources.global_chunk_cache();
        cache.before_simulation_update(self);

        let snapshot: Vec<EntityHandle> = self.entities.values().cloned().collect();
        for handle in &snapshot {
            let mut entity = handle.write();
            if entity.is_updatable() {
                entity.update(time);
            }
        }

        for component in self.components.iter_mut() {
            if component.enabled() {
                component.update(time);
            }
        }

        cache.after_simulation_update(self);
        tracing::trace!(
            entities = snapshot.len(),
            elapsed = ?time.elapsed,
            "tick complete"
        );
        Ok(())
    }

    /// Attach an entity.
    ///
    /// Legal while `Running` or `Paused`. Re-adding a tracked entity is a
    /// no-op. An entity bound to another simulation is rejected.
    ///
    /// The extension resolver runs before the resource manager initializes
    /// the entity. If initialization fails the entity stays detached and the
    /// id counter is untouched, but the extension's changes are kept; a
    /// resolver must tolerate seeing the same entity again on retry.
    pub fn add_entity(&mut self, entity: &EntityHandle) -> Result<(), SimulationError> {
        if !self.state.accepts_entities() {
            return Err(self.invalid_state("add_entity"));
        }

        let preset = {
            let e = entity.read();
            if let Some(owner) = e.simulation() {
                if owner != self.id {
                    return Err(SimulationError::OwnershipConflict {
                        entity: e.id(),
                        owner,
                    });
                }
            }
            e.id()
        };
        if self.is_tracked(preset, entity) {
            return Ok(());
        }
        if preset.is_assigned() && self.entities.contains_key(&preset) {
            return Err(SimulationError::InvalidArgument(format!(
                "entity id {preset} is already used by another entity"
            )));
        }

        let (id, next_id) = self.allocate_id(preset)?;
        {
            let mut e = entity.write();
            self.extensions.extend_entity(&mut e);
            e.initialize(self.resources.as_ref())?;
            e.bind(self.id, id);
        }
        self.next_id = next_id;
        self.entities.insert(id, Arc::clone(entity));

        for component in self.components.iter_mut() {
            component.on_entity_added(entity);
        }
        tracing::debug!(entity = %id, "entity added");
        Ok(())
    }

    /// Detach an entity and hand it to the resource manager for saving.
    ///
    /// An entity without identity is ignored. Components are notified before
    /// the entity loses its id and simulation binding.
    pub fn remove_entity(&mut self, entity: &EntityHandle) -> Result<(), SimulationError> {
        let (id, owner) = {
            let e = entity.read();
            (e.id(), e.simulation())
        };
        if !id.is_assigned() {
            return Ok(());
        }
        match owner {
            // id without owner: nothing to detach from
            None => return Ok(()),
            Some(owner) if owner != self.id => {
                return Err(SimulationError::OwnershipConflict { entity: id, owner });
            }
            Some(_) => {}
        }
        if !self.state.accepts_entities() {
            return Err(self.invalid_state("remove_entity"));
        }

        for component in self.components.iter_mut() {
            component.on_entity_removed(entity);
        }

        entity.write().unbind();
        if self.is_tracked(id, entity) {
            self.entities.remove(&id);
        }

        self.resources.save_entity(&entity.read())?;
        tracing::debug!(entity = %id, "entity removed");
        Ok(())
    }

    /// Apply every pending notification.
    ///
    /// `Add`/`Remove` go through [`add_entity`](Self::add_entity) and
    /// [`remove_entity`](Self::remove_entity); their errors propagate. An
    /// upstream error is returned as [`SimulationError::Upstream`].
    /// Completion disposes the subscription. Returns the number of entity
    /// notifications applied.
    pub fn process_notifications(&mut self) -> Result<usize, SimulationError> {
        let mut applied = 0;
        loop {
            let Some(next) = self.subscription.as_ref().and_then(Subscription::try_next) else {
                return Ok(applied);
            };
            match next {
                Notification::Add(entity) => {
                    self.add_entity(&entity)?;
                    applied += 1;
                }
                Notification::Remove(entity) => {
                    self.remove_entity(&entity)?;
                    applied += 1;
                }
                Notification::Error(message) => {
                    tracing::warn!(%message, "notification stream failed");
                    return Err(SimulationError::Upstream(message));
                }
                Notification::Completed => {
                    self.close_subscription();
                    return Ok(applied);
                }
            }
        }
    }

    /// Dispose the notification subscription. Safe to call repeatedly.
    pub fn close_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.dispose();
            tracing::debug!(simulation = ?self.id, "notification subscription closed");
        }
    }

    /// Pick the id for an entity and the counter value that follows it.
    ///
    /// A pre-assigned id is kept and still consumes one counter step. A fresh
    /// id skips values already held by tracked entities.
    fn allocate_id(&self, preset: EntityId) -> Result<(EntityId, i32), SimulationError> {
        let step = |n: i32| n.checked_add(1).ok_or(SimulationError::IdsExhausted);
        if preset.is_assigned() {
            return Ok((preset, step(self.next_id)?));
        }
        let mut candidate = self.next_id;
        while self.entities.contains_key(&EntityId(candidate)) {
            candidate = step(candidate)?;
        }
        Ok((EntityId(candidate), step(candidate)?))
    }

    fn is_tracked(&self, id: EntityId, entity: &EntityHandle) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|tracked| Arc::ptr_eq(tracked, entity))
    }

    fn ensure_ready(&self, operation: &'static str) -> Result<(), SimulationError> {
        if self.state == SimulationState::Ready {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn invalid_state(&self, operation: &'static str) -> SimulationError {
        SimulationError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn transition(&mut self, to: SimulationState) {
        tracing::debug!(from = ?self.state, ?to, "simulation state change");
        self.state = to;
    }
}

impl Drop for Simulation {
    /// Tracked entities are released unsaved, free to join another simulation.
    fn drop(&mut self) {
        self.close_subscription();
        for (_, entity) in std::mem::take(&mut self.entities) {
            let mut e = entity.write();
            if e.simulation() == Some(self.id) {
                e.unbind();
            }
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("entities", &self.entities.len())
            .field("components", &self.components)
            .field("next_id", &self.next_id)
            .field("subscribed", &self.subscription.is_some())
            .finish()
    }
}
