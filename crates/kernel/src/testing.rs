//! Recording fakes for the collaborator contracts.

use std::sync::Arc;

use parking_lot::Mutex;
use worldsim_common::{EntityId, GameTime, Transform, UniverseId};

use crate::component::SimulationComponent;
use crate::entity::{Entity, EntityBehavior, EntityHandle};
use crate::error::ResourceError;
use crate::notify::{NotificationHub, Subscription};
use crate::resource::{ChunkCache, ExtensionResolver, ResourceManager};
use crate::simulation::{Simulation, SimulationState};

/// Shared, ordered record of hook invocations.
pub type CallLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct SavedEntity {
    pub id: EntityId,
    pub definition: String,
    pub bound: bool,
}

pub struct RecordingCache {
    log: CallLog,
    pub states_seen: Mutex<Vec<SimulationState>>,
}

impl ChunkCache for RecordingCache {
    fn before_simulation_update(&self, simulation: &Simulation) {
        self.states_seen.lock().push(simulation.state());
        self.log.lock().push("cache:before".into());
    }

    fn after_simulation_update(&self, _simulation: &Simulation) {
        self.log.lock().push("cache:after".into());
    }
}

pub struct FakeResources {
    pub log: CallLog,
    pub hub: NotificationHub,
    pub cache: RecordingCache,
    pub saved: Mutex<Vec<SavedEntity>>,
    pub created: Mutex<Vec<(String, i32)>>,
    pub loaded: Mutex<Option<UniverseId>>,
    pub unloads: Mutex<usize>,
    /// Definitions `initialize_entity` refuses.
    pub refused: Mutex<Vec<String>>,
}

impl FakeResources {
    pub fn new() -> Arc<Self> {
        let log = CallLog::default();
        Arc::new(Self {
            log: Arc::clone(&log),
            hub: NotificationHub::new(),
            cache: RecordingCache {
                log,
                states_seen: Mutex::new(Vec::new()),
            },
            saved: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            loaded: Mutex::new(None),
            unloads: Mutex::new(0),
            refused: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn saves_of(&self, definition: &str) -> usize {
        self.saved
            .lock()
            .iter()
            .filter(|s| s.definition == definition)
            .count()
    }
}

impl ResourceManager for FakeResources {
    fn new_universe(&self, name: &str, seed: i32) -> Result<UniverseId, ResourceError> {
        self.created.lock().push((name.to_string(), seed));
        let id = UniverseId::new();
        *self.loaded.lock() = Some(id);
        Ok(id)
    }

    fn load_universe(&self, id: UniverseId) -> Result<(), ResourceError> {
        *self.loaded.lock() = Some(id);
        Ok(())
    }

    fn unload_universe(&self) -> Result<(), ResourceError> {
        *self.loaded.lock() = None;
        *self.unloads.lock() += 1;
        Ok(())
    }

    fn initialize_entity(&self, entity: &mut Entity) -> Result<(), ResourceError> {
        if self.refused.lock().iter().any(|d| d == entity.definition()) {
            return Err(ResourceError::EntityRejected(entity.definition().to_string()));
        }
        Ok(())
    }

    fn save_entity(&self, entity: &Entity) -> Result<(), ResourceError> {
        self.saved.lock().push(SavedEntity {
            id: entity.id(),
            definition: entity.definition().to_string(),
            bound: entity.simulation().is_some(),
        });
        Ok(())
    }

    fn global_chunk_cache(&self) -> &dyn ChunkCache {
        &self.cache
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}

/// Component that logs its updates and the entities it is told about.
pub struct Recorder {
    pub name: &'static str,
    pub enabled: bool,
    pub log: CallLog,
}

impl SimulationComponent for Recorder {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn on_entity_added(&mut self, entity: &EntityHandle) {
        let e = entity.read();
        self.log
            .lock()
            .push(format!("{}:added:{}", self.name, e.id().0));
    }

    fn on_entity_removed(&mut self, entity: &EntityHandle) {
        let e = entity.read();
        self.log
            .lock()
            .push(format!("{}:removed:{}", self.name, e.id().0));
    }

    fn update(&mut self, _time: &GameTime) {
        self.log.lock().push(format!("{}:update", self.name));
    }
}

/// A second component type, so registries can hold two recorders.
pub struct SecondRecorder(pub Recorder);

impl SimulationComponent for SecondRecorder {
    fn enabled(&self) -> bool {
        self.0.enabled()
    }

    fn on_entity_added(&mut self, entity: &EntityHandle) {
        self.0.on_entity_added(entity);
    }

    fn on_entity_removed(&mut self, entity: &EntityHandle) {
        self.0.on_entity_removed(entity);
    }

    fn update(&mut self, time: &GameTime) {
        self.0.update(time);
    }
}

/// Entity behavior that logs each update.
pub struct LoggedBehavior {
    pub name: &'static str,
    pub log: CallLog,
}

impl EntityBehavior for LoggedBehavior {
    fn update(&mut self, transform: &mut Transform, time: &GameTime) {
        transform.position.y += time.elapsed.as_secs_f32();
        self.log.lock().push(format!("entity:{}", self.name));
    }
}

/// Resolver that registers a recorder and tags every entity.
pub struct TaggingExtensions {
    pub log: CallLog,
}

pub struct Tagged;

impl crate::component::EntityComponent for Tagged {}

impl ExtensionResolver for TaggingExtensions {
    fn extend_simulation(&self, simulation: &mut Simulation) {
        let _ = simulation.add_component(Recorder {
            name: "ext",
            enabled: true,
            log: Arc::clone(&self.log),
        });
    }

    fn extend_entity(&self, entity: &mut Entity) {
        let _ = entity.components_mut().add(Tagged);
    }
}
