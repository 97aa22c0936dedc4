//! File-backed resource manager.
//!
//! Layout under the manager root:
//! ```text
//! <universe-uuid>/
//!   universe.meta.json   - name, seed and schema version
//!   planets/
//!     <id>.planet        - planet records
//!   entities/
//!     000001.entity      - entity records, numbered in save order
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use worldsim_common::UniverseId;
use worldsim_kernel::{
    ChunkCache, Entity, Notification, NotificationHub, ResourceError, ResourceManager,
    Simulation, Subscription,
};

use crate::binary::{from_bytes, to_bytes};
use crate::definitions::{DefinitionLookup, DefinitionRegistry};
use crate::error::PersistError;
use crate::planet::Planet;

/// Current universe schema version.
pub const UNIVERSE_SCHEMA_VERSION: u32 = 1;

const META_FILE: &str = "universe.meta.json";

/// Metadata stored in universe.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseMeta {
    pub schema_version: u32,
    pub id: UniverseId,
    pub name: String,
    pub seed: i32,
    /// Number of entity records written so far.
    pub saved_entities: u32,
}

struct UniverseSession {
    dir: PathBuf,
    meta: UniverseMeta,
}

impl UniverseSession {
    fn save_meta(&self) -> Result<(), PersistError> {
        let file = std::fs::File::create(self.dir.join(META_FILE))?;
        serde_json::to_writer_pretty(file, &self.meta)?;
        Ok(())
    }
}

/// Chunk cache that only observes the tick hooks.
#[derive(Debug, Default)]
pub struct PassiveChunkCache {
    before: AtomicU64,
    after: AtomicU64,
}

impl PassiveChunkCache {
    pub fn before_count(&self) -> u64 {
        self.before.load(Ordering::Relaxed)
    }

    pub fn after_count(&self) -> u64 {
        self.after.load(Ordering::Relaxed)
    }
}

impl ChunkCache for PassiveChunkCache {
    fn before_simulation_update(&self, simulation: &Simulation) {
        let n = self.before.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(simulation = ?simulation.id(), n, "chunk cache: before update");
    }

    fn after_simulation_update(&self, simulation: &Simulation) {
        let n = self.after.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(simulation = ?simulation.id(), n, "chunk cache: after update");
    }
}

/// Resource manager that keeps one universe per directory under `root`.
///
/// At most one universe is loaded at a time. Entity notifications published
/// through [`publish`](Self::publish) reach every subscribed simulation.
pub struct FileResourceManager {
    root: PathBuf,
    definitions: DefinitionRegistry,
    session: Mutex<Option<UniverseSession>>,
    hub: NotificationHub,
    cache: PassiveChunkCache,
}

impl FileResourceManager {
    /// Open a manager rooted at `root`, creating the directory if needed.
    pub fn open(
        root: impl AsRef<Path>,
        definitions: DefinitionRegistry,
    ) -> Result<Self, PersistError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            definitions,
            session: Mutex::new(None),
            hub: NotificationHub::new(),
            cache: PassiveChunkCache::default(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    pub fn chunk_cache(&self) -> &PassiveChunkCache {
        &self.cache
    }

    /// The loaded universe, if any.
    pub fn universe(&self) -> Option<UniverseId> {
        self.session.lock().as_ref().map(|s| s.meta.id)
    }

    /// Metadata of the loaded universe.
    pub fn meta(&self) -> Option<UniverseMeta> {
        self.session.lock().as_ref().map(|s| s.meta.clone())
    }

    /// Deliver `notification` to every live subscriber. Returns the number reached.
    pub fn publish(&self, notification: Notification) -> usize {
        self.hub.publish(notification)
    }

    /// Complete every subscriber's stream.
    pub fn complete_notifications(&self) {
        self.hub.complete();
    }

    /// Write `planet` into the loaded universe, replacing any previous record
    /// with the same id.
    pub fn save_planet(&self, planet: &Planet) -> Result<PathBuf, PersistError> {
        let session = self.session.lock();
        let session = session.as_ref().ok_or(PersistError::NoUniverseLoaded)?;
        let path = session
            .dir
            .join("planets")
            .join(format!("{}.planet", planet.id));
        std::fs::write(&path, to_bytes(planet, &self.definitions)?)?;
        tracing::debug!(planet = planet.id, path = %path.display(), "planet saved");
        Ok(path)
    }

    pub fn load_planet(&self, id: i32) -> Result<Planet, PersistError> {
        let path = self.universe_dir()?.join("planets").join(format!("{id}.planet"));
        let bytes = std::fs::read(path)?;
        from_bytes(&bytes, &self.definitions)
    }

    /// Read back the entity record written by the `sequence`-th save, counting from 1.
    pub fn load_entity(&self, sequence: u32) -> Result<Entity, PersistError> {
        let path = self.universe_dir()?.join("entities").join(entity_file(sequence));
        let bytes = std::fs::read(path)?;
        from_bytes(&bytes, &self.definitions)
    }

    fn universe_dir(&self) -> Result<PathBuf, PersistError> {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.dir.clone())
            .ok_or(PersistError::NoUniverseLoaded)
    }

    fn create_universe(&self, name: &str, seed: i32) -> Result<UniverseId, PersistError> {
        let id = UniverseId::new();
        let dir = self.root.join(id.to_string());
        std::fs::create_dir_all(dir.join("planets"))?;
        std::fs::create_dir_all(dir.join("entities"))?;

        let session = UniverseSession {
            dir,
            meta: UniverseMeta {
                schema_version: UNIVERSE_SCHEMA_VERSION,
                id,
                name: name.to_string(),
                seed,
                saved_entities: 0,
            },
        };
        session.save_meta()?;
        *self.session.lock() = Some(session);
        Ok(id)
    }

    fn open_universe(&self, id: UniverseId) -> Result<(), PersistError> {
        let dir = self.root.join(id.to_string());
        let meta_path = dir.join(META_FILE);
        if !meta_path.is_file() {
            return Err(PersistError::UniverseNotFound(id));
        }
        let meta: UniverseMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
        if meta.schema_version != UNIVERSE_SCHEMA_VERSION {
            return Err(PersistError::SchemaMismatch {
                file_version: meta.schema_version,
                expected_version: UNIVERSE_SCHEMA_VERSION,
            });
        }
        *self.session.lock() = Some(UniverseSession { dir, meta });
        Ok(())
    }

    fn write_entity(&self, entity: &Entity) -> Result<PathBuf, PersistError> {
        let mut session = self.session.lock();
        let session = session.as_mut().ok_or(PersistError::NoUniverseLoaded)?;
        let bytes = to_bytes(entity, &self.definitions)?;

        let sequence = session.meta.saved_entities + 1;
        let path = session.dir.join("entities").join(entity_file(sequence));
        std::fs::write(&path, bytes)?;
        session.meta.saved_entities = sequence;
        session.save_meta()?;
        Ok(path)
    }
}

fn entity_file(sequence: u32) -> String {
    format!("{sequence:06}.entity")
}

impl ResourceManager for FileResourceManager {
    fn new_universe(&self, name: &str, seed: i32) -> Result<UniverseId, ResourceError> {
        let id = self.create_universe(name, seed)?;
        tracing::info!(universe = %id, name, seed, "universe created");
        Ok(id)
    }

    fn load_universe(&self, id: UniverseId) -> Result<(), ResourceError> {
        self.open_universe(id)?;
        tracing::info!(universe = %id, "universe loaded");
        Ok(())
    }

    fn unload_universe(&self) -> Result<(), ResourceError> {
        if let Some(session) = self.session.lock().take() {
            tracing::info!(universe = %session.meta.id, "universe unloaded");
        }
        Ok(())
    }

    fn initialize_entity(&self, entity: &mut Entity) -> Result<(), ResourceError> {
        if self.definitions.index_of(entity.definition()).is_none() {
            return Err(ResourceError::EntityRejected(format!(
                "unregistered definition {:?}",
                entity.definition()
            )));
        }
        Ok(())
    }

    fn save_entity(&self, entity: &Entity) -> Result<(), ResourceError> {
        let path = self.write_entity(entity)?;
        tracing::debug!(definition = entity.definition(), path = %path.display(), "entity saved");
        Ok(())
    }

    fn global_chunk_cache(&self) -> &dyn ChunkCache {
        &self.cache
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}

impl std::fmt::Debug for FileResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileResourceManager")
            .field("root", &self.root)
            .field("universe", &self.universe())
            .field("definitions", &self.definitions.len())
            .finish()
    }
}
