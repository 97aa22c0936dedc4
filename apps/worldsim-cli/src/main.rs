use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use worldsim_common::{GameTime, Index3, Transform, UniverseId};
use worldsim_kernel::{
    Entity, EntityBehavior, ExtensionResolver, FixedStepClock, Notification, ResourceManager,
    Simulation, SimulationComponent, SimulationConfig, TickTimer,
};
use worldsim_persist::{
    DefinitionRegistry, FileResourceManager, PLANET_RECORD_LEN, Planet, UNIVERSE_SCHEMA_VERSION,
};

const DEFINITIONS: [&str; 2] = ["player", "stone"];

#[derive(Parser)]
#[command(name = "worldsim-cli", about = "CLI tool for worldsim sessions and records")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and record formats
    Info,
    /// Run a session: create a universe, attach entities, tick, then exit
    Run {
        /// Directory holding universes
        #[arg(short, long, default_value = "worldsim-data")]
        data_dir: PathBuf,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Universe seed
        #[arg(short, long, default_value = "42")]
        seed: i32,
        /// Number of entities to attach
        #[arg(short, long, default_value = "5")]
        entities: usize,
    },
    /// Write a planet record into a fresh universe and dump its bytes
    Planet {
        #[arg(short, long, default_value = "worldsim-data")]
        data_dir: PathBuf,
        /// Size exponents per axis
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [12, 3, 12])]
        exponents: Vec<i32>,
        #[arg(short, long, default_value = "42")]
        seed: i32,
        #[arg(short, long, default_value = "9.81")]
        gravity: f32,
    },
    /// Print a saved universe and the entities saved into it
    Inspect {
        #[arg(short, long, default_value = "worldsim-data")]
        data_dir: PathBuf,
        universe: Uuid,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let config = SimulationConfig::default();
            println!("worldsim-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("universe schema: v{UNIVERSE_SCHEMA_VERSION}");
            println!("planet record: {PLANET_RECORD_LEN} bytes");
            println!(
                "entity record: {} bytes",
                worldsim_persist::ENTITY_RECORD_LEN
            );
            println!(
                "tick interval: {:?}, catch-up cap: {}",
                config.tick_interval, config.max_catch_up_ticks
            );
        }
        Commands::Run {
            data_dir,
            ticks,
            seed,
            entities,
        } => run(data_dir, ticks, seed, entities)?,
        Commands::Planet {
            data_dir,
            exponents,
            seed,
            gravity,
        } => {
            let files = open(&data_dir)?;
            let universe = files.new_universe("planet-demo", seed)?;
            let [x, y, z] = <[i32; 3]>::try_from(exponents.as_slice())
                .context("expected three exponents")?;
            let planet = Planet::new(1, universe, Index3::new(x, y, z), seed)?.with_gravity(gravity);
            let path = files.save_planet(&planet)?;
            let loaded = files.load_planet(planet.id)?;

            println!("Planet {} in universe {universe}", loaded.id);
            println!(
                "size={} seed={} gravity={}",
                loaded.size, loaded.seed, loaded.gravity
            );
            println!("{}:", path.display());
            println!("{}", hex(&std::fs::read(&path)?));
            println!("Match: {}", if loaded == planet { "OK" } else { "MISMATCH" });
        }
        Commands::Inspect { data_dir, universe } => {
            let files = open(&data_dir)?;
            files.load_universe(UniverseId(universe))?;
            let meta = files.meta().context("universe not loaded")?;
            println!(
                "Universe {} {:?}: seed={}, schema=v{}, saved entities={}",
                meta.id, meta.name, meta.seed, meta.schema_version, meta.saved_entities
            );
            for sequence in 1..=meta.saved_entities {
                let entity = files.load_entity(sequence)?;
                let p = entity.transform.position;
                println!(
                    "  {sequence:06} {:<8} at ({:.2}, {:.2}, {:.2})",
                    entity.definition(),
                    p.x,
                    p.y,
                    p.z
                );
            }
            files.unload_universe()?;
        }
    }

    Ok(())
}

fn open(data_dir: &Path) -> anyhow::Result<Arc<FileResourceManager>> {
    let definitions = DefinitionRegistry::with_definitions(DEFINITIONS)?;
    let files = FileResourceManager::open(data_dir, definitions)
        .with_context(|| format!("opening {}", data_dir.display()))?;
    Ok(Arc::new(files))
}

fn run(data_dir: PathBuf, ticks: u64, seed: i32, entities: usize) -> anyhow::Result<()> {
    let files = open(&data_dir)?;
    let ticked = Arc::new(AtomicU64::new(0));
    let extensions = Arc::new(DemoExtensions {
        ticked: Arc::clone(&ticked),
    });
    let mut sim = Simulation::new(files.clone(), extensions);

    let universe = sim.new_game("demo", seed)?;
    println!("Session: universe={universe}, seed={seed}, ticks={ticks}");

    for i in 0..entities {
        let entity = Entity::new(DEFINITIONS[i % DEFINITIONS.len()])
            .with_transform(Transform {
                position: glam::Vec3::new(i as f32 * 2.0, 64.0, 0.0),
                ..Transform::default()
            })
            .with_behavior(Drift { speed: 1.0 + i as f32 })
            .into_handle();
        files.publish(Notification::Add(entity));
    }

    let config = SimulationConfig::default();
    let mut clock = FixedStepClock::new(&config);
    let mut timer = TickTimer::new(&config);
    for _ in 0..ticks {
        let time = clock.tick();
        let start = Instant::now();
        sim.update(&time)?;
        timer.record(start.elapsed());
    }
    println!(
        "Ran {} ticks ({:?} simulated), entities={}",
        ticked.load(Ordering::Relaxed),
        clock.total(),
        sim.entity_count()
    );
    println!(
        "Tick time: avg={:?} min={:?} max={:?}, load={:.1}%, over budget={}",
        timer.average(),
        timer.min(),
        timer.max(),
        timer.load() * 100.0,
        timer.over_budget()
    );

    sim.pause()?;
    sim.exit_game()?;
    let saved = std::fs::read_dir(data_dir.join(universe.to_string()).join("entities"))?.count();
    println!("Exited: state={:?}, entity records={saved}", sim.state());
    Ok(())
}

/// Moves an entity along +x at a constant speed.
struct Drift {
    speed: f32,
}

impl EntityBehavior for Drift {
    fn update(&mut self, transform: &mut Transform, time: &GameTime) {
        transform.position.x += self.speed * time.elapsed.as_secs_f32();
    }
}

struct TickCounter {
    ticked: Arc<AtomicU64>,
}

impl SimulationComponent for TickCounter {
    fn update(&mut self, _time: &GameTime) {
        self.ticked.fetch_add(1, Ordering::Relaxed);
    }
}

struct DemoExtensions {
    ticked: Arc<AtomicU64>,
}

impl ExtensionResolver for DemoExtensions {
    fn extend_simulation(&self, simulation: &mut Simulation) {
        let counter = TickCounter {
            ticked: Arc::clone(&self.ticked),
        };
        if let Err(err) = simulation.add_component(counter) {
            tracing::warn!(%err, "tick counter not registered");
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|row| {
            row.iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
