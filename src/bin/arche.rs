use anyhow::Result;

#[cfg(feature = "cli")]
mod main {
    use super::*;
    use anyhow::bail;
    use arche::{Component, EntityLedger, EntityManager, Query, World, WorldConfig};
    use arche_utils::{io::write_ron_file, with_timing_info_logging};
    use bytemuck::{Pod, Zeroable};
    use clap::{Parser, Subcommand};
    use std::path::PathBuf;

    #[derive(Debug, Parser)]
    #[command(about = "Archetype-based entity store", long_about = None)]
    struct Cli {
        #[command(subcommand)]
        command: Command,
    }

    #[derive(Debug, Subcommand)]
    enum Command {
        /// Run a simulation of moving entities and report the archetypes
        Simulate {
            /// Number of entities to create
            #[arg(short, long, default_value_t = 1000)]
            entities: usize,
            /// Number of world updates to run
            #[arg(short, long, default_value_t = 10)]
            ticks: u32,
            /// Time step for each update
            #[arg(long, default_value_t = 0.1)]
            dt: f64,
            /// Path to RON configuration file to use
            #[arg(short, long)]
            config: Option<PathBuf>,
        },
        /// Print newly generated entity IDs
        NewId {
            /// Number of IDs to generate
            #[arg(short, long, default_value_t = 1)]
            count: usize,
            /// Seed making the generated IDs reproducible
            #[arg(short, long)]
            seed: Option<u64>,
        },
        /// Generate the default RON configuration file
        GenerateConfig {
            /// Path where the file should be written
            #[arg(short, long)]
            output_path: PathBuf,
            /// Overwrite any existing file at the given path
            #[arg(short, long)]
            force_overwrite: bool,
        },
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Component)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Component)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod, Component)]
    struct Frozen;

    const FRICTION: f32 = 0.8;
    const MIN_SPEED: f32 = 0.05;

    pub fn main() -> Result<()> {
        env_logger::init();

        let cli = Cli::parse();

        match cli.command {
            Command::Simulate {
                entities,
                ticks,
                dt,
                config,
            } => {
                let config = match config {
                    Some(file_path) => WorldConfig::from_ron_file(file_path)?,
                    None => WorldConfig::default(),
                };
                simulate(config, entities, ticks, dt)
            }
            Command::NewId { count, seed } => {
                let manager = match seed {
                    Some(seed) => EntityManager::with_seed(seed),
                    None => EntityManager::new(),
                };
                for _ in 0..count {
                    println!("{}", manager.create());
                }
                Ok(())
            }
            Command::GenerateConfig {
                output_path,
                force_overwrite,
            } => {
                if !force_overwrite && output_path.exists() {
                    bail!("File {} already exists", output_path.display());
                }
                write_ron_file(&WorldConfig::default(), output_path)
            }
        }
    }

    fn simulate(config: WorldConfig, n_entities: usize, ticks: u32, dt: f64) -> Result<()> {
        let mut world = World::new(config)?;

        with_timing_info_logging!("Creating {} entities", n_entities; {
            for idx in 0..n_entities {
                let entity = world.create_entity()?;
                let offset = idx as f32;
                world.add_component(entity, &Position { x: offset, y: 0.0 })?;
                if idx % 2 == 0 {
                    world.add_component(entity, &Velocity { x: 1.0 + offset % 5.0, y: 1.0 })?;
                }
                if idx % 5 == 0 {
                    world.add_component(entity, &Frozen)?;
                }
            }
        });

        world.register_system(movement);
        world.register_system(friction);

        with_timing_info_logging!("Running {} updates", ticks; {
            for _ in 0..ticks {
                world.update(dt);
            }
        });

        for archetype in world.storage().archetypes() {
            println!(
                "{:>8} entities with {}",
                archetype.len(),
                world.describe_mask(archetype.mask())
            );
        }
        println!(
            "{} entities still moving",
            world
                .query(&Query::new().with::<Velocity>().without::<Frozen>())
                .len()
        );
        Ok(())
    }

    fn movement(world: &mut World, dt: f64) {
        let moving = Query::new()
            .with::<(Position, Velocity)>()
            .without::<Frozen>();
        let dt = dt as f32;
        for entity in world.query(&moving) {
            let (position, velocity) = world.components::<(Position, Velocity)>(entity);
            let moved = Position {
                x: position.x + velocity.x * dt,
                y: position.y + velocity.y * dt,
            };
            if let Err(err) = world.add_component(entity, &moved) {
                log::warn!("Could not move entity {}: {}", entity, err);
            }
        }
    }

    fn friction(world: &mut World, _dt: f64) {
        for entity in world.query(&Query::new().with::<Velocity>().without::<Frozen>()) {
            let velocity = world.component::<Velocity>(entity);
            let slowed = Velocity {
                x: velocity.x * FRICTION,
                y: velocity.y * FRICTION,
            };
            let result = if slowed.x.hypot(slowed.y) < MIN_SPEED {
                world.remove_component::<Velocity>(entity)
            } else {
                world.add_component(entity, &slowed)
            };
            if let Err(err) = result {
                log::warn!("Could not apply friction to entity {}: {}", entity, err);
            }
        }
    }
}

#[cfg(not(feature = "cli"))]
mod main {
    use super::*;

    pub fn main() -> Result<()> {
        anyhow::bail!("This binary requires the `cli` feature to be enabled.")
    }
}

fn main() -> Result<()> {
    main::main()
}
