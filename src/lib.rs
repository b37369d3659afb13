pub mod admin;
mod config;
pub mod engine;
pub mod entities;
pub mod telemetry;
pub mod world;

use crate::admin::commands::{parse_console_command, AdminCommand};
use crate::engine::error::EngineError;
use crate::engine::game_engine::GameEngine;
use crate::engine::game_state::EngineConfig;
use crate::telemetry::logging::{self, LogConfig, LogError};
use crate::world::error::LoadError;
use crate::world::item_types::{ItemFactory, ItemTypeIndex};
use crate::world::map::load_map;
use crate::world::state::World;
use std::io::{BufRead, Write};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("console: {0}")]
    Console(#[source] std::io::Error),
}

/// Loads the world, runs the engine and serves the operator console on
/// stdin until `shutdown` or end of input.
pub fn run(args: &[String]) -> Result<(), StartupError> {
    let config = config::AppConfig::from_args(args)?;
    logging::init(&LogConfig {
        filter: config.log_filter.clone(),
        directory: config.log_directory(),
    })?;

    let items = ItemTypeIndex::load(&config.items_file)?;
    let grid = load_map(&config.map_file, &items)?;
    tracing::info!(
        root = %config.root.display(),
        item_types = items.len(),
        map = grid.name(),
        tiles = grid.tile_count(),
        "world data loaded"
    );

    let world = World::new(grid);
    if !world.is_enterable(config.spawn_position) {
        tracing::warn!(
            spawn = %config.spawn_position,
            "spawn position is not enterable, logins will use its neighbours"
        );
    }
    let items: Arc<dyn ItemFactory> = Arc::new(items);
    let engine = GameEngine::new(
        world,
        items,
        EngineConfig {
            spawn_position: config.spawn_position,
            login_message: config.login_message.clone(),
            gamemasters: config.gamemasters.clone(),
        },
    );
    engine.start()?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let console = run_console(&engine, stdin.lock(), stdout.lock());
    engine.stop()?;
    tracing::info!("game engine stopped");
    console.map_err(StartupError::Console)
}

/// Reads operator commands line by line. Returns once `shutdown` is read or
/// the input ends.
fn run_console(
    engine: &GameEngine,
    input: impl BufRead,
    mut output: impl Write,
) -> std::io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_console_command(&line) {
            Ok(AdminCommand::Shutdown) => {
                writeln!(output, "shutting down")?;
                break;
            }
            Ok(AdminCommand::Online) => match engine.online_players() {
                Ok(names) => {
                    writeln!(output, "{} player(s) online", names.len())?;
                    for name in names {
                        writeln!(output, "- {name}")?;
                    }
                }
                Err(err) => writeln!(output, "error: {err}")?,
            },
            Ok(AdminCommand::Unknown(name)) => writeln!(output, "unknown command '{name}'")?,
            Ok(_) => writeln!(output, "command is only available in game")?,
            Err(err) => writeln!(output, "error: {err}")?,
        }
    }
    Ok(())
}
