#![allow(dead_code)]

use std::fs::File;
use std::io;

use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};

mod game;
mod input;

// the screen belongs to the game while it runs, diagnostics go to a file
const LOG_FILE: &str = "snake.log";

fn main() -> io::Result<()> {
    WriteLogger::init(LevelFilter::Info, Config::default(), File::create(LOG_FILE)?)
        .expect("failed to initialize logger");
    info!("starting {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let _raw_mode = input::RawModeGuard::acquire()?;
    let commands = input::spawn_listener();
    let mut state = game::GameState::new();
    game::play(&mut state, commands);
    Ok(())
}
